//! # Model Results Structures
//!
//! Output types of a model fit ([`ModelResult`]), its position after ranking
//! ([`RankedModelResult`]) and the typed diagnostic payloads a model or the
//! orchestrator may attach ([`Diagnostic`]).

use crate::serde_nan;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A fitted parameter: numeric (`a`, `phi`, ...) or textual (`kernel`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// Numeric parameter; NaN marks "not estimated"
    Number(#[serde(with = "serde_nan::scalar")] f64),
    /// Textual parameter
    Text(String),
}

impl ParameterValue {
    /// Numeric value, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Number(v) => Some(*v),
            ParameterValue::Text(_) => None,
        }
    }

    /// Text value, if this is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::Number(_) => None,
            ParameterValue::Text(s) => Some(s),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Number(v)
    }
}

impl From<usize> for ParameterValue {
    fn from(v: usize) -> Self {
        ParameterValue::Number(v as f64)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::Text(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        ParameterValue::Text(v)
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Number(v) => write!(f, "{}", v),
            ParameterValue::Text(s) => f.write_str(s),
        }
    }
}

/// Variance summary of one decomposition component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSummary {
    /// 1-based component index
    pub component: usize,
    /// Population variance of the component
    #[serde(with = "serde_nan::scalar")]
    pub variance: f64,
}

/// Known diagnostic payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Tail of a training loss curve
    LossCurve {
        /// Most recent epoch losses, oldest first
        #[serde(with = "serde_nan::vec")]
        values: Vec<f64>,
    },
    /// Additive decomposition summary of the hybrid model
    Decomposition {
        /// One entry per extracted component
        components: Vec<ComponentSummary>,
        /// Variance of the smoothed residue handed to GM(1,1)
        #[serde(with = "serde_nan::scalar")]
        residue_variance: f64,
    },
    /// Normal-approximation prediction band over the overlapping predictions
    PredictionInterval {
        /// Lower bound per prediction
        #[serde(with = "serde_nan::vec")]
        lower: Vec<f64>,
        /// Upper bound per prediction
        #[serde(with = "serde_nan::vec")]
        upper: Vec<f64>,
        /// Interval construction, currently always "normal"
        method: String,
        /// Two-sided significance level
        alpha: f64,
        /// Residual standard deviation
        #[serde(with = "serde_nan::scalar")]
        sigma: f64,
        /// Normal quantile `Φ⁻¹(1 − α/2)`
        #[serde(with = "serde_nan::scalar")]
        z: f64,
    },
    /// Walk-forward split bookkeeping
    WalkForward {
        /// Splits iterated
        attempted: usize,
        /// Splits that contributed predictions
        used: usize,
        /// Effective minimum training size
        min_train: usize,
        /// Forecast distance per split
        horizon: usize,
        /// Pooled validation points
        points: usize,
    },
    /// Failure messages of initial-guess rungs that preceded the successful one
    FitAttempts {
        /// One message per failed rung, in order
        attempts: Vec<String>,
    },
}

impl Diagnostic {
    /// Stable snake_case name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::LossCurve { .. } => "loss_curve",
            Diagnostic::Decomposition { .. } => "decomposition",
            Diagnostic::PredictionInterval { .. } => "prediction_interval",
            Diagnostic::WalkForward { .. } => "walk_forward",
            Diagnostic::FitAttempts { .. } => "fit_attempts",
        }
    }
}

/// Ordered collection of diagnostics, at most one per kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, replacing any existing diagnostic of the same kind.
    pub fn insert(&mut self, diagnostic: Diagnostic) {
        let kind = diagnostic.kind();
        match self.0.iter_mut().find(|d| d.kind() == kind) {
            Some(slot) => *slot = diagnostic,
            None => self.0.push(diagnostic),
        }
    }

    /// Diagnostic of the given kind.
    pub fn get(&self, kind: &str) -> Option<&Diagnostic> {
        self.0.iter().find(|d| d.kind() == kind)
    }

    /// Loss curve tail, if one was attached.
    pub fn loss_curve(&self) -> Option<&[f64]> {
        self.0.iter().find_map(|d| match d {
            Diagnostic::LossCurve { values } => Some(values.as_slice()),
            _ => None,
        })
    }

    /// `(lower, upper)` prediction band, if one was attached.
    pub fn prediction_interval(&self) -> Option<(&[f64], &[f64])> {
        self.0.iter().find_map(|d| match d {
            Diagnostic::PredictionInterval { lower, upper, .. } => {
                Some((lower.as_slice(), upper.as_slice()))
            }
            _ => None,
        })
    }

    /// `(attempted, used)` walk-forward split counts.
    pub fn walk_forward_splits(&self) -> Option<(usize, usize)> {
        self.0.iter().find_map(|d| match d {
            Diagnostic::WalkForward { attempted, used, .. } => Some((*attempted, *used)),
            _ => None,
        })
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    /// Number of diagnostics.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing was attached.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        let mut out = Diagnostics::new();
        for d in iter {
            out.insert(d);
        }
        out
    }
}

/// Outcome of fitting one model to one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    /// Display name of the model
    pub model_name: String,
    /// Fitted parameters
    pub parameters: BTreeMap<String, ParameterValue>,
    /// Evaluation grid
    #[serde(with = "serde_nan::vec")]
    pub times: Vec<f64>,
    /// Predictions aligned with `times`
    #[serde(with = "serde_nan::vec")]
    pub predictions: Vec<f64>,
    /// Training metrics plus optional `cv_*` keys
    #[serde(with = "serde_nan::map")]
    pub metrics: BTreeMap<String, f64>,
    /// Optional extras
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

impl ModelResult {
    /// Numeric parameter by name.
    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).and_then(ParameterValue::as_f64)
    }

    /// Metric by name.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// A [`ModelResult`] with its 1-based position after ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedModelResult {
    /// 1-based rank
    pub rank: usize,
    /// Ranked fit
    #[serde(flatten)]
    pub result: ModelResult,
}

impl RankedModelResult {
    /// Display name of the ranked model.
    pub fn model_name(&self) -> &str {
        &self.result.model_name
    }
}
