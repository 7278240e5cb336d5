//! Expanding-window walk-forward validation.
//!
//! Each split trains a fresh copy of the model on a prefix of the dataset and
//! scores the `horizon` predictions that immediately follow the prefix. The
//! validation pairs of every usable split are pooled and scored once, so the
//! reported `cv_*` metrics weight every forecast point equally.

use crate::dataset::FailureDataset;
use crate::errors::{ReliabilityError, ReliabilityResult};
use crate::metrics::{compute_metrics, CV_PREFIX};
use crate::reliability_model::ReliabilityModel;
use crate::results::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Smallest automatic training window.
const MIN_AUTO_TRAIN: usize = 3;
/// Share of the series used as the automatic training window.
const AUTO_TRAIN_FRACTION: f64 = 0.6;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Walk-forward settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    /// Run validation at all
    pub enabled: bool,
    /// First training window; `None` or `Some(0)` picks `max(3, ceil(0.6 n))`
    pub min_train_size: Option<usize>,
    /// Points forecast after each training window
    pub horizon: usize,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_train_size: None,
            horizon: 1,
        }
    }
}

impl WalkForwardConfig {
    /// Enabled expanding-window validation.
    pub fn expanding(min_train_size: Option<usize>, horizon: usize) -> Self {
        Self {
            enabled: true,
            min_train_size,
            horizon,
        }
    }

    /// Training window actually used for a series of length `n`.
    ///
    /// Only meaningful when `n > horizon + 1`; the result lies in `[2, n - horizon]`.
    pub fn effective_min_train(&self, n: usize) -> usize {
        let requested = match self.min_train_size {
            Some(m) if m > 0 => m,
            _ => MIN_AUTO_TRAIN.max((AUTO_TRAIN_FRACTION * n as f64).ceil() as usize),
        };
        let upper = n.saturating_sub(self.horizon).max(2);
        requested.clamp(2, upper)
    }

    /// Reject a zero horizon.
    pub fn validate(&self) -> ReliabilityResult<()> {
        if self.horizon == 0 {
            return Err(ReliabilityError::InvalidParameter {
                parameter: "horizon".to_string(),
                value: 0.0,
                constraint: "horizon >= 1".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Pooled out-of-sample scores and split bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardOutcome {
    /// Metrics under `cv_` keys; empty when no split was usable
    pub metrics: BTreeMap<String, f64>,
    /// `Diagnostic::WalkForward` with the split counts
    pub diagnostic: Diagnostic,
}

impl WalkForwardOutcome {
    /// Number of splits that contributed predictions.
    pub fn used_splits(&self) -> usize {
        match self.diagnostic {
            Diagnostic::WalkForward { used, .. } => used,
            _ => 0,
        }
    }
}

/// Run expanding-window validation of `model` on `dataset`.
///
/// Splits whose fit fails, or whose prediction vector is shorter than
/// `train_stop + horizon`, are skipped.
///
/// # Arguments
/// * `model` - Template model; every split fits `model.fresh()`
/// * `dataset` - Full series
/// * `config` - Horizon and training window (the `enabled` flag is ignored here)
///
/// # Returns
/// * `Ok(WalkForwardOutcome)` - Pooled `cv_*` metrics and split counts
/// * `Err(InsufficientData)` - `n <= horizon + 1`
/// * `Err(InvalidParameter)` - `horizon == 0`
///
/// # Example
/// ```rust
/// use reliability_growth::{FailureDataset, FailureSeriesType, GreyModel};
/// use reliability_growth::cross_validation::{walk_forward_validate, WalkForwardConfig};
///
/// let values: Vec<f64> = (1..=15).map(|i| 20.0 * (1.0 - (-0.2 * i as f64).exp())).collect();
/// let ds = FailureDataset::from_values(values, FailureSeriesType::CumulativeFailures).unwrap();
/// let outcome = walk_forward_validate(
///     &GreyModel::default(),
///     &ds,
///     &WalkForwardConfig::expanding(Some(10), 1),
/// ).unwrap();
/// assert!(outcome.metrics["cv_rmse"] >= 0.0);
/// ```
pub fn walk_forward_validate(
    model: &dyn ReliabilityModel,
    dataset: &FailureDataset,
    config: &WalkForwardConfig,
) -> ReliabilityResult<WalkForwardOutcome> {
    config.validate()?;
    let n = dataset.len();
    let horizon = config.horizon;
    if n <= horizon + 1 {
        return Err(ReliabilityError::InsufficientData {
            required: horizon + 2,
            actual: n,
        });
    }

    let min_train = config.effective_min_train(n);
    let truth = dataset.target_series();
    let time_axis = dataset.time_axis();

    let mut actual = Vec::new();
    let mut predicted = Vec::new();
    let mut attempted = 0;
    let mut used = 0;

    for train_stop in min_train..=n - horizon {
        attempted += 1;
        let window_end = train_stop + horizon;
        let train = dataset.slice(train_stop)?;
        let candidate = model.fresh();

        let result = match candidate.fit(&train, Some(&time_axis[..window_end])) {
            Ok(result) => result,
            Err(e) => {
                log::debug!(
                    "{}: walk-forward split at {} skipped: {}",
                    model.name(),
                    train_stop,
                    e
                );
                continue;
            }
        };
        if result.predictions.len() < window_end {
            log::debug!(
                "{}: walk-forward split at {} skipped: {} predictions for {} points",
                model.name(),
                train_stop,
                result.predictions.len(),
                window_end
            );
            continue;
        }

        actual.extend_from_slice(&truth[train_stop..window_end]);
        predicted.extend_from_slice(&result.predictions[train_stop..window_end]);
        used += 1;
    }

    let metrics = if used == 0 {
        log::warn!(
            "{}: walk-forward produced no usable split out of {}",
            model.name(),
            attempted
        );
        BTreeMap::new()
    } else {
        compute_metrics(&actual, &predicted, model.param_count())?.to_prefixed_map(CV_PREFIX)
    };

    Ok(WalkForwardOutcome {
        metrics,
        diagnostic: Diagnostic::WalkForward {
            attempted,
            used,
            min_train,
            horizon,
            points: actual.len(),
        },
    })
}
