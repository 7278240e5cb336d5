//! Yamada delayed S-shaped NHPP model.
//!
//! `μ(t) = a (1 - (1 + b t) e^{-b t})`. Suited to projects whose failure
//! detection starts slowly (a learning curve) before the usual exponential
//! saturation. Fit exactly like [`GoelOkumotoModel`](crate::goel_okumoto::GoelOkumotoModel)
//! but with a single initial guess by default.

use crate::dataset::{FailureDataset, FailureSeriesType};
use crate::errors::ReliabilityResult;
use crate::goel_okumoto::fit_mean_value_model;
use crate::least_squares::NhppFitConfig;
use crate::reliability_model::{ReliabilityModel, SeriesRequirement};
use crate::results::ModelResult;

/// `a (1 - (1 + b t) e^{-b t})`.
pub fn s_shaped_mean_value(t: f64, a: f64, b: f64) -> f64 {
    a * (1.0 - (1.0 + b * t) * (-b * t).exp())
}

/// Delayed S-shaped model over cumulative failure data.
#[derive(Debug, Clone)]
pub struct SShapedModel {
    config: NhppFitConfig,
}

impl Default for SShapedModel {
    fn default() -> Self {
        Self::new(NhppFitConfig::single_guess())
    }
}

impl SShapedModel {
    /// Model with explicit solver settings.
    pub fn new(config: NhppFitConfig) -> Self {
        Self { config }
    }
}

impl ReliabilityModel for SShapedModel {
    fn name(&self) -> &str {
        "Yamada S-Shaped"
    }

    fn requirement(&self) -> SeriesRequirement {
        SeriesRequirement::Only(FailureSeriesType::CumulativeFailures)
    }

    fn fit_compatible(
        &self,
        dataset: &FailureDataset,
        evaluation_times: Option<&[f64]>,
    ) -> ReliabilityResult<ModelResult> {
        fit_mean_value_model(self, s_shaped_mean_value, &self.config, dataset, evaluation_times)
    }

    fn fresh(&self) -> Box<dyn ReliabilityModel> {
        Box::new(Self::new(self.config.clone()))
    }
}
