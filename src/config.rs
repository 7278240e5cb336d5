//! # Analysis Configuration
//!
//! Run-level settings for [`AnalysisService::run`](crate::analysis::AnalysisService::run):
//! the evaluation grid, walk-forward validation, the ranking metric and the
//! optional prediction band.

use crate::cross_validation::WalkForwardConfig;
use crate::errors::{validate_all_finite, validate_probability, ReliabilityResult};
use serde::{Deserialize, Serialize};

/// Configuration for one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Times at which every model is evaluated; the dataset axis when `None`
    pub evaluation_times: Option<Vec<f64>>,
    /// Walk-forward validation settings
    pub validation: WalkForwardConfig,
    /// Metric to rank by; `cv_rmse` with validation, else `rmse`
    pub rank_by: Option<String>,
    /// Significance level of the attached prediction band, if any
    pub prediction_interval_alpha: Option<f64>,
}

impl AnalysisConfig {
    /// In-sample fit only, ranked by training RMSE
    pub fn in_sample() -> Self {
        Self::default()
    }

    /// One-step walk-forward validation with an automatic training window,
    /// ranked by `cv_rmse`
    pub fn cross_validated() -> Self {
        Self {
            validation: WalkForwardConfig::expanding(None, 1),
            ..Self::default()
        }
    }

    /// Rank by `metric` (case-insensitive)
    pub fn with_rank_by(mut self, metric: impl Into<String>) -> Self {
        self.rank_by = Some(metric.into());
        self
    }

    /// Attach a normal prediction band at significance `alpha`
    pub fn with_prediction_interval(mut self, alpha: f64) -> Self {
        self.prediction_interval_alpha = Some(alpha);
        self
    }

    /// Replace the validation settings
    pub fn with_validation(mut self, validation: WalkForwardConfig) -> Self {
        self.validation = validation;
        self
    }

    /// Evaluate every model on `times`
    pub fn with_evaluation_times(mut self, times: Vec<f64>) -> Self {
        self.evaluation_times = Some(times);
        self
    }

    /// Metric used for ranking, lowercased.
    pub fn ranking_metric(&self) -> String {
        match &self.rank_by {
            Some(metric) => metric.to_lowercase(),
            None if self.validation.enabled => "cv_rmse".to_string(),
            None => "rmse".to_string(),
        }
    }

    /// Check the settings before any model runs.
    ///
    /// # Errors
    /// * `InvalidParameter` - alpha outside (0, 1) or a zero horizon
    /// * `InvalidDataset` - non-finite evaluation times
    pub fn validate(&self) -> ReliabilityResult<()> {
        if let Some(alpha) = self.prediction_interval_alpha {
            validate_probability(alpha, "prediction_interval_alpha")?;
        }
        if self.validation.enabled {
            self.validation.validate()?;
        }
        if let Some(times) = &self.evaluation_times {
            validate_all_finite(times, "evaluation_times")?;
        }
        Ok(())
    }
}
