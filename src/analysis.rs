//! # Analysis Orchestration
//!
//! [`AnalysisService`] fits every compatible model to a dataset, optionally
//! scores each one out of sample and attaches a prediction band, then ranks the
//! successful fits by a chosen metric.
//!
//! A model whose fit (or validation) fails is left out of the ranking; the run
//! itself only fails on an invalid [`AnalysisConfig`].
//!
//! ## Usage Example
//!
//! ```rust
//! use reliability_growth::{AnalysisConfig, AnalysisService, FailureDataset, FailureSeriesType};
//! use reliability_growth::{GoelOkumotoModel, GreyModel, JelinskiMorandaModel};
//!
//! let t: Vec<f64> = (1..=12).map(|i| 5.0 * i as f64).collect();
//! let y: Vec<f64> = t.iter().map(|&t| 40.0 * (1.0 - (-0.04 * t).exp())).collect();
//! let ds = FailureDataset::new(t, y, FailureSeriesType::CumulativeFailures).unwrap();
//!
//! let service = AnalysisService::new()
//!     .with_model(GoelOkumotoModel::default())
//!     .with_model(GreyModel::default())
//!     .with_model(JelinskiMorandaModel::new());
//! let ranked = service.run(&ds, &AnalysisConfig::in_sample()).unwrap();
//!
//! // JM only accepts interval data and is skipped
//! assert_eq!(ranked.len(), 2);
//! assert_eq!(ranked[0].rank, 1);
//! ```

use crate::config::AnalysisConfig;
use crate::cross_validation::walk_forward_validate;
use crate::dataset::FailureDataset;
use crate::errors::ReliabilityResult;
use crate::metrics::is_higher_better;
use crate::prediction_intervals::normal_prediction_interval;
use crate::reliability_model::ReliabilityModel;
use crate::results::{ModelResult, RankedModelResult};
use std::cmp::Ordering;

/// Metric used when the requested ranking key is absent.
const FALLBACK_METRIC: &str = "rmse";

/// Runs a fixed set of models and ranks their results.
#[derive(Debug, Clone, Default)]
pub struct AnalysisService {
    models: Vec<Box<dyn ReliabilityModel>>,
}

impl AnalysisService {
    /// Service with no models.
    pub fn new() -> Self {
        Self::default()
    }

    /// Service over an existing model list.
    pub fn with_models(models: Vec<Box<dyn ReliabilityModel>>) -> Self {
        Self { models }
    }

    /// Builder form of [`add_model`](Self::add_model).
    pub fn with_model<M: ReliabilityModel + 'static>(mut self, model: M) -> Self {
        self.models.push(Box::new(model));
        self
    }

    /// Append a model; registration order breaks ranking ties.
    pub fn add_model(&mut self, model: Box<dyn ReliabilityModel>) {
        self.models.push(model);
    }

    /// Registered models in order.
    pub fn models(&self) -> &[Box<dyn ReliabilityModel>] {
        &self.models
    }

    /// Fit, validate, and rank every model that supports the dataset.
    ///
    /// # Arguments
    /// * `dataset` - Failure series to analyse
    /// * `config` - Evaluation grid, validation, ranking and interval settings
    ///
    /// # Returns
    /// * `Ok(Vec<RankedModelResult>)` - Successful fits, rank 1 first; possibly empty
    /// * `Err(InvalidParameter | InvalidDataset)` - `config` failed validation
    pub fn run(
        &self,
        dataset: &FailureDataset,
        config: &AnalysisConfig,
    ) -> ReliabilityResult<Vec<RankedModelResult>> {
        config.validate()?;

        let mut results = Vec::with_capacity(self.models.len());
        let mut compatible = 0;
        for model in &self.models {
            if !model.supports(dataset.series_type()) {
                log::debug!(
                    "{} skipped: requires {} data",
                    model.name(),
                    model.requirement()
                );
                continue;
            }
            compatible += 1;
            match analyse_model(model.as_ref(), dataset, config) {
                Ok(result) => results.push(result),
                Err(e) => log::warn!("{} skipped: {}", model.name(), e),
            }
        }

        let metric = config.ranking_metric();
        let ranked = rank_results(results, &metric);
        log::info!(
            "analysis finished: {} of {} compatible models fit ({} registered), ranked by {}",
            ranked.len(),
            compatible,
            self.models.len(),
            metric
        );
        Ok(ranked)
    }
}

fn analyse_model(
    model: &dyn ReliabilityModel,
    dataset: &FailureDataset,
    config: &AnalysisConfig,
) -> ReliabilityResult<ModelResult> {
    let mut result = model.fit(dataset, config.evaluation_times.as_deref())?;

    if config.validation.enabled {
        let outcome = walk_forward_validate(model, dataset, &config.validation)?;
        result.metrics.extend(outcome.metrics);
        result.diagnostics.insert(outcome.diagnostic);
    }

    if let Some(alpha) = config.prediction_interval_alpha {
        let actual = dataset.target_series();
        let overlap = actual.len().min(result.predictions.len());
        if overlap >= 2 {
            let band =
                normal_prediction_interval(&actual[..overlap], &result.predictions[..overlap], alpha)?;
            result.diagnostics.insert(band);
        }
    }

    Ok(result)
}

/// Sort results by `metric` and assign 1-based ranks.
///
/// `r2`/`cv_r2` sort descending, everything else ascending. A result without
/// `metric` is scored by `rmse`; one with neither, or with a NaN score, goes
/// last. Ties keep input order.
pub fn rank_results(mut results: Vec<ModelResult>, metric: &str) -> Vec<RankedModelResult> {
    let metric = metric.to_lowercase();
    let descending = is_higher_better(&metric);
    let score = |result: &ModelResult| {
        result
            .metric(&metric)
            .or_else(|| result.metric(FALLBACK_METRIC))
            .filter(|v| !v.is_nan())
    };

    results.sort_by(|a, b| match (score(a), score(b)) {
        (Some(x), Some(y)) => {
            let order = if descending {
                y.partial_cmp(&x)
            } else {
                x.partial_cmp(&y)
            };
            order.unwrap_or(Ordering::Equal)
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    results
        .into_iter()
        .enumerate()
        .map(|(i, result)| RankedModelResult { rank: i + 1, result })
        .collect()
}
