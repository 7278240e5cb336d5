//! Goel-Okumoto NHPP model.
//!
//! Mean-value function `μ(t) = a (1 - e^{-b t})`, fit to the cumulative
//! failure curve by bounded least squares (`a, b >= 0`). The shared fitting
//! routine here also serves the delayed S-shaped model.

use crate::dataset::{FailureDataset, FailureSeriesType};
use crate::errors::ReliabilityResult;
use crate::least_squares::{fit_with_strategy, NhppFitConfig};
use crate::reliability_model::{resolve_evaluation_times, ReliabilityModel, SeriesRequirement};
use crate::results::{Diagnostic, Diagnostics, ModelResult};
use std::collections::BTreeMap;

/// `a (1 - e^{-b t})`.
pub fn go_mean_value(t: f64, a: f64, b: f64) -> f64 {
    a * (1.0 - (-b * t).exp())
}

/// Fit a two-parameter mean-value function to the cumulative curve and
/// evaluate it on the requested grid.
pub(crate) fn fit_mean_value_model<M, F>(
    model: &M,
    mean_value: F,
    config: &NhppFitConfig,
    dataset: &FailureDataset,
    evaluation_times: Option<&[f64]>,
) -> ReliabilityResult<ModelResult>
where
    M: ReliabilityModel + ?Sized,
    F: Fn(f64, f64, f64) -> f64,
{
    let time_axis = dataset.time_axis();
    let cumulative = dataset.cumulative_failures();
    let max_value = cumulative.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let curve = |t: f64, p: &[f64]| mean_value(t, p[0], p[1]);
    let outcome = fit_with_strategy(
        model.name(),
        curve,
        time_axis,
        &cumulative,
        &config.initial_guesses(max_value),
        config,
    )?;
    let (a, b) = (outcome.fit.params[0], outcome.fit.params[1]);

    let fitted: Vec<f64> = time_axis.iter().map(|&t| mean_value(t, a, b)).collect();
    let metrics = model.compute_metrics(&cumulative, &fitted, None)?;

    let times = resolve_evaluation_times(dataset, evaluation_times);
    let predictions = times.iter().map(|&t| mean_value(t, a, b)).collect();

    let mut parameters = BTreeMap::new();
    parameters.insert("a".to_string(), a.into());
    parameters.insert("b".to_string(), b.into());

    let mut diagnostics = Diagnostics::new();
    if !outcome.failed_attempts.is_empty() {
        diagnostics.insert(Diagnostic::FitAttempts {
            attempts: outcome.failed_attempts,
        });
    }

    Ok(ModelResult {
        model_name: model.name().to_string(),
        parameters,
        times,
        predictions,
        metrics,
        diagnostics,
    })
}

/// Goel-Okumoto model over cumulative failure data.
#[derive(Debug, Clone, Default)]
pub struct GoelOkumotoModel {
    config: NhppFitConfig,
}

impl GoelOkumotoModel {
    /// Model with explicit solver settings.
    pub fn new(config: NhppFitConfig) -> Self {
        Self { config }
    }

    /// Solver settings.
    pub fn config(&self) -> &NhppFitConfig {
        &self.config
    }
}

impl ReliabilityModel for GoelOkumotoModel {
    fn name(&self) -> &str {
        "Goel-Okumoto"
    }

    fn requirement(&self) -> SeriesRequirement {
        SeriesRequirement::Only(FailureSeriesType::CumulativeFailures)
    }

    fn fit_compatible(
        &self,
        dataset: &FailureDataset,
        evaluation_times: Option<&[f64]>,
    ) -> ReliabilityResult<ModelResult> {
        fit_mean_value_model(self, go_mean_value, &self.config, dataset, evaluation_times)
    }

    fn fresh(&self) -> Box<dyn ReliabilityModel> {
        Box::new(Self::new(self.config.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn synthetic(a: f64, b: f64) -> FailureDataset {
        let t: Vec<f64> = (1..=10).map(|i| 10.0 * i as f64).collect();
        let y = t.iter().map(|&t| go_mean_value(t, a, b)).collect();
        FailureDataset::new(t, y, FailureSeriesType::CumulativeFailures).unwrap()
    }

    #[test]
    fn test_recovers_parameters() {
        let result = GoelOkumotoModel::default().fit(&synthetic(50.0, 0.05), None).unwrap();
        assert_approx_eq!(result.parameter("a").unwrap(), 50.0, 5.0);
        assert_approx_eq!(result.parameter("b").unwrap(), 0.05, 0.02);
        assert!(result.metrics["rmse"] < 1e-2);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_single_guess_matches_ladder_on_clean_data() {
        let model = GoelOkumotoModel::new(NhppFitConfig::single_guess());
        let result = model.fit(&synthetic(50.0, 0.05), None).unwrap();
        assert_approx_eq!(result.parameter("a").unwrap(), 50.0, 5.0);
    }

    #[test]
    fn test_extrapolates_on_grid() {
        let grid: Vec<f64> = (1..=15).map(|i| 10.0 * i as f64).collect();
        let result = GoelOkumotoModel::default()
            .fit(&synthetic(50.0, 0.05), Some(&grid))
            .unwrap();
        assert_eq!(result.predictions.len(), 15);
        assert!(result.predictions.windows(2).all(|w| w[1] >= w[0]));
        assert!(result.predictions[14] <= 50.0 + 1e-6 + 5.0);
    }

    #[test]
    fn test_parameters_non_negative_on_flat_data() {
        let ds = FailureDataset::new(
            vec![1.0, 2.0, 3.0, 4.0],
            vec![5.0, 5.0, 5.0, 5.0],
            FailureSeriesType::CumulativeFailures,
        )
        .unwrap();
        if let Ok(result) = GoelOkumotoModel::default().fit(&ds, None) {
            assert!(result.parameter("a").unwrap() >= 0.0);
            assert!(result.parameter("b").unwrap() >= 0.0);
        }
    }
}
