//! The capability contract every reliability-growth model implements.
//!
//! Models are stateless with respect to fitting: [`ReliabilityModel::fit`]
//! takes `&self` and everything it estimates is returned in the
//! [`ModelResult`]. A model value therefore only carries configuration, and
//! [`ReliabilityModel::fresh`] yields an independent instance that shares no
//! state with its source, which walk-forward validation relies on.

use crate::dataset::{FailureDataset, FailureSeriesType};
use crate::errors::{ReliabilityError, ReliabilityResult};
use crate::metrics::compute_metric_map;
use crate::results::ModelResult;
use std::collections::BTreeMap;
use std::fmt;

/// Which series type a model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesRequirement {
    /// Any series type
    Any,
    /// Exactly this series type
    Only(FailureSeriesType),
}

impl SeriesRequirement {
    /// True when `series_type` satisfies the requirement.
    pub fn accepts(&self, series_type: FailureSeriesType) -> bool {
        match self {
            SeriesRequirement::Any => true,
            SeriesRequirement::Only(required) => *required == series_type,
        }
    }
}

impl fmt::Display for SeriesRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesRequirement::Any => f.write_str("any"),
            SeriesRequirement::Only(t) => write!(f, "{}", t),
        }
    }
}

/// A reliability-growth estimator.
///
/// Implementors provide [`fit_compatible`](Self::fit_compatible); callers use
/// [`fit`](Self::fit), which checks series-type compatibility first.
///
/// # Example
/// ```rust
/// use reliability_growth::{FailureDataset, FailureSeriesType, GoelOkumotoModel, ReliabilityModel};
///
/// let t: Vec<f64> = (1..=10).map(|i| 10.0 * i as f64).collect();
/// let y: Vec<f64> = t.iter().map(|&t| 50.0 * (1.0 - (-0.05 * t).exp())).collect();
/// let ds = FailureDataset::new(t, y, FailureSeriesType::CumulativeFailures).unwrap();
///
/// let model = GoelOkumotoModel::default();
/// assert!(model.supports(ds.series_type()));
/// let result = model.fit(&ds, None).unwrap();
/// assert_eq!(result.predictions.len(), ds.len());
/// ```
pub trait ReliabilityModel: Send + Sync + fmt::Debug {
    /// Display name, used as `ModelResult::model_name`.
    fn name(&self) -> &str;

    /// Series type this model accepts.
    fn requirement(&self) -> SeriesRequirement;

    /// Number of fitted parameters used by AIC/BIC.
    fn param_count(&self) -> usize {
        2
    }

    /// Model-specific estimation; the dataset is already known to be compatible.
    fn fit_compatible(
        &self,
        dataset: &FailureDataset,
        evaluation_times: Option<&[f64]>,
    ) -> ReliabilityResult<ModelResult>;

    /// Independent, unfitted instance with the same configuration.
    fn fresh(&self) -> Box<dyn ReliabilityModel>;

    /// True iff the model can be fit to `series_type`.
    fn supports(&self, series_type: FailureSeriesType) -> bool {
        self.requirement().accepts(series_type)
    }

    /// Fit the model and evaluate it at `evaluation_times` (default: the
    /// dataset's own time axis).
    ///
    /// # Errors
    /// * `ModelIncompatible` - the dataset's series type is not supported
    /// * Any estimator failure (`NoSolution`, `NonConvergence`, ...)
    fn fit(
        &self,
        dataset: &FailureDataset,
        evaluation_times: Option<&[f64]>,
    ) -> ReliabilityResult<ModelResult> {
        ensure_compatible(self, dataset)?;
        log::debug!("fitting {} on {} points", self.name(), dataset.len());
        let result = self.fit_compatible(dataset, evaluation_times)?;
        log::debug!(
            "{} fitted, rmse = {:?}",
            self.name(),
            result.metrics.get("rmse")
        );
        Ok(result)
    }

    /// Standard metric set with this model's parameter count unless overridden.
    fn compute_metrics(
        &self,
        actual: &[f64],
        predicted: &[f64],
        param_count: Option<usize>,
    ) -> ReliabilityResult<BTreeMap<String, f64>> {
        compute_metric_map(actual, predicted, param_count.unwrap_or(self.param_count()))
    }
}

impl Clone for Box<dyn ReliabilityModel> {
    fn clone(&self) -> Self {
        self.fresh()
    }
}

/// Fail with `ModelIncompatible` unless `model` supports the dataset.
pub fn ensure_compatible<M: ReliabilityModel + ?Sized>(
    model: &M,
    dataset: &FailureDataset,
) -> ReliabilityResult<()> {
    if model.supports(dataset.series_type()) {
        return Ok(());
    }
    Err(ReliabilityError::ModelIncompatible {
        model: model.name().to_string(),
        expected: model.requirement().to_string(),
        actual: dataset.series_type().to_string(),
    })
}

/// The evaluation grid: explicit times or the dataset's own axis.
pub fn resolve_evaluation_times(
    dataset: &FailureDataset,
    evaluation_times: Option<&[f64]>,
) -> Vec<f64> {
    evaluation_times
        .map(<[f64]>::to_vec)
        .unwrap_or_else(|| dataset.time_axis().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Diagnostics;

    /// Echoes the training series back as its prediction.
    #[derive(Debug, Clone)]
    struct Echo;

    impl ReliabilityModel for Echo {
        fn name(&self) -> &str {
            "Echo"
        }

        fn requirement(&self) -> SeriesRequirement {
            SeriesRequirement::Only(FailureSeriesType::CumulativeFailures)
        }

        fn fit_compatible(
            &self,
            dataset: &FailureDataset,
            evaluation_times: Option<&[f64]>,
        ) -> ReliabilityResult<ModelResult> {
            let actual = dataset.cumulative_failures();
            Ok(ModelResult {
                model_name: self.name().to_string(),
                parameters: BTreeMap::new(),
                times: resolve_evaluation_times(dataset, evaluation_times),
                predictions: actual.clone(),
                metrics: self.compute_metrics(&actual, &actual, None)?,
                diagnostics: Diagnostics::new(),
            })
        }

        fn fresh(&self) -> Box<dyn ReliabilityModel> {
            Box::new(Echo)
        }
    }

    #[test]
    fn test_incompatible_series_rejected_before_fit() {
        let ds = FailureDataset::from_values(vec![1.0, 2.0], FailureSeriesType::TimeBetweenFailures)
            .unwrap();
        assert!(!Echo.supports(ds.series_type()));
        match Echo.fit(&ds, None) {
            Err(ReliabilityError::ModelIncompatible { model, expected, actual }) => {
                assert_eq!(model, "Echo");
                assert_eq!(expected, "cumulative_failures");
                assert_eq!(actual, "time_between_failures");
            }
            other => panic!("expected ModelIncompatible, got {:?}", other),
        }
    }

    #[test]
    fn test_fit_defaults_to_dataset_axis() {
        let ds = FailureDataset::from_values(vec![1.0, 3.0, 4.0], FailureSeriesType::CumulativeFailures)
            .unwrap();
        let result = Echo.fit(&ds, None).unwrap();
        assert_eq!(result.times, vec![1.0, 2.0, 3.0]);
        assert_eq!(result.metrics["r2"], 1.0);

        let boxed: Box<dyn ReliabilityModel> = Box::new(Echo);
        let copy = boxed.clone();
        assert_eq!(copy.name(), "Echo");
    }

    #[test]
    fn test_any_requirement() {
        assert!(SeriesRequirement::Any.accepts(FailureSeriesType::TimeBetweenFailures));
        assert_eq!(SeriesRequirement::Any.to_string(), "any");
    }
}
