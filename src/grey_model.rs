//! GM(1,1) grey forecasting model.
//!
//! Works on the increments `x0` of a cumulative series: the 1-AGO series `x1`
//! and its adjacent means `z1(k) = (x1(k) + x1(k-1)) / 2` give the linear
//! system `x0(k) = -a z1(k) + b`, solved by least squares. The whitened
//! response `x1(k) = (x1(1) - b/a) e^{-a(k-1)} + b/a` is the cumulative
//! reconstruction, kept non-decreasing with a running maximum.

use crate::dataset::{FailureDataset, FailureSeriesType};
use crate::errors::ReliabilityResult;
use crate::linear_algebra::economy_qr_solve;
use crate::math_utils::{float_ops, running_max, zero_prefixed_diff};
use crate::reliability_model::{resolve_evaluation_times, ReliabilityModel, SeriesRequirement};
use crate::results::{Diagnostics, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimum series length for a GM(1,1) fit.
pub const MIN_GREY_POINTS: usize = 3;

/// GM(1,1) has no tunables; the type exists so every model is configured the same way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GreyModelConfig {}

/// Fitted GM(1,1) development coefficient `a` and grey input `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GreyFit {
    /// Development coefficient
    pub a: f64,
    /// Grey input
    pub b: f64,
    first: f64,
}

impl GreyFit {
    /// Fit to a cumulative series; `Ok(None)` when it has fewer than 3 points.
    pub fn estimate(cumulative: &[f64]) -> ReliabilityResult<Option<Self>> {
        if cumulative.len() < MIN_GREY_POINTS {
            return Ok(None);
        }
        let x0 = zero_prefixed_diff(cumulative);
        let x1 = cumulative;

        let design: Vec<Vec<f64>> = x1
            .windows(2)
            .map(|w| vec![-0.5 * (w[0] + w[1]), 1.0])
            .collect();
        let theta = economy_qr_solve(&design, &x0[1..])?;

        Ok(Some(Self {
            a: theta[0],
            b: theta[1],
            first: x1[0],
        }))
    }

    /// Cumulative reconstruction for indices `0..len`, made non-decreasing.
    pub fn cumulative_path(&self, len: usize) -> Vec<f64> {
        let raw: Vec<f64> = if float_ops::approx_zero(self.a) {
            // a -> 0 limit: linear ramp
            (0..len).map(|k| self.first + self.b * k as f64).collect()
        } else {
            let steady = self.b / self.a;
            let scale = self.first - steady;
            (0..len)
                .map(|k| scale * (-self.a * k as f64).exp() + steady)
                .collect()
        };
        running_max(&raw)
    }
}

/// GM(1,1) model over cumulative failure data.
#[derive(Debug, Clone, Default)]
pub struct GreyModel {
    config: GreyModelConfig,
}

impl GreyModel {
    /// New model.
    pub fn new(config: GreyModelConfig) -> Self {
        Self { config }
    }
}

impl ReliabilityModel for GreyModel {
    fn name(&self) -> &str {
        "GM(1,1)"
    }

    fn requirement(&self) -> SeriesRequirement {
        SeriesRequirement::Only(FailureSeriesType::CumulativeFailures)
    }

    fn fit_compatible(
        &self,
        dataset: &FailureDataset,
        evaluation_times: Option<&[f64]>,
    ) -> ReliabilityResult<ModelResult> {
        let cumulative = dataset.cumulative_failures();
        let n = cumulative.len();

        let (a, b, fitted, times, predictions) = match GreyFit::estimate(&cumulative)? {
            Some(fit) => {
                let times = resolve_evaluation_times(dataset, evaluation_times);
                let predictions = fit.cumulative_path(times.len());
                (fit.a, fit.b, fit.cumulative_path(n), times, predictions)
            }
            None => {
                log::debug!("GM(1,1) needs {} points, got {}; echoing input", MIN_GREY_POINTS, n);
                (
                    f64::NAN,
                    f64::NAN,
                    cumulative.clone(),
                    dataset.time_axis().to_vec(),
                    cumulative.clone(),
                )
            }
        };
        let metrics = self.compute_metrics(&cumulative, &fitted, None)?;

        let mut parameters = BTreeMap::new();
        parameters.insert("a".to_string(), a.into());
        parameters.insert("b".to_string(), b.into());

        Ok(ModelResult {
            model_name: self.name().to_string(),
            parameters,
            times,
            predictions,
            metrics,
            diagnostics: Diagnostics::new(),
        })
    }

    fn fresh(&self) -> Box<dyn ReliabilityModel> {
        Box::new(Self::new(self.config.clone()))
    }
}
