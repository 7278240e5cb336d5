//! EMD-style SVR/GM hybrid model.
//!
//! The cumulative curve is peeled into additive components by repeated
//! Savitzky-Golay smoothing: each pass's detail (input minus smooth) becomes a
//! component and the smooth part is carried to the next pass with a window two
//! points narrower. Every detail component is regressed on time with an SVR;
//! the final residue goes through GM(1,1). The prediction is the sum of all of
//! them.

use crate::dataset::{FailureDataset, FailureSeriesType};
use crate::errors::ReliabilityResult;
use crate::grey_model::GreyFit;
use crate::math_utils::variance;
use crate::reliability_model::{resolve_evaluation_times, ReliabilityModel, SeriesRequirement};
use crate::results::{ComponentSummary, Diagnostic, Diagnostics, ModelResult};
use crate::smoothing::savitzky_golay;
use crate::svr::{SvrConfig, SvrKernel, SvrRegressor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Smoothing polynomial order.
const SMOOTHING_ORDER: usize = 2;
/// Smallest usable smoothing window.
const MIN_WINDOW: usize = 5;
/// A component with every value inside this band counts as flat.
const FLAT_COMPONENT_TOLERANCE: f64 = 1e-6;

/// Hybrid model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridConfig {
    /// Kernel of the per-component regressors
    pub svr_kernel: SvrKernel,
    /// Box constraint of the per-component regressors
    pub svr_c: f64,
    /// Tube half-width of the per-component regressors
    pub svr_epsilon: f64,
    /// Upper bound on extracted components
    pub max_components: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            svr_kernel: SvrKernel::Rbf,
            svr_c: 20.0,
            svr_epsilon: 0.01,
            max_components: 3,
        }
    }
}

impl HybridConfig {
    fn svr_config(&self) -> SvrConfig {
        SvrConfig {
            kernel: self.svr_kernel,
            c: self.svr_c,
            epsilon: self.svr_epsilon,
            ..SvrConfig::default()
        }
    }
}

/// Additive split of a series into detail components and a smooth residue.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    /// Detail components, finest first
    pub components: Vec<Vec<f64>>,
    /// What is left after the last pass
    pub residue: Vec<f64>,
}

/// First smoothing window for a series of length `n`: the largest odd value
/// not above `n / 2`, at least 5, and below `n`. `None` when `n < 7`.
pub fn initial_window(n: usize) -> Option<usize> {
    if n < 7 {
        return None;
    }
    let mut window = n / 2;
    if window % 2 == 0 {
        window -= 1;
    }
    window = window.max(MIN_WINDOW);
    if window >= n {
        window = n - 2;
        if window % 2 == 0 {
            window -= 1;
        }
    }
    (window >= MIN_WINDOW).then_some(window)
}

/// Split `values` into at most `max_components` detail components plus residue.
pub fn decompose(values: &[f64], max_components: usize) -> ReliabilityResult<Decomposition> {
    let n = values.len();
    let passes = max_components.min((n / 6).max(1));
    let mut residue = values.to_vec();
    let mut components = Vec::new();
    let mut window = initial_window(n);

    for _ in 0..passes {
        let Some(w) = window.filter(|&w| w >= MIN_WINDOW && w < n) else {
            break;
        };
        let smooth = savitzky_golay(&residue, w, SMOOTHING_ORDER)?;
        let detail: Vec<f64> = residue.iter().zip(&smooth).map(|(r, s)| r - s).collect();
        if detail.iter().all(|d| d.abs() <= FLAT_COMPONENT_TOLERANCE) {
            break;
        }
        components.push(detail);
        residue = smooth;
        window = w.checked_sub(2);
    }

    Ok(Decomposition { components, residue })
}

/// Decomposition hybrid over cumulative failure data.
#[derive(Debug, Clone, Default)]
pub struct HybridModel {
    config: HybridConfig,
}

impl HybridModel {
    /// Model with explicit settings.
    pub fn new(config: HybridConfig) -> Self {
        Self { config }
    }
}

impl ReliabilityModel for HybridModel {
    fn name(&self) -> &str {
        "EMD-SVR/GM Hybrid"
    }

    fn requirement(&self) -> SeriesRequirement {
        SeriesRequirement::Only(FailureSeriesType::CumulativeFailures)
    }

    fn param_count(&self) -> usize {
        6
    }

    fn fit_compatible(
        &self,
        dataset: &FailureDataset,
        evaluation_times: Option<&[f64]>,
    ) -> ReliabilityResult<ModelResult> {
        let time_axis = dataset.time_axis();
        let targets = dataset.cumulative_failures();
        let n = targets.len();
        let decomposition = decompose(&targets, self.config.max_components)?;

        let grey = GreyFit::estimate(&decomposition.residue)?;
        let times = match grey {
            Some(_) => resolve_evaluation_times(dataset, evaluation_times),
            None => time_axis.to_vec(),
        };
        let residue_path = |len: usize| match &grey {
            Some(fit) => fit.cumulative_path(len),
            None => decomposition.residue[..len.min(n)].to_vec(),
        };

        let mut fitted = residue_path(n);
        let mut predictions = residue_path(times.len());

        let svr_config = self.config.svr_config();
        let mut summaries = Vec::with_capacity(decomposition.components.len());
        for (idx, component) in decomposition.components.iter().enumerate() {
            let regressor = SvrRegressor::fit(time_axis, component, &svr_config)?;
            for (f, &t) in fitted.iter_mut().zip(time_axis) {
                *f += regressor.predict_one(t);
            }
            for (p, &t) in predictions.iter_mut().zip(&times) {
                *p += regressor.predict_one(t);
            }
            summaries.push(ComponentSummary {
                component: idx + 1,
                variance: variance(component, 0),
            });
        }

        let metrics = self.compute_metrics(&targets, &fitted, None)?;

        let mut parameters = BTreeMap::new();
        parameters.insert("svr_kernel".to_string(), self.config.svr_kernel.as_str().into());
        parameters.insert("svr_c".to_string(), self.config.svr_c.into());
        parameters.insert("svr_epsilon".to_string(), self.config.svr_epsilon.into());
        parameters.insert("imfs".to_string(), decomposition.components.len().into());

        let mut diagnostics = Diagnostics::new();
        diagnostics.insert(Diagnostic::Decomposition {
            components: summaries,
            residue_variance: variance(&decomposition.residue, 0),
        });

        Ok(ModelResult {
            model_name: self.name().to_string(),
            parameters,
            times,
            predictions,
            metrics,
            diagnostics,
        })
    }

    fn fresh(&self) -> Box<dyn ReliabilityModel> {
        Box::new(Self::new(self.config.clone()))
    }
}
