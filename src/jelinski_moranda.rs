//! Jelinski-Moranda reliability growth model.
//!
//! The residual fault count drops by one at every failure, so the failure
//! intensity of interval *i* is `phi * (N0 - i + 1)`. Estimation is maximum
//! likelihood: the statistic `p = Σ (i-1) x_i / Σ x_i` decides whether a finite
//! `N0` exists at all (`p > (n-1)/2`); when it does, the MLE equation for `N0`
//! is bracketed by doubling and solved by bisection.
//!
//! Data without detectable reliability growth is rejected with
//! [`ReliabilityError::NoSolution`]; no large-`N0` stand-in is produced.

use crate::dataset::{FailureDataset, FailureSeriesType};
use crate::errors::{ReliabilityError, ReliabilityResult};
use crate::reliability_model::{resolve_evaluation_times, ReliabilityModel, SeriesRequirement};
use crate::results::{Diagnostics, ModelResult};
use std::collections::BTreeMap;

/// Offset of the lower bracket end above `n - 1`, where the MLE equation is singular.
const BRACKET_EPSILON: f64 = 1e-6;
/// Upper bracket doublings before giving up.
const MAX_BRACKET_EXPANSIONS: usize = 80;
/// Relative bracket width at which bisection stops.
const BISECTION_TOLERANCE: f64 = 1e-12;
/// Bisection iteration ceiling.
const MAX_BISECTION_ITERATIONS: usize = 10_000;
/// Smallest failure rate used when predicting intervals.
const MIN_FAILURE_RATE: f64 = 1e-12;

/// Fitted Jelinski-Moranda parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JmEstimate {
    /// Initial number of faults
    pub n0: f64,
    /// Per-fault hazard contribution
    pub phi: f64,
    /// Growth statistic `Σ (i-1) x_i / Σ x_i`
    pub p: f64,
}

/// `Σ_{k=0}^{n-1} 1/(N-k) - n/(N-p)`, summed termwise as `(k-p) / ((N-k)(N-p))`.
///
/// The direct difference cancels catastrophically once `N` is large relative
/// to `n`; the termwise form keeps the sign reliable for any `N0`.
fn mle_equation(n_faults: f64, n: usize, p: f64) -> f64 {
    let shifted = n_faults - p;
    (0..n)
        .map(|k| {
            let k = k as f64;
            (k - p) / ((n_faults - k) * shifted)
        })
        .sum()
}

/// Estimate `(N0, phi)` from failure intervals.
///
/// # Errors
/// * `InsufficientData` - fewer than 2 intervals
/// * `NoSolution` - non-positive total time, `p <= (n-1)/2`, the bracket never
///   changes sign, or `phi` has a non-positive denominator
/// * `NonConvergence` - bisection exceeds its iteration ceiling
pub fn estimate_parameters(intervals: &[f64]) -> ReliabilityResult<JmEstimate> {
    const MODEL: &str = "Jelinski-Moranda";
    let n = intervals.len();
    if n < 2 {
        return Err(ReliabilityError::InsufficientData {
            required: 2,
            actual: n,
        });
    }

    let total_time: f64 = intervals.iter().sum();
    if !(total_time > 0.0) {
        return Err(ReliabilityError::NoSolution {
            model: MODEL.to_string(),
            reason: format!("total failure time must be positive, got {}", total_time),
        });
    }

    let weighted_time: f64 = intervals
        .iter()
        .enumerate()
        .map(|(i, &x)| i as f64 * x)
        .sum();
    let p = weighted_time / total_time;
    let threshold = (n as f64 - 1.0) / 2.0;
    if p <= threshold {
        return Err(ReliabilityError::NoSolution {
            model: MODEL.to_string(),
            reason: format!(
                "no reliability growth: p = {:.6} <= (n-1)/2 = {:.1}, finite N0 does not exist",
                p, threshold
            ),
        });
    }

    let mut lower = n as f64 - 1.0 + BRACKET_EPSILON;
    let mut upper = 2.0 * lower;
    let mut expansions = 0;
    while mle_equation(upper, n, p) > 0.0 {
        if expansions == MAX_BRACKET_EXPANSIONS {
            return Err(ReliabilityError::NoSolution {
                model: MODEL.to_string(),
                reason: format!("MLE bracket did not change sign up to N = {:e}", upper),
            });
        }
        lower = upper;
        upper *= 2.0;
        expansions += 1;
    }
    log::debug!(
        "JM bracket [{:.6}, {:.6}] after {} expansion(s)",
        lower,
        upper,
        expansions
    );

    let n0 = bisect(|v| mle_equation(v, n, p), lower, upper)?;

    let denominator = n0 * total_time - weighted_time;
    if !(denominator > 0.0) {
        return Err(ReliabilityError::NoSolution {
            model: MODEL.to_string(),
            reason: format!("phi denominator N0*T - Σ(i-1)x_i = {} is not positive", denominator),
        });
    }
    let phi = n as f64 / denominator;

    Ok(JmEstimate { n0, phi, p })
}

/// Bisection on a bracket where `f(lower) > 0 >= f(upper)`.
///
/// Stops on the relative bracket width only; near the root `f` is of order
/// `1/N^3`, so its magnitude says nothing about convergence.
fn bisect<F: Fn(f64) -> f64>(f: F, mut lower: f64, mut upper: f64) -> ReliabilityResult<f64> {
    for _ in 0..MAX_BISECTION_ITERATIONS {
        let mid = 0.5 * (lower + upper);
        if upper - lower <= BISECTION_TOLERANCE * upper.abs() {
            return Ok(mid);
        }
        let value = f(mid);
        if value > 0.0 {
            lower = mid;
        } else {
            upper = mid;
        }
    }
    Err(ReliabilityError::NonConvergence {
        operation: "Jelinski-Moranda bisection".to_string(),
        iterations: MAX_BISECTION_ITERATIONS,
        attempts: Vec::new(),
    })
}

/// Expected intervals `1 / (phi (N0 - i + 1))` for `i = 1..=count`.
///
/// The rate is floored at a tiny positive value once `i` passes `N0`.
pub fn expected_intervals(estimate: &JmEstimate, count: usize) -> Vec<f64> {
    (1..=count)
        .map(|i| {
            let rate = estimate.phi * (estimate.n0 - i as f64 + 1.0);
            1.0 / rate.max(MIN_FAILURE_RATE)
        })
        .collect()
}

/// Jelinski-Moranda model over time-between-failures data.
#[derive(Debug, Clone, Copy, Default)]
pub struct JelinskiMorandaModel;

impl JelinskiMorandaModel {
    /// New model.
    pub fn new() -> Self {
        Self
    }
}

impl ReliabilityModel for JelinskiMorandaModel {
    fn name(&self) -> &str {
        "Jelinski-Moranda"
    }

    fn requirement(&self) -> SeriesRequirement {
        SeriesRequirement::Only(FailureSeriesType::TimeBetweenFailures)
    }

    fn fit_compatible(
        &self,
        dataset: &FailureDataset,
        evaluation_times: Option<&[f64]>,
    ) -> ReliabilityResult<ModelResult> {
        let intervals = dataset.failure_intervals();
        let estimate = estimate_parameters(&intervals)?;

        let fitted = expected_intervals(&estimate, intervals.len());
        let metrics = self.compute_metrics(&intervals, &fitted, None)?;

        let times = resolve_evaluation_times(dataset, evaluation_times);
        let predictions = expected_intervals(&estimate, times.len());

        let mut parameters = BTreeMap::new();
        parameters.insert("N0".to_string(), estimate.n0.into());
        parameters.insert("phi".to_string(), estimate.phi.into());

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
        Box::new(Self::new())
    }
}
