//! Goodness-of-fit metric computation shared by every model.
//!
//! [`compute_metrics`] is a pure function of two aligned arrays. Its output is
//! a [`FitMetrics`] struct; [`FitMetrics::to_map`] flattens it into the
//! string-keyed map stored on [`ModelResult`](crate::results::ModelResult).

use crate::errors::{validate_alignment, ReliabilityResult};
use crate::math_utils::{median, EPSILON_FLOOR};
use crate::statistical_tests::{chi_square_test, ks_two_sample};
use std::collections::BTreeMap;

/// Metric keys in output order.
pub const METRIC_KEYS: [&str; 13] = [
    "mae", "rmse", "mse", "mape", "max_error", "medae", "r2", "aic", "bic", "chi2", "chi2_p",
    "ks", "ks_p",
];

/// Metrics where a larger value is better.
pub const HIGHER_IS_BETTER: [&str; 2] = ["r2", "cv_r2"];

/// Prefix applied to walk-forward metrics.
pub const CV_PREFIX: &str = "cv_";

/// Standard metric set for one actual/predicted pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitMetrics {
    /// Mean absolute error
    pub mae: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Mean squared error
    pub mse: f64,
    /// Mean absolute percentage error (fraction, not percent)
    pub mape: f64,
    /// Largest absolute residual
    pub max_error: f64,
    /// Median absolute residual
    pub medae: f64,
    /// Coefficient of determination; 1.0 when the actual series is constant
    pub r2: f64,
    /// Gaussian-likelihood AIC approximation
    pub aic: f64,
    /// Gaussian-likelihood BIC approximation
    pub bic: f64,
    /// Pearson chi-square statistic
    pub chi2: f64,
    /// Chi-square p-value
    pub chi2_p: f64,
    /// Two-sample KS statistic
    pub ks: f64,
    /// KS p-value
    pub ks_p: f64,
}

impl FitMetrics {
    /// Flatten into `name -> value`.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.to_prefixed_map("")
    }

    /// Flatten into `prefix + name -> value`.
    pub fn to_prefixed_map(&self, prefix: &str) -> BTreeMap<String, f64> {
        let values = [
            self.mae,
            self.rmse,
            self.mse,
            self.mape,
            self.max_error,
            self.medae,
            self.r2,
            self.aic,
            self.bic,
            self.chi2,
            self.chi2_p,
            self.ks,
            self.ks_p,
        ];
        METRIC_KEYS
            .iter()
            .zip(values)
            .map(|(k, v)| (format!("{}{}", prefix, k), v))
            .collect()
    }
}

/// Whether a metric key ranks descending.
pub fn is_higher_better(metric: &str) -> bool {
    HIGHER_IS_BETTER.contains(&metric)
}

/// Compute the standard metric set.
///
/// # Arguments
/// * `actual` - Observed series
/// * `predicted` - Model output aligned with `actual`
/// * `param_count` - Number of fitted parameters used by AIC/BIC
///
/// # Returns
/// * `Ok(FitMetrics)` - Metrics; AIC/BIC are NaN when `n <= param_count` or `mse <= 0`
/// * `Err(ArrayAlignment)` - Lengths differ
/// * `Err(InsufficientData)` - Empty input
///
/// # Example
/// ```rust
/// use reliability_growth::metrics::compute_metrics;
///
/// let m = compute_metrics(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 2).unwrap();
/// assert_eq!(m.rmse, 0.0);
/// assert_eq!(m.r2, 1.0);
/// ```
pub fn compute_metrics(
    actual: &[f64],
    predicted: &[f64],
    param_count: usize,
) -> ReliabilityResult<FitMetrics> {
    validate_alignment(actual, predicted)?;
    crate::errors::validate_data_length(actual, 1)?;

    let n = actual.len() as f64;
    let residuals: Vec<f64> = actual.iter().zip(predicted).map(|(a, p)| a - p).collect();
    let abs_residuals: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();

    let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
    let mse = ss_res / n;
    let mae = abs_residuals.iter().sum::<f64>() / n;
    let rmse = mse.sqrt();
    let max_error = abs_residuals.iter().copied().fold(0.0, f64::max);
    let medae = median(&abs_residuals);
    let mape = residuals
        .iter()
        .zip(actual)
        .map(|(r, &a)| (r / a.max(EPSILON_FLOOR)).abs())
        .sum::<f64>()
        / n;

    let actual_mean = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|a| (a - actual_mean).powi(2)).sum();
    let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 1.0 };

    let (aic, bic) = if actual.len() > param_count && mse > 0.0 {
        let k = param_count as f64;
        (n * mse.ln() + 2.0 * k, n * mse.ln() + k * n.ln())
    } else {
        (f64::NAN, f64::NAN)
    };

    let observed: Vec<f64> = actual.iter().map(|a| a.max(EPSILON_FLOOR)).collect();
    let mut expected: Vec<f64> = predicted.iter().map(|p| p.max(EPSILON_FLOOR)).collect();
    let obs_sum: f64 = observed.iter().sum();
    let exp_sum: f64 = expected.iter().sum();
    if exp_sum > 0.0 && !crate::math_utils::float_ops::is_close(exp_sum, obs_sum, 1e-5, 1e-8) {
        let scale = obs_sum / exp_sum;
        for e in &mut expected {
            *e *= scale;
        }
    }
    let (chi2, chi2_p) = chi_square_test(&observed, &expected);
    let (ks, ks_p) = ks_two_sample(actual, predicted);

    Ok(FitMetrics {
        mae,
        rmse,
        mse,
        mape,
        max_error,
        medae,
        r2,
        aic,
        bic,
        chi2,
        chi2_p,
        ks,
        ks_p,
    })
}

/// [`compute_metrics`] flattened into a map.
pub fn compute_metric_map(
    actual: &[f64],
    predicted: &[f64],
    param_count: usize,
) -> ReliabilityResult<BTreeMap<String, f64>> {
    Ok(compute_metrics(actual, predicted, param_count)?.to_map())
}
