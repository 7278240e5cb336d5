//! Mathematical utility functions shared by the estimators.
//!
//! Small, allocation-light helpers over `&[f64]`: NaN-safe ordering, moments,
//! medians, accumulation/differencing and the standard normal quantile.

use once_cell::sync::Lazy;
use statrs::distribution::{ContinuousCDF, Normal};

/// Floor used wherever a denominator or observed value must stay positive.
pub const EPSILON_FLOOR: f64 = 1e-8;

/// Cached standard normal distribution.
static STANDARD_NORMAL: Lazy<Option<Normal>> = Lazy::new(|| Normal::new(0.0, 1.0).ok());

/// Safe comparison for floating point values (NaN sorts last).
pub fn float_total_cmp(a: &f64, b: &f64) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal),
    }
}

/// Arithmetic mean; NaN for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Variance with `ddof` delta degrees of freedom (0 = population, 1 = sample).
///
/// Returns NaN when `values.len() <= ddof`.
pub fn variance(values: &[f64], ddof: usize) -> f64 {
    let n = values.len();
    if n <= ddof {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|&x| (x - m) * (x - m)).sum::<f64>() / (n - ddof) as f64
}

/// Standard deviation with `ddof` delta degrees of freedom.
pub fn std_dev(values: &[f64], ddof: usize) -> f64 {
    variance(values, ddof).sqrt()
}

/// Calculate median of already-sorted data (handles even-length correctly)
pub fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Calculate median (handles even-length correctly)
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut v = values.to_vec();
    v.sort_by(float_total_cmp);
    median_of_sorted(&v)
}

/// Running sum: `out[k] = values[0] + ... + values[k]`.
pub fn cumulative_sum(values: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    values
        .iter()
        .map(|&v| {
            acc += v;
            acc
        })
        .collect()
}

/// First difference with an implicit zero before the first element.
///
/// Inverse of [`cumulative_sum`]: `out[0] = values[0]`, `out[k] = values[k] - values[k-1]`.
pub fn zero_prefixed_diff(values: &[f64]) -> Vec<f64> {
    let mut prev = 0.0;
    values
        .iter()
        .map(|&v| {
            let d = v - prev;
            prev = v;
            d
        })
        .collect()
}

/// Running maximum, making any sequence non-decreasing.
pub fn running_max(values: &[f64]) -> Vec<f64> {
    let mut best = f64::NEG_INFINITY;
    values
        .iter()
        .map(|&v| {
            if v > best {
                best = v;
            }
            best
        })
        .collect()
}

/// Inverse CDF of the standard normal distribution.
///
/// Returns NaN outside (0, 1).
pub fn standard_normal_quantile(p: f64) -> f64 {
    if !(p > 0.0 && p < 1.0) {
        return f64::NAN;
    }
    match STANDARD_NORMAL.as_ref() {
        Some(normal) => normal.inverse_cdf(p),
        None => f64::NAN,
    }
}

/// Survival function of the Kolmogorov distribution, `Q_KS(lambda)`.
///
/// `Q_KS(lambda) = 2 * sum_{j>=1} (-1)^(j-1) exp(-2 j^2 lambda^2)`, clamped to [0, 1].
pub fn kolmogorov_survival(lambda: f64) -> f64 {
    if !lambda.is_finite() {
        return f64::NAN;
    }
    if lambda < 1e-3 {
        return 1.0;
    }
    let mut sum = 0.0;
    let mut sign = 1.0;
    for j in 1..=100 {
        let jf = j as f64;
        let term = sign * (-2.0 * jf * jf * lambda * lambda).exp();
        sum += term;
        if term.abs() < 1e-12 {
            break;
        }
        sign = -sign;
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

/// Tolerant float comparisons.
pub mod float_ops {
    /// Default absolute tolerance for "numerically zero".
    pub const DEFAULT_EPSILON: f64 = 1e-12;

    /// True when `|x| < eps`.
    #[inline]
    pub fn approx_zero_eps(x: f64, eps: f64) -> bool {
        x.abs() < eps
    }

    /// True when `|x| < DEFAULT_EPSILON`.
    #[inline]
    pub fn approx_zero(x: f64) -> bool {
        approx_zero_eps(x, DEFAULT_EPSILON)
    }

    /// Relative-or-absolute closeness in the style of `numpy.isclose`.
    #[inline]
    pub fn is_close(a: f64, b: f64, rtol: f64, atol: f64) -> bool {
        (a - b).abs() <= atol + rtol * b.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_median_even_and_odd() {
        assert_approx_eq!(median(&[3.0, 1.0, 2.0]), 2.0, 1e-12);
        assert_approx_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5, 1e-12);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn test_variance_ddof() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_approx_eq!(variance(&v, 0), 1.25, 1e-12);
        assert_approx_eq!(variance(&v, 1), 5.0 / 3.0, 1e-12);
        assert!(variance(&[1.0], 1).is_nan());
    }

    #[test]
    fn test_cumsum_and_diff_are_inverse() {
        let x = [2.0, 0.5, 3.0, 1.5];
        let c = cumulative_sum(&x);
        assert_eq!(c, vec![2.0, 2.5, 5.5, 7.0]);
        let back = zero_prefixed_diff(&c);
        for (a, b) in back.iter().zip(x.iter()) {
            assert_approx_eq!(a, b, 1e-12);
        }
    }

    #[test]
    fn test_running_max_non_decreasing() {
        assert_eq!(running_max(&[1.0, 3.0, 2.0, 5.0, 4.0]), vec![1.0, 3.0, 3.0, 5.0, 5.0]);
    }

    #[test]
    fn test_normal_quantile() {
        assert_approx_eq!(standard_normal_quantile(0.975), 1.959964, 1e-5);
        assert_approx_eq!(standard_normal_quantile(0.5), 0.0, 1e-9);
        assert!(standard_normal_quantile(1.0).is_nan());
    }

    #[test]
    fn test_kolmogorov_survival_range() {
        assert_approx_eq!(kolmogorov_survival(0.0), 1.0, 1e-12);
        // Classical 5% critical value of the Kolmogorov distribution
        assert_approx_eq!(kolmogorov_survival(1.3581), 0.05, 1e-3);
        assert!(kolmogorov_survival(5.0) < 1e-10);
    }

    #[test]
    fn test_float_total_cmp_nan_last() {
        let mut v = vec![2.0, f64::NAN, 1.0];
        v.sort_by(float_total_cmp);
        assert_eq!(v[0], 1.0);
        assert_eq!(v[1], 2.0);
        assert!(v[2].is_nan());
    }
}
