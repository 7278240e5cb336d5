//! Symmetric normal-approximation prediction bands.

use crate::errors::{validate_alignment, validate_data_length, validate_probability, ReliabilityResult};
use crate::math_utils::{standard_normal_quantile, std_dev};
use crate::results::Diagnostic;

/// Band `predicted ± z·σ` where `σ` is the residual standard deviation and
/// `z = Φ⁻¹(1 − α/2)`.
///
/// `σ` uses one delta degree of freedom when at least two points are given.
///
/// # Returns
/// * `Ok(Diagnostic::PredictionInterval)` - Bounds aligned with `predicted`
/// * `Err(InvalidParameter)` - `alpha` outside (0, 1)
/// * `Err(ArrayAlignment)` - Length mismatch
/// * `Err(InsufficientData)` - Empty input
///
/// # Example
/// ```rust
/// use reliability_growth::prediction_intervals::normal_prediction_interval;
/// use reliability_growth::Diagnostic;
///
/// let band = normal_prediction_interval(&[1.0, 2.0, 4.0], &[1.5, 2.0, 3.5], 0.05).unwrap();
/// if let Diagnostic::PredictionInterval { lower, upper, .. } = band {
///     assert!(lower.iter().zip(&upper).all(|(l, u)| l < u));
/// }
/// ```
pub fn normal_prediction_interval(
    actual: &[f64],
    predicted: &[f64],
    alpha: f64,
) -> ReliabilityResult<Diagnostic> {
    validate_probability(alpha, "alpha")?;
    validate_alignment(actual, predicted)?;
    validate_data_length(actual, 1)?;

    let residuals: Vec<f64> = actual.iter().zip(predicted).map(|(a, p)| a - p).collect();
    let ddof = usize::from(residuals.len() >= 2);
    let sigma = std_dev(&residuals, ddof);
    let z = standard_normal_quantile(1.0 - alpha / 2.0);
    let half_width = z * sigma;

    Ok(Diagnostic::PredictionInterval {
        lower: predicted.iter().map(|p| p - half_width).collect(),
        upper: predicted.iter().map(|p| p + half_width).collect(),
        method: "normal".to_string(),
        alpha,
        sigma,
        z,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ReliabilityError;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_band_width() {
        // residuals 1, -1: sample std = sqrt(2)
        let band = normal_prediction_interval(&[2.0, 2.0], &[1.0, 3.0], 0.05).unwrap();
        match band {
            Diagnostic::PredictionInterval { lower, upper, sigma, z, method, .. } => {
                assert_approx_eq!(sigma, 2f64.sqrt(), 1e-12);
                assert_approx_eq!(z, 1.959964, 1e-5);
                assert_approx_eq!(upper[0] - lower[0], 2.0 * z * sigma, 1e-12);
                assert_eq!(method, "normal");
            }
            other => panic!("unexpected diagnostic {:?}", other),
        }
    }

    #[test]
    fn test_perfect_fit_collapses() {
        let band = normal_prediction_interval(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 0.1).unwrap();
        if let Diagnostic::PredictionInterval { lower, upper, sigma, .. } = band {
            assert_eq!(sigma, 0.0);
            assert_eq!(lower, upper);
        }
    }

    #[test]
    fn test_alpha_bounds() {
        for alpha in [0.0, 1.0, -0.5, f64::NAN] {
            assert!(matches!(
                normal_prediction_interval(&[1.0, 2.0], &[1.0, 2.0], alpha),
                Err(ReliabilityError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_misaligned_inputs() {
        assert!(matches!(
            normal_prediction_interval(&[1.0, 2.0], &[1.0], 0.05),
            Err(ReliabilityError::ArrayAlignment { .. })
        ));
    }
}
