//! Savitzky-Golay smoothing.
//!
//! Local least-squares polynomial smoothing over an odd window. Interior points
//! use the fixed convolution weights of the centred fit; the first and last
//! half-windows are taken from a polynomial fit to the first/last full window
//! (the "interp" edge mode), so the output has the input's length and no
//! padding artefacts.

use crate::errors::{ReliabilityError, ReliabilityResult};
use crate::linear_algebra::{polyfit, polyval};

/// Smooth `values` with a degree-`polyorder` polynomial over `window` points.
///
/// # Errors
/// `InvalidParameter` when `window` is even, not larger than `polyorder`, or
/// longer than the series.
pub fn savitzky_golay(values: &[f64], window: usize, polyorder: usize) -> ReliabilityResult<Vec<f64>> {
    let n = values.len();
    if window % 2 == 0 || window <= polyorder || window > n {
        return Err(ReliabilityError::InvalidParameter {
            parameter: "window".to_string(),
            value: window as f64,
            constraint: format!(
                "odd, greater than polyorder ({}) and at most the series length ({})",
                polyorder, n
            ),
        });
    }

    let half = window / 2;
    let offsets: Vec<f64> = (0..window).map(|j| j as f64 - half as f64).collect();

    // Centre-point weights: the constant term of the fit to each unit impulse
    let mut weights = Vec::with_capacity(window);
    let mut impulse = vec![0.0; window];
    for j in 0..window {
        impulse[j] = 1.0;
        weights.push(polyfit(&offsets, &impulse, polyorder)?[0]);
        impulse[j] = 0.0;
    }

    let mut smooth = vec![0.0; n];
    for i in half..n - half {
        smooth[i] = weights
            .iter()
            .zip(&values[i - half..=i + half])
            .map(|(w, v)| w * v)
            .sum();
    }

    let head = polyfit(&offsets, &values[..window], polyorder)?;
    for (i, slot) in smooth.iter_mut().enumerate().take(half) {
        *slot = polyval(&head, offsets[i]);
    }
    let tail = polyfit(&offsets, &values[n - window..], polyorder)?;
    for k in 0..half {
        smooth[n - half + k] = polyval(&tail, offsets[window - half + k]);
    }

    Ok(smooth)
}
