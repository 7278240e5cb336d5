//! Value-level preprocessing used by [`FailureDataset`](crate::dataset::FailureDataset).
//!
//! Normalization and z-score outlier screening. Degenerate inputs (zero span,
//! zero variance) map to all-zero outputs rather than dividing by zero.

use crate::errors::{ReliabilityError, ReliabilityResult};
use crate::math_utils::{mean, std_dev};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default z-score above which a value is flagged as an outlier.
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 3.0;

/// Value normalization methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NormalizationMethod {
    /// Rescale to [0, 1] by `(x - min) / (max - min)`
    #[default]
    MinMax,
    /// Standardize by `(x - mean) / std` with population std
    ZScore,
}

impl FromStr for NormalizationMethod {
    type Err = ReliabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "min-max" | "minmax" => Ok(NormalizationMethod::MinMax),
            "z-score" | "zscore" => Ok(NormalizationMethod::ZScore),
            other => Err(ReliabilityError::InvalidParameter {
                parameter: format!("normalization method '{}'", other),
                value: f64::NAN,
                constraint: "one of: min-max, z-score".to_string(),
            }),
        }
    }
}

/// Normalize values with the given method.
pub fn normalize(values: &[f64], method: NormalizationMethod) -> Vec<f64> {
    match method {
        NormalizationMethod::MinMax => {
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let span = max - min;
            if span > 0.0 {
                values.iter().map(|&v| (v - min) / span).collect()
            } else {
                vec![0.0; values.len()]
            }
        }
        NormalizationMethod::ZScore => {
            let m = mean(values);
            let sd = std_dev(values, 0);
            if sd > 0.0 {
                values.iter().map(|&v| (v - m) / sd).collect()
            } else {
                vec![0.0; values.len()]
            }
        }
    }
}

/// Flag values whose absolute z-score exceeds `threshold`.
pub fn zscore_outlier_mask(values: &[f64], threshold: f64) -> Vec<bool> {
    let sd = std_dev(values, 0);
    if !(sd > 0.0) {
        return vec![false; values.len()];
    }
    let m = mean(values);
    values
        .iter()
        .map(|&v| ((v - m) / sd).abs() > threshold)
        .collect()
}

/// Validate a normalization method name without building anything.
pub fn parse_normalization(name: &str) -> ReliabilityResult<NormalizationMethod> {
    name.parse()
}
