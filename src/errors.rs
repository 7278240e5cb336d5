//! Error types and validation functions for reliability growth analysis.
//!
//! Every fallible operation in the crate returns [`ReliabilityResult`]. The
//! variants mirror the failure taxonomy the orchestration layer reacts to:
//! incompatibility, no-solution/non-convergence, insufficient data, numerical
//! degeneracy and array alignment, plus the I/O family used by experiment
//! bundles.

use std::sync::Arc;
use thiserror::Error;

/// Comprehensive error type for reliability model fitting and evaluation.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum ReliabilityError {
    /// Too few observations for the requested algorithm.
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData {
        /// Minimum required data points
        required: usize,
        /// Actual number of data points provided
        actual: usize,
    },

    /// Invalid parameter value for a configuration or estimator.
    #[error("Invalid parameter: {parameter} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value provided
        value: f64,
        /// Valid range or constraint description
        constraint: String,
    },

    /// A model was invoked against a series type it does not support.
    #[error("Model {model} expects '{expected}' data, received '{actual}'")]
    ModelIncompatible {
        /// Display name of the model
        model: String,
        /// Series type the model requires
        expected: String,
        /// Series type that was supplied
        actual: String,
    },

    /// The estimator has no valid solution for this data.
    #[error("No valid solution for {model}: {reason}")]
    NoSolution {
        /// Display name of the model
        model: String,
        /// Why no solution exists
        reason: String,
    },

    /// An iterative solver exhausted its iteration ceiling or every fallback.
    #[error("{operation} did not converge within {iterations} iterations")]
    NonConvergence {
        /// Solver or model that failed
        operation: String,
        /// Iteration ceiling that was reached
        iterations: usize,
        /// Failure message of each attempted strategy, in order
        attempts: Vec<String>,
    },

    /// Arrays that must share a shape do not.
    #[error("Array alignment failed: expected length {expected}, got {actual}")]
    ArrayAlignment {
        /// Length of the reference array
        expected: usize,
        /// Length of the mismatched array
        actual: usize,
    },

    /// The dataset violates a structural invariant.
    #[error("Invalid dataset: {reason}")]
    InvalidDataset {
        /// Violated invariant
        reason: String,
    },

    /// Numerical computation error due to degeneracy or instability.
    #[error("Numerical computation failed: {reason}")]
    NumericalError {
        /// Detailed reason for numerical failure
        reason: String,
        /// Operation that failed
        operation: Option<String>,
    },

    /// Registry lookup for an unknown model identifier.
    #[error("Unknown model identifier: {name}")]
    UnknownModel {
        /// Identifier that was requested
        name: String,
    },

    /// I/O operation error.
    #[error("I/O operation failed: {operation}")]
    Io {
        /// I/O operation that failed
        operation: String,
        /// Underlying error if available
        #[source]
        source: Option<Arc<std::io::Error>>,
    },

    /// Serialization/deserialization error.
    #[error("Serialization failed ({format}): {reason}")]
    Serialization {
        /// Format that failed (JSON, CSV)
        format: String,
        /// Parser or writer message
        reason: String,
    },

    /// Zip archive could not be read or written.
    #[error("Archive operation failed: {reason}")]
    Archive {
        /// Underlying archive error message
        reason: String,
    },
}

/// Result type for reliability analysis operations.
pub type ReliabilityResult<T> = Result<T, ReliabilityError>;

impl ReliabilityError {
    /// Wraps an I/O error with the operation that produced it.
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        ReliabilityError::Io {
            operation: operation.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// True for errors that mean "this model cannot be fit here" as opposed to
    /// a broken caller configuration.
    pub fn is_fit_failure(&self) -> bool {
        matches!(
            self,
            ReliabilityError::ModelIncompatible { .. }
                | ReliabilityError::NoSolution { .. }
                | ReliabilityError::NonConvergence { .. }
                | ReliabilityError::InsufficientData { .. }
                | ReliabilityError::NumericalError { .. }
        )
    }
}

impl From<serde_json::Error> for ReliabilityError {
    fn from(err: serde_json::Error) -> Self {
        ReliabilityError::Serialization {
            format: "JSON".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for ReliabilityError {
    fn from(err: zip::result::ZipError) -> Self {
        ReliabilityError::Archive {
            reason: err.to_string(),
        }
    }
}

/// Validates that data has sufficient length for an algorithm.
///
/// # Example
/// ```rust
/// use reliability_growth::errors::validate_data_length;
///
/// let data = vec![1.0, 2.0, 3.0];
/// assert!(validate_data_length(&data, 2).is_ok());
/// assert!(validate_data_length(&data, 5).is_err());
/// ```
pub fn validate_data_length(data: &[f64], min_required: usize) -> ReliabilityResult<()> {
    if data.len() < min_required {
        Err(ReliabilityError::InsufficientData {
            required: min_required,
            actual: data.len(),
        })
    } else {
        Ok(())
    }
}

/// Validates that two arrays have the same length.
pub fn validate_alignment(expected: &[f64], actual: &[f64]) -> ReliabilityResult<()> {
    if expected.len() != actual.len() {
        return Err(ReliabilityError::ArrayAlignment {
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    Ok(())
}

/// Validates that all values in a slice are finite.
///
/// Returns on the first offending value so the error points at its index.
///
/// # Example
/// ```rust
/// use reliability_growth::errors::validate_all_finite;
///
/// assert!(validate_all_finite(&[1.0, 2.0], "values").is_ok());
/// assert!(validate_all_finite(&[1.0, f64::NAN], "values").is_err());
/// ```
pub fn validate_all_finite(data: &[f64], name: &str) -> ReliabilityResult<()> {
    if let Some((i, &value)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        let value_desc = if value.is_nan() {
            "NaN".to_string()
        } else if value.is_sign_positive() {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        };

        return Err(ReliabilityError::InvalidDataset {
            reason: format!(
                "{} contains non-finite value at index {}: {}",
                name, i, value_desc
            ),
        });
    }

    Ok(())
}

/// Validates a significance level lying strictly inside (0, 1).
pub fn validate_probability(value: f64, name: &str) -> ReliabilityResult<()> {
    if !(value > 0.0 && value < 1.0) {
        return Err(ReliabilityError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "0 < value < 1".to_string(),
        });
    }
    Ok(())
}
