//! Failure dataset abstraction.
//!
//! [`FailureDataset`] is an immutable value wrapping a failure time series and
//! the interpretation of its values ([`FailureSeriesType`]). Every derived view
//! is a pure function; `slice` and `with_metadata` build new instances.

use crate::errors::{validate_all_finite, ReliabilityError, ReliabilityResult};
use crate::math_utils::{cumulative_sum, zero_prefixed_diff};
use crate::preprocessing::{normalize, zscore_outlier_mask, NormalizationMethod};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Free-form dataset annotations (source path, column names, ...).
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// How the values of a failure series are to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureSeriesType {
    /// Each value is the time elapsed since the previous failure
    TimeBetweenFailures,
    /// Each value is the number of failures observed so far
    CumulativeFailures,
}

impl FailureSeriesType {
    /// Canonical string form, as stored in experiment bundles.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureSeriesType::TimeBetweenFailures => "time_between_failures",
            FailureSeriesType::CumulativeFailures => "cumulative_failures",
        }
    }
}

impl fmt::Display for FailureSeriesType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureSeriesType {
    type Err = std::convert::Infallible;

    /// Lenient coercion: unknown names fall back to time-between-failures.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_lowercase();
        Ok(match normalized.as_str() {
            "cumulative_failures" | "cumulative" | "cum" | "failures" => {
                FailureSeriesType::CumulativeFailures
            }
            // "time_between_failures", "tbf", "time-between-failures", "interval", ...
            _ => FailureSeriesType::TimeBetweenFailures,
        })
    }
}

/// Immutable failure time series.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureDataset {
    time_axis: Vec<f64>,
    values: Vec<f64>,
    series_type: FailureSeriesType,
    metadata: Metadata,
}

impl FailureDataset {
    /// Build a dataset, enforcing equal non-zero lengths and finite values.
    pub fn new(
        time_axis: Vec<f64>,
        values: Vec<f64>,
        series_type: FailureSeriesType,
    ) -> ReliabilityResult<Self> {
        Self::with_all(time_axis, values, series_type, Metadata::new())
    }

    /// Build a dataset whose time axis is `1, 2, ..., n`.
    pub fn from_values(values: Vec<f64>, series_type: FailureSeriesType) -> ReliabilityResult<Self> {
        let time_axis = (1..=values.len()).map(|i| i as f64).collect();
        Self::new(time_axis, values, series_type)
    }

    /// Build a dataset with metadata.
    pub fn with_all(
        time_axis: Vec<f64>,
        values: Vec<f64>,
        series_type: FailureSeriesType,
        metadata: Metadata,
    ) -> ReliabilityResult<Self> {
        if time_axis.len() != values.len() {
            return Err(ReliabilityError::InvalidDataset {
                reason: format!(
                    "time and value arrays must share the same shape ({} vs {})",
                    time_axis.len(),
                    values.len()
                ),
            });
        }
        if values.is_empty() {
            return Err(ReliabilityError::InvalidDataset {
                reason: "failure dataset must not be empty".to_string(),
            });
        }
        validate_all_finite(&time_axis, "time_axis")?;
        validate_all_finite(&values, "values")?;
        Ok(Self {
            time_axis,
            values,
            series_type,
            metadata,
        })
    }

    /// Observation times.
    pub fn time_axis(&self) -> &[f64] {
        &self.time_axis
    }

    /// Raw values, interpreted according to [`Self::series_type`].
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Interpretation of the values.
    pub fn series_type(&self) -> FailureSeriesType {
        self.series_type
    }

    /// Informational annotations.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; kept for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cumulative failure curve regardless of representation.
    pub fn cumulative_failures(&self) -> Vec<f64> {
        match self.series_type {
            FailureSeriesType::CumulativeFailures => self.values.clone(),
            FailureSeriesType::TimeBetweenFailures => cumulative_sum(&self.values),
        }
    }

    /// Failure intervals regardless of representation.
    pub fn failure_intervals(&self) -> Vec<f64> {
        match self.series_type {
            FailureSeriesType::TimeBetweenFailures => self.values.clone(),
            FailureSeriesType::CumulativeFailures => zero_prefixed_diff(&self.values),
        }
    }

    /// The series a model of this dataset's type is scored against: the
    /// cumulative curve for cumulative data, the intervals otherwise.
    pub fn target_series(&self) -> Vec<f64> {
        match self.series_type {
            FailureSeriesType::CumulativeFailures => self.cumulative_failures(),
            FailureSeriesType::TimeBetweenFailures => self.failure_intervals(),
        }
    }

    /// z-score outlier mask over the raw values.
    pub fn detect_outliers(&self, z_threshold: f64) -> Vec<bool> {
        zscore_outlier_mask(&self.values, z_threshold)
    }

    /// New dataset with normalized values; axis, type and metadata are kept.
    pub fn normalized(&self, method: NormalizationMethod) -> Self {
        Self {
            time_axis: self.time_axis.clone(),
            values: normalize(&self.values, method),
            series_type: self.series_type,
            metadata: self.metadata.clone(),
        }
    }

    /// New dataset with `extra` merged over the existing metadata.
    pub fn with_metadata<I, K>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: Into<String>,
    {
        let mut metadata = self.metadata.clone();
        for (k, v) in extra {
            metadata.insert(k.into(), v);
        }
        Self {
            time_axis: self.time_axis.clone(),
            values: self.values.clone(),
            series_type: self.series_type,
            metadata,
        }
    }

    /// Prefix of the first `stop` samples (`values[..stop]`).
    ///
    /// `stop` larger than the dataset keeps everything.
    pub fn slice(&self, stop: usize) -> ReliabilityResult<Self> {
        if stop == 0 {
            return Err(ReliabilityError::InvalidDataset {
                reason: "stop must be >= 1".to_string(),
            });
        }
        let stop = stop.min(self.len());
        Ok(Self {
            time_axis: self.time_axis[..stop].to_vec(),
            values: self.values[..stop].to_vec(),
            series_type: self.series_type,
            metadata: self.metadata.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn tbf() -> FailureDataset {
        FailureDataset::from_values(vec![3.0, 1.0, 4.0, 1.0, 5.0], FailureSeriesType::TimeBetweenFailures)
            .unwrap()
    }

    #[test]
    fn test_detect_outliers_flags_single_spike() {
        let mut values = vec![5.0; 12];
        values[6] = 50.0;
        let ds = FailureDataset::from_values(values, FailureSeriesType::TimeBetweenFailures).unwrap();
        let mask = ds.detect_outliers(3.0);
        assert_eq!(mask.len(), 12);
        let flagged: Vec<usize> = mask.iter().enumerate().filter(|&(_, &m)| m).map(|(i, _)| i).collect();
        assert_eq!(flagged, vec![6]);

        let flat = FailureDataset::from_values(vec![4.0; 8], FailureSeriesType::TimeBetweenFailures).unwrap();
        assert!(flat.detect_outliers(3.0).iter().all(|&m| !m));
        assert!(flat.detect_outliers(0.0).iter().all(|&m| !m));
    }

    #[test]
    fn test_rejects_mismatched_and_empty() {
        assert!(matches!(
            FailureDataset::new(vec![1.0, 2.0], vec![1.0], FailureSeriesType::CumulativeFailures),
            Err(ReliabilityError::InvalidDataset { .. })
        ));
        assert!(FailureDataset::new(vec![], vec![], FailureSeriesType::CumulativeFailures).is_err());
        assert!(FailureDataset::from_values(vec![1.0, f64::NAN], FailureSeriesType::CumulativeFailures).is_err());
    }

    #[test]
    fn test_cumulative_and_intervals_round_trip() {
        let ds = tbf();
        let cum = ds.cumulative_failures();
        assert!(cum.windows(2).all(|w| w[1] >= w[0]));
        let intervals = ds.failure_intervals();
        assert_approx_eq!(intervals.iter().sum::<f64>(), *cum.last().unwrap(), 1e-12);

        let cum_ds = FailureDataset::new(
            ds.time_axis().to_vec(),
            cum.clone(),
            FailureSeriesType::CumulativeFailures,
        )
        .unwrap();
        assert_eq!(cum_ds.cumulative_failures(), cum);
        let back = crate::math_utils::cumulative_sum(&cum_ds.failure_intervals());
        for (a, b) in back.iter().zip(cum.iter()) {
            assert_approx_eq!(a, b, 1e-12);
        }
    }

    #[test]
    fn test_slice_and_metadata_are_new_values() {
        let ds = tbf();
        let prefix = ds.slice(3).unwrap();
        assert_eq!(prefix.len(), 3);
        assert_eq!(prefix.values(), &[3.0, 1.0, 4.0]);
        assert_eq!(ds.len(), 5);
        assert!(ds.slice(0).is_err());
        assert_eq!(ds.slice(99).unwrap().len(), 5);

        let tagged = ds.with_metadata([("source", serde_json::json!("a.csv"))]);
        assert_eq!(tagged.metadata()["source"], serde_json::json!("a.csv"));
        assert!(ds.metadata().is_empty());
    }

    #[test]
    fn test_normalized_keeps_type() {
        let ds = tbf().normalized(NormalizationMethod::MinMax);
        assert_eq!(ds.series_type(), FailureSeriesType::TimeBetweenFailures);
        assert_eq!(ds.values()[4], 1.0);
        assert_eq!(ds.values()[1], 0.0);
    }

    #[test]
    fn test_series_type_parsing() {
        let parse = |s: &str| s.parse::<FailureSeriesType>().unwrap();
        assert_eq!(parse("cum"), FailureSeriesType::CumulativeFailures);
        assert_eq!(parse(" Failures "), FailureSeriesType::CumulativeFailures);
        assert_eq!(parse("cumulative_failures"), FailureSeriesType::CumulativeFailures);
        assert_eq!(parse("tbf"), FailureSeriesType::TimeBetweenFailures);
        assert_eq!(parse("whatever"), FailureSeriesType::TimeBetweenFailures);
        assert_eq!(FailureSeriesType::CumulativeFailures.to_string(), "cumulative_failures");
    }
}
