//! Serde helpers that keep non-finite floats representable in JSON.
//!
//! JSON has no NaN or infinity, so these encode any non-finite value as `null`
//! and decode `null` back to NaN. Use with `#[serde(with = "...")]`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

fn finite_or_none(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Single `f64`.
pub mod scalar {
    use super::*;

    #[allow(missing_docs)]
    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        finite_or_none(*value).serialize(serializer)
    }

    #[allow(missing_docs)]
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

/// `Vec<f64>`.
pub mod vec {
    use super::*;

    #[allow(missing_docs)]
    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded: Vec<Option<f64>> = values.iter().copied().map(finite_or_none).collect();
        encoded.serialize(serializer)
    }

    #[allow(missing_docs)]
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let decoded = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(decoded.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

/// `BTreeMap<String, f64>`.
pub mod map {
    use super::*;

    #[allow(missing_docs)]
    pub fn serialize<S: Serializer>(
        values: &BTreeMap<String, f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let encoded: BTreeMap<&String, Option<f64>> = values
            .iter()
            .map(|(k, &v)| (k, finite_or_none(v)))
            .collect();
        encoded.serialize(serializer)
    }

    #[allow(missing_docs)]
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, f64>, D::Error> {
        let decoded = BTreeMap::<String, Option<f64>>::deserialize(deserializer)?;
        Ok(decoded
            .into_iter()
            .map(|(k, v)| (k, v.unwrap_or(f64::NAN)))
            .collect())
    }
}
