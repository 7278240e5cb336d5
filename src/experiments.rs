//! Experiment bundles.
//!
//! A bundle is a deflated zip archive with three entries:
//!
//! - `dataset.csv`: the series as a `time,value` table
//! - `config.json`: an [`ExperimentConfig`] snapshot of the run
//! - `results.json`: the ranked results, highest rank first
//!
//! Loading a bundle gives back a dataset and ranked results usable exactly like
//! the output of a live [`AnalysisService::run`](crate::analysis::AnalysisService::run);
//! no model is refit.

use crate::config::AnalysisConfig;
use crate::cross_validation::WalkForwardConfig;
use crate::dataset::{FailureDataset, FailureSeriesType, Metadata};
use crate::errors::{ReliabilityError, ReliabilityResult};
use crate::results::RankedModelResult;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const DATASET_ENTRY: &str = "dataset.csv";
const CONFIG_ENTRY: &str = "config.json";
const RESULTS_ENTRY: &str = "results.json";
const CSV_HEADER: &str = "time,value";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Snapshot of the settings that produced a set of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Local time the snapshot was taken, `%Y-%m-%d %H:%M:%S`
    #[serde(default)]
    pub created_at: String,
    /// Series type name; empty means "infer from the data"
    #[serde(default)]
    pub series_type: String,
    /// Dataset annotations
    #[serde(default)]
    pub dataset_metadata: Metadata,
    /// Metric the results were ranked by
    #[serde(default)]
    pub ranking_metric: Option<String>,
    /// Walk-forward settings of the run
    #[serde(default)]
    pub walk_forward: WalkForwardConfig,
    /// Prediction band significance level, if one was computed
    #[serde(default)]
    pub prediction_interval_alpha: Option<f64>,
}

/// Contents of a loaded bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedExperiment {
    /// Reconstructed series
    pub dataset: FailureDataset,
    /// Results sorted by rank
    pub ranked_results: Vec<RankedModelResult>,
    /// Run snapshot with `series_type` filled in
    pub config: ExperimentConfig,
}

/// Snapshot stamped with the current local time.
pub fn default_experiment_config(
    dataset: &FailureDataset,
    ranking_metric: Option<&str>,
    walk_forward: Option<&WalkForwardConfig>,
    prediction_interval_alpha: Option<f64>,
) -> ExperimentConfig {
    ExperimentConfig {
        created_at: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
        series_type: dataset.series_type().as_str().to_string(),
        dataset_metadata: dataset.metadata().clone(),
        ranking_metric: ranking_metric.map(str::to_string),
        walk_forward: walk_forward.cloned().unwrap_or_default(),
        prediction_interval_alpha,
    }
}

/// Snapshot of an [`AnalysisConfig`] run over `dataset`.
pub fn experiment_config_for_run(dataset: &FailureDataset, config: &AnalysisConfig) -> ExperimentConfig {
    let metric = config.ranking_metric();
    default_experiment_config(
        dataset,
        Some(&metric),
        Some(&config.validation),
        config.prediction_interval_alpha,
    )
}

// ============================================================================
// EXPORT
// ============================================================================

/// Serialize a bundle into memory.
pub fn export_experiment_bytes(
    dataset: &FailureDataset,
    ranked: &[RankedModelResult],
    config: &ExperimentConfig,
) -> ReliabilityResult<Vec<u8>> {
    let entries = [
        (DATASET_ENTRY, dataset_to_csv(dataset).into_bytes()),
        (CONFIG_ENTRY, serde_json::to_vec_pretty(config)?),
        (RESULTS_ENTRY, serde_json::to_vec_pretty(ranked)?),
    ];

    let mut buf = Vec::new();
    {
        let mut writer = ZipWriter::new(Cursor::new(&mut buf));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, content) in &entries {
            writer.start_file(*name, options)?;
            writer
                .write_all(content)
                .map_err(|e| ReliabilityError::io(format!("write {} to bundle", name), e))?;
        }
        writer.finish()?;
    }
    Ok(buf)
}

/// Write a bundle to `path`, creating parent directories.
///
/// # Returns
/// The path written.
pub fn export_experiment_zip(
    dataset: &FailureDataset,
    ranked: &[RankedModelResult],
    path: impl AsRef<Path>,
    config: &ExperimentConfig,
) -> ReliabilityResult<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| ReliabilityError::io(format!("create {}", parent.display()), e))?;
    }
    let bytes = export_experiment_bytes(dataset, ranked, config)?;
    std::fs::write(path, bytes)
        .map_err(|e| ReliabilityError::io(format!("write {}", path.display()), e))?;
    log::debug!("exported {} results to {}", ranked.len(), path.display());
    Ok(path.to_path_buf())
}

fn dataset_to_csv(dataset: &FailureDataset) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for (t, v) in dataset.time_axis().iter().zip(dataset.values()) {
        out.push_str(&format!("{},{}\n", t, v));
    }
    out
}

// ============================================================================
// IMPORT
// ============================================================================

/// Read a bundle from memory.
pub fn load_experiment_bytes(bytes: &[u8]) -> ReliabilityResult<LoadedExperiment> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let dataset_csv = read_entry(&mut archive, DATASET_ENTRY)?;
    let config_json = read_entry(&mut archive, CONFIG_ENTRY)?;
    let results_json = read_entry(&mut archive, RESULTS_ENTRY)?;

    let mut config: ExperimentConfig = serde_json::from_str(&config_json)?;
    let (time_axis, values) = dataset_from_csv(&dataset_csv)?;
    let series_type = if config.series_type.trim().is_empty() {
        infer_series_type(&values)
    } else {
        config
            .series_type
            .parse()
            .unwrap_or(FailureSeriesType::TimeBetweenFailures)
    };
    config.series_type = series_type.as_str().to_string();
    let dataset = FailureDataset::with_all(
        time_axis,
        values,
        series_type,
        config.dataset_metadata.clone(),
    )?;

    let mut ranked_results: Vec<RankedModelResult> = serde_json::from_str(&results_json)?;
    ranked_results.sort_by_key(|r| r.rank);

    Ok(LoadedExperiment {
        dataset,
        ranked_results,
        config,
    })
}

/// Read a bundle from `path`.
pub fn load_experiment_zip(path: impl AsRef<Path>) -> ReliabilityResult<LoadedExperiment> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| ReliabilityError::io(format!("read {}", path.display()), e))?;
    load_experiment_bytes(&bytes)
}

fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> ReliabilityResult<String> {
    let mut file = archive.by_name(name)?;
    let mut buf = String::new();
    file.read_to_string(&mut buf)
        .map_err(|e| ReliabilityError::io(format!("read {} from bundle", name), e))?;
    Ok(buf)
}

fn csv_error(reason: String) -> ReliabilityError {
    ReliabilityError::Serialization {
        format: "CSV".to_string(),
        reason,
    }
}

fn dataset_from_csv(payload: &str) -> ReliabilityResult<(Vec<f64>, Vec<f64>)> {
    let mut lines = payload.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| csv_error("empty dataset table".to_string()))?;
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let column = |name: &str| {
        columns
            .iter()
            .position(|c| *c == name)
            .ok_or_else(|| csv_error(format!("missing '{}' column", name)))
    };
    let (time_col, value_col) = (column("time")?, column("value")?);

    let mut time_axis = Vec::new();
    let mut values = Vec::new();
    for (row, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let parse = |col: usize| -> ReliabilityResult<f64> {
            let raw = fields
                .get(col)
                .ok_or_else(|| csv_error(format!("row {} is missing column {}", row + 1, col)))?;
            raw.parse::<f64>()
                .map_err(|e| csv_error(format!("row {}: '{}': {}", row + 1, raw, e)))
        };
        time_axis.push(parse(time_col)?);
        values.push(parse(value_col)?);
    }
    Ok((time_axis, values))
}

/// Non-decreasing values read as cumulative counts; anything else as intervals.
fn infer_series_type(values: &[f64]) -> FailureSeriesType {
    if values.len() > 1 && values.windows(2).all(|w| w[1] >= w[0]) {
        FailureSeriesType::CumulativeFailures
    } else {
        FailureSeriesType::TimeBetweenFailures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{Diagnostics, ModelResult};
    use std::collections::BTreeMap;

    fn ranked(name: &str, rank: usize, rmse: f64) -> RankedModelResult {
        let mut metrics = BTreeMap::new();
        metrics.insert("rmse".to_string(), rmse);
        metrics.insert("aic".to_string(), f64::NAN);
        RankedModelResult {
            rank,
            result: ModelResult {
                model_name: name.to_string(),
                parameters: BTreeMap::new(),
                times: vec![1.0, 2.0],
                predictions: vec![0.5, 1.25],
                metrics,
                diagnostics: Diagnostics::new(),
            },
        }
    }

    #[test]
    fn test_bytes_round_trip() {
        let ds = FailureDataset::new(
            vec![0.5, 1.5, 2.25],
            vec![1.0, 3.0, 4.0],
            FailureSeriesType::CumulativeFailures,
        )
        .unwrap();
        let results = vec![ranked("second", 2, 0.4), ranked("first", 1, 0.1)];
        let config = default_experiment_config(&ds, Some("rmse"), None, Some(0.1));
        let bytes = export_experiment_bytes(&ds, &results, &config).unwrap();

        let loaded = load_experiment_bytes(&bytes).unwrap();
        assert_eq!(loaded.dataset.time_axis(), ds.time_axis());
        assert_eq!(loaded.dataset.values(), ds.values());
        assert_eq!(loaded.dataset.series_type(), FailureSeriesType::CumulativeFailures);
        assert_eq!(loaded.config, config);
        assert_eq!(loaded.ranked_results[0].model_name(), "first");
        assert!(loaded.ranked_results[0].result.metrics["aic"].is_nan());
    }

    #[test]
    fn test_csv_parsing() {
        let (t, v) = dataset_from_csv("value,time\n3,1\n4.5,2\n\n").unwrap();
        assert_eq!(t, vec![1.0, 2.0]);
        assert_eq!(v, vec![3.0, 4.5]);
        assert!(dataset_from_csv("t,v\n1,2\n").is_err());
        assert!(dataset_from_csv("time,value\n1,abc\n").is_err());
    }

    #[test]
    fn test_series_type_inference() {
        assert_eq!(
            infer_series_type(&[1.0, 1.0, 2.0]),
            FailureSeriesType::CumulativeFailures
        );
        assert_eq!(
            infer_series_type(&[3.0, 1.0, 2.0]),
            FailureSeriesType::TimeBetweenFailures
        );
        assert_eq!(infer_series_type(&[1.0]), FailureSeriesType::TimeBetweenFailures);
    }

    #[test]
    fn test_missing_entry_is_archive_error() {
        let mut buf = Vec::new();
        {
            let mut writer = ZipWriter::new(Cursor::new(&mut buf));
            writer
                .start_file(DATASET_ENTRY, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"time,value\n1,1\n").unwrap();
            writer.finish().unwrap();
        }
        assert!(matches!(
            load_experiment_bytes(&buf),
            Err(ReliabilityError::Archive { .. })
        ));
    }
}
