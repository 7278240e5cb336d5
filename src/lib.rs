//! # Software Reliability Growth Modelling
//!
//! Fits software reliability-growth models to failure data, scores them in and
//! out of sample, and ranks them.
//!
//! A failure series is either a list of times between successive failures or a
//! running count of failures observed so far ([`FailureSeriesType`]). Each model
//! declares which of the two it accepts, fits itself to a [`FailureDataset`], and
//! reports its parameters, predictions on an evaluation grid and a standard set
//! of goodness-of-fit metrics in a [`ModelResult`].
//!
//! ## Key Features
//!
//! - **Classical models**: Jelinski-Moranda (maximum likelihood), Goel-Okumoto and
//!   Yamada delayed S-shaped NHPP curves (bounded Levenberg-Marquardt)
//! - **Data-driven models**: GM(1,1) grey forecasting, kernel SVR, a BP neural
//!   network, and an EMD-style SVR/GM hybrid
//! - **Validation**: expanding-window walk-forward scoring under `cv_*` metrics
//! - **Ranking**: [`AnalysisService`] fits a model set and orders the survivors
//! - **Bundles**: zip export/import of dataset, run configuration and results
//!
//! ## Quick Start
//!
//! ```rust
//! use reliability_growth::{
//!     AnalysisConfig, AnalysisService, FailureDataset, FailureSeriesType, ModelRegistry,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let t: Vec<f64> = (1..=15).map(|i| 4.0 * i as f64).collect();
//!     let y: Vec<f64> = t.iter().map(|&t| 60.0 * (1.0 - (-0.03 * t).exp())).collect();
//!     let dataset = FailureDataset::new(t, y, FailureSeriesType::CumulativeFailures)?;
//!
//!     let registry = ModelRegistry::with_builtins();
//!     let service = AnalysisService::with_models(vec![registry.create("go")?, registry.create("gm")?]);
//!     let config = AnalysisConfig::cross_validated().with_prediction_interval(0.05);
//!
//!     for ranked in service.run(&dataset, &config)? {
//!         println!("{} {}: rmse = {:?}", ranked.rank, ranked.model_name(), ranked.result.metric("rmse"));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Models implement [`ReliabilityModel`] and carry configuration only; everything
//! they estimate is returned in the result, so a model can be reused across
//! datasets and walk-forward splits. The crate logs through the `log` facade and
//! never installs a logger.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod dataset;
pub mod errors;
pub mod linear_algebra;
pub mod math_utils;
pub mod metrics;
pub mod preprocessing;
pub mod results;
pub mod serde_nan;

// Models
pub mod bp_neural;
pub mod goel_okumoto;
pub mod grey_model;
pub mod hybrid;
pub mod jelinski_moranda;
pub mod least_squares;
pub mod reliability_model;
pub mod s_shaped;
pub mod smoothing;
pub mod svr;

// Orchestration
pub mod analysis;
pub mod cross_validation;
pub mod experiments;
pub mod prediction_intervals;
pub mod registry;

// Re-exports for convenience - main public API
pub use analysis::{rank_results, AnalysisService};
pub use config::AnalysisConfig;
pub use cross_validation::{walk_forward_validate, WalkForwardConfig, WalkForwardOutcome};
pub use dataset::{FailureDataset, FailureSeriesType, Metadata};
pub use errors::{ReliabilityError, ReliabilityResult};
pub use experiments::{
    default_experiment_config, experiment_config_for_run, export_experiment_bytes,
    export_experiment_zip, load_experiment_bytes, load_experiment_zip, ExperimentConfig,
    LoadedExperiment,
};
pub use metrics::{compute_metrics, FitMetrics};
pub use prediction_intervals::normal_prediction_interval;
pub use registry::{ModelFactory, ModelRegistry};
pub use reliability_model::{ReliabilityModel, SeriesRequirement};
pub use results::{
    ComponentSummary, Diagnostic, Diagnostics, ModelResult, ParameterValue, RankedModelResult,
};

// Model variants
pub use bp_neural::{BpConfig, BpNeuralNetworkModel};
pub use goel_okumoto::GoelOkumotoModel;
pub use grey_model::{GreyModel, GreyModelConfig};
pub use hybrid::{HybridConfig, HybridModel};
pub use jelinski_moranda::JelinskiMorandaModel;
pub use least_squares::{InitialGuessStrategy, NhppFitConfig};
pub use s_shaped::SShapedModel;
pub use svr::{SupportVectorRegressionModel, SvrConfig, SvrKernel};
