//! Integration tests for error handling and degenerate inputs
//!
//! These tests validate that estimator failures surface as typed errors, that
//! the orchestration layer drops failing models instead of aborting, and that
//! invalid run configurations are rejected up front.

use reliability_growth::{
    compute_metrics, walk_forward_validate, AnalysisConfig, AnalysisService, Diagnostics,
    FailureDataset, FailureSeriesType, GoelOkumotoModel, GreyModel, JelinskiMorandaModel,
    ModelRegistry, ModelResult, ReliabilityError, ReliabilityModel, ReliabilityResult,
    SeriesRequirement, WalkForwardConfig,
};

/// Always fails during estimation.
#[derive(Debug, Clone)]
struct Exploding;

impl ReliabilityModel for Exploding {
    fn name(&self) -> &str {
        "Exploding"
    }

    fn requirement(&self) -> SeriesRequirement {
        SeriesRequirement::Any
    }

    fn fit_compatible(
        &self,
        _dataset: &FailureDataset,
        _evaluation_times: Option<&[f64]>,
    ) -> ReliabilityResult<ModelResult> {
        Err(ReliabilityError::NonConvergence {
            operation: "exploding".to_string(),
            iterations: 0,
            attempts: vec![],
        })
    }

    fn fresh(&self) -> Box<dyn ReliabilityModel> {
        Box::new(Exploding)
    }
}

fn cumulative(n: usize) -> FailureDataset {
    let values = (1..=n)
        .map(|i| 30.0 * (1.0 - (-0.15 * i as f64).exp()))
        .collect();
    FailureDataset::from_values(values, FailureSeriesType::CumulativeFailures).unwrap()
}

/// Test scenario: a model that throws is absent from the ranking
#[test]
fn test_failing_model_is_absent_not_null() {
    let service = AnalysisService::new()
        .with_model(Exploding)
        .with_model(GreyModel::default())
        .with_model(GoelOkumotoModel::default());
    let ranked = service.run(&cumulative(12), &AnalysisConfig::in_sample()).unwrap();

    assert_eq!(ranked.len(), 2);
    assert!(ranked.iter().all(|r| r.model_name() != "Exploding"));
    assert!(ranked.iter().all(|r| !r.result.metrics.is_empty()));
}

/// Test scenario: a run where nothing fits returns an empty list
#[test]
fn test_zero_results_is_not_an_error() {
    let service = AnalysisService::new().with_model(Exploding);
    let ranked = service.run(&cumulative(8), &AnalysisConfig::in_sample()).unwrap();
    assert!(ranked.is_empty());
}

/// Test scenario: JM refuses a sequence without a finite MLE
#[test]
fn test_jm_no_solution() {
    let ds = FailureDataset::from_values(
        vec![6.0, 5.0, 4.0, 3.0, 2.0],
        FailureSeriesType::TimeBetweenFailures,
    )
    .unwrap();
    match JelinskiMorandaModel::new().fit(&ds, None) {
        Err(ReliabilityError::NoSolution { model, .. }) => assert_eq!(model, "Jelinski-Moranda"),
        other => panic!("expected NoSolution, got {:?}", other),
    }

    // ...and the service silently drops it
    let ranked = AnalysisService::new()
        .with_model(JelinskiMorandaModel::new())
        .run(&ds, &AnalysisConfig::in_sample())
        .unwrap();
    assert!(ranked.is_empty());
}

/// Test scenario: calling a model on the wrong series type
#[test]
fn test_incompatible_series() {
    let ds = cumulative(6);
    let err = JelinskiMorandaModel::new().fit(&ds, None).unwrap_err();
    assert!(matches!(err, ReliabilityError::ModelIncompatible { .. }));
    assert!(err.is_fit_failure());
}

/// Test scenario: GM(1,1) degrades to an echo below three points
#[test]
fn test_grey_model_short_series() {
    let ds = FailureDataset::from_values(vec![4.0, 9.0], FailureSeriesType::CumulativeFailures)
        .unwrap();
    let result = GreyModel::default().fit(&ds, None).unwrap();
    assert_eq!(result.predictions, vec![4.0, 9.0]);
    assert!(result.parameter("a").unwrap().is_nan());
    assert!(result.parameter("b").unwrap().is_nan());
}

/// Test scenario: metric arrays of different shapes
#[test]
fn test_metric_alignment_error() {
    match compute_metrics(&[1.0, 2.0, 3.0], &[1.0, 2.0], 2) {
        Err(ReliabilityError::ArrayAlignment { expected, actual }) => {
            assert_eq!(expected, 3);
            assert_eq!(actual, 2);
        }
        other => panic!("expected ArrayAlignment, got {:?}", other),
    }
}

/// Test scenario: walk-forward on a series too short for one split
#[test]
fn test_walk_forward_insufficient_data() {
    for (n, horizon) in [(2, 1), (3, 2), (1, 1)] {
        let err = walk_forward_validate(
            &GreyModel::default(),
            &cumulative(n),
            &WalkForwardConfig::expanding(None, horizon),
        )
        .unwrap_err();
        assert!(
            matches!(err, ReliabilityError::InsufficientData { .. }),
            "n={} h={}: {:?}",
            n,
            horizon,
            err
        );
    }
}

/// Test scenario: validation that cannot run drops the model from the ranking
#[test]
fn test_service_drops_model_when_validation_cannot_run() {
    let ranked = AnalysisService::new()
        .with_model(GreyModel::default())
        .run(&cumulative(2), &AnalysisConfig::cross_validated())
        .unwrap();
    assert!(ranked.is_empty());
}

/// Test scenario: invalid run configuration aborts before any model runs
#[test]
fn test_invalid_configuration() {
    let service = AnalysisService::new().with_model(GreyModel::default());
    let ds = cumulative(10);

    let bad_alpha = AnalysisConfig::in_sample().with_prediction_interval(0.0);
    assert!(matches!(
        service.run(&ds, &bad_alpha),
        Err(ReliabilityError::InvalidParameter { .. })
    ));

    let bad_horizon = AnalysisConfig::in_sample().with_validation(WalkForwardConfig::expanding(None, 0));
    assert!(matches!(
        service.run(&ds, &bad_horizon),
        Err(ReliabilityError::InvalidParameter { .. })
    ));
}

/// Test scenario: malformed datasets are rejected at construction
#[test]
fn test_invalid_datasets() {
    assert!(matches!(
        FailureDataset::from_values(vec![], FailureSeriesType::CumulativeFailures),
        Err(ReliabilityError::InvalidDataset { .. })
    ));
    assert!(matches!(
        FailureDataset::new(vec![1.0, 2.0], vec![1.0], FailureSeriesType::CumulativeFailures),
        Err(ReliabilityError::InvalidDataset { .. })
    ));
    assert!(matches!(
        FailureDataset::from_values(vec![1.0, f64::NAN], FailureSeriesType::CumulativeFailures),
        Err(ReliabilityError::InvalidDataset { .. })
    ));
    assert!(cumulative(5).slice(0).is_err());
}

/// Test scenario: registry lookups of unknown identifiers
#[test]
fn test_unknown_model_identifier() {
    let err = ModelRegistry::with_builtins().create("musa-okumoto").unwrap_err();
    assert!(matches!(err, ReliabilityError::UnknownModel { .. }));
    assert!(!err.is_fit_failure());
}

/// Test scenario: a custom model registered at runtime takes part in a run
#[test]
fn test_custom_registration_runs() {
    let mut registry = ModelRegistry::with_builtins();
    registry.register("exploding", || Box::new(Exploding));
    let service = AnalysisService::with_models(vec![
        registry.create("exploding").unwrap(),
        registry.create("gm").unwrap(),
    ]);
    let ranked = service.run(&cumulative(9), &AnalysisConfig::in_sample()).unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].model_name(), "GM(1,1)");
    assert_eq!(ranked[0].result.diagnostics, Diagnostics::new());
}
