//! Parameter recovery and numerical properties of the individual models.

use assert_approx_eq::assert_approx_eq;
use reliability_growth::{
    compute_metrics, BpNeuralNetworkModel, FailureDataset, FailureSeriesType, GoelOkumotoModel,
    GreyModel, HybridModel, JelinskiMorandaModel, NhppFitConfig, ReliabilityModel, SShapedModel,
    SupportVectorRegressionModel,
};

fn go_dataset() -> FailureDataset {
    let t: Vec<f64> = (1..=10).map(|i| 10.0 * i as f64).collect();
    let y = t.iter().map(|&t| 50.0 * (1.0 - (-0.05 * t).exp())).collect();
    FailureDataset::new(t, y, FailureSeriesType::CumulativeFailures).unwrap()
}

#[test]
fn test_goel_okumoto_recovers_parameters() {
    let result = GoelOkumotoModel::default().fit(&go_dataset(), None).unwrap();
    assert_approx_eq!(result.parameter("a").unwrap(), 50.0, 5.0);
    assert_approx_eq!(result.parameter("b").unwrap(), 0.05, 0.02);
    assert!(result.metrics["rmse"] < 1e-2);
}

#[test]
fn test_goel_okumoto_single_guess_config() {
    let model = GoelOkumotoModel::new(NhppFitConfig::single_guess());
    let result = model.fit(&go_dataset(), None).unwrap();
    assert_approx_eq!(result.parameter("a").unwrap(), 50.0, 5.0);
}

#[test]
fn test_jelinski_moranda_improving_sequence() {
    let ds = FailureDataset::from_values(
        vec![2.0, 3.0, 4.0, 5.0, 6.0],
        FailureSeriesType::TimeBetweenFailures,
    )
    .unwrap();
    let result = JelinskiMorandaModel::new().fit(&ds, None).unwrap();

    let n0 = result.parameter("N0").unwrap();
    let phi = result.parameter("phi").unwrap();
    assert!(n0 > 5.0);
    assert!(phi > 0.0 && phi < 1.0);
    assert_approx_eq!(n0, 6.3417, 1e-3);
    assert!(result.predictions.iter().all(|&p| p > 0.0));
    assert_eq!(result.predictions.len(), 5);
    // Expected intervals grow as faults are removed
    assert!(result.predictions.windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn test_jelinski_moranda_just_above_growth_threshold() {
    // p = 3.50044 against a threshold of 3.5
    let mut intervals = vec![10.0; 7];
    intervals.push(10.01);
    let ds = FailureDataset::from_values(intervals, FailureSeriesType::TimeBetweenFailures).unwrap();
    let result = JelinskiMorandaModel::new().fit(&ds, None).unwrap();

    let n0 = result.parameter("N0").unwrap();
    assert_approx_eq!(n0, 12005.0, 0.5);
    assert_approx_eq!(result.parameter("phi").unwrap(), 8.3313e-6, 1e-8);
    // Almost no growth: the fitted intervals are nearly flat around the mean
    for p in &result.predictions {
        assert_approx_eq!(*p, 10.0, 0.01);
    }
}

#[test]
fn test_s_shaped_fits_delayed_curve() {
    let t: Vec<f64> = (1..=20).map(|i| i as f64).collect();
    let y: Vec<f64> = t
        .iter()
        .map(|&t| 30.0 * (1.0 - (1.0 + 0.2 * t) * (-0.2 * t).exp()))
        .collect();
    let ds = FailureDataset::new(t, y, FailureSeriesType::CumulativeFailures).unwrap();
    let result = SShapedModel::default().fit(&ds, None).unwrap();
    assert!(result.parameter("a").unwrap() >= 0.0);
    assert!(result.parameter("b").unwrap() >= 0.0);
    assert_eq!(result.predictions.len(), 20);
}

#[test]
fn test_grey_model_tracks_saturating_curve() {
    let values: Vec<f64> = (1..=12)
        .map(|i| 25.0 * (1.0 - (-0.25 * i as f64).exp()))
        .collect();
    let ds = FailureDataset::from_values(values, FailureSeriesType::CumulativeFailures).unwrap();
    let result = GreyModel::default().fit(&ds, None).unwrap();
    assert!(result.parameter("a").unwrap() > 0.0);
    assert!(result.metrics["r2"] > 0.9);
}

#[test]
fn test_data_driven_models_predict_on_grid() {
    let values: Vec<f64> = (1..=18)
        .map(|i| 25.0 * (1.0 - (-0.15 * i as f64).exp()))
        .collect();
    let ds = FailureDataset::from_values(values, FailureSeriesType::CumulativeFailures).unwrap();
    let grid: Vec<f64> = (1..=22).map(|i| i as f64).collect();

    let models: Vec<Box<dyn ReliabilityModel>> = vec![
        Box::new(SupportVectorRegressionModel::default()),
        Box::new(BpNeuralNetworkModel::default()),
        Box::new(HybridModel::default()),
    ];
    for model in &models {
        let result = model.fit(&ds, Some(&grid)).unwrap();
        assert_eq!(result.times, grid, "{}", model.name());
        assert_eq!(result.predictions.len(), 22, "{}", model.name());
        assert!(
            result.predictions.iter().all(|p| p.is_finite()),
            "{}",
            model.name()
        );
    }
}

#[test]
fn test_metrics_on_identical_arrays() {
    let v = [1.0, 3.0, 6.0, 10.0, 15.0];
    let m = compute_metrics(&v, &v, 2).unwrap();
    assert_eq!(m.rmse, 0.0);
    assert_eq!(m.mae, 0.0);
    assert_eq!(m.mse, 0.0);
    assert_eq!(m.r2, 1.0);
}

#[test]
fn test_cumulative_interval_round_trip() {
    let ds = FailureDataset::from_values(
        vec![3.0, 1.5, 4.0, 0.5, 9.0, 2.5],
        FailureSeriesType::TimeBetweenFailures,
    )
    .unwrap();
    let cumulative = ds.cumulative_failures();
    assert!(cumulative.windows(2).all(|w| w[1] >= w[0]));

    let intervals = ds.failure_intervals();
    let total: f64 = intervals.iter().sum();
    assert_approx_eq!(total, *cumulative.last().unwrap(), 1e-12);

    let mut running = 0.0;
    for (interval, c) in intervals.iter().zip(&cumulative) {
        running += interval;
        assert_approx_eq!(running, *c, 1e-12);
    }

    let counts = FailureDataset::from_values(cumulative.clone(), FailureSeriesType::CumulativeFailures)
        .unwrap();
    for (a, b) in counts.failure_intervals().iter().zip(&intervals) {
        assert_approx_eq!(a, b, 1e-12);
    }
}
