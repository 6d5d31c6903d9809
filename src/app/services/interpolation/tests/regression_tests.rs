//! Tests for the trend regressions

use crate::Error;
use crate::app::services::interpolation::regression::{
    GradientBoosting, KernelSvr, LinearTrend, RandomForest, RegressionKind, RegressionTree,
    TrendModel,
};

fn step_data() -> (Vec<f64>, Vec<f64>) {
    (vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 0.0, 10.0, 10.0])
}

#[test]
fn test_selector_parsing() {
    assert_eq!("linear".parse::<RegressionKind>().unwrap(), RegressionKind::Linear);
    assert_eq!(
        "Random_Forest".parse::<RegressionKind>().unwrap(),
        RegressionKind::RandomForest
    );
    assert_eq!("svr".parse::<RegressionKind>().unwrap(), RegressionKind::KernelSvr);
    assert_eq!(RegressionKind::GradientBoosting.to_string(), "gradient_boosting");

    let err = "neural_net".parse::<RegressionKind>().unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
    assert!(err.to_string().contains("Unknown regression model type: neural_net"));
}

#[test]
fn test_linear_trend_recovers_lapse_rate() {
    let elevation = [200.0, 400.0, 600.0, 800.0];
    let temperature: Vec<f64> = elevation.iter().map(|e| 20.0 - 0.0065 * e).collect();

    let mut model = LinearTrend::default();
    model.fit(&elevation, &temperature).unwrap();

    assert!((model.slope + 0.0065).abs() < 1e-12);
    assert!((model.intercept - 20.0).abs() < 1e-9);
    assert!((model.predict(1000.0) - 13.5).abs() < 1e-9);
}

#[test]
fn test_linear_trend_constant_covariate() {
    let mut model = LinearTrend::default();
    model.fit(&[300.0, 300.0, 300.0], &[10.0, 12.0, 14.0]).unwrap();

    assert_eq!(model.slope, 0.0);
    assert!((model.predict(900.0) - 12.0).abs() < 1e-12);
}

#[test]
fn test_fit_rejects_bad_input() {
    let mut model = LinearTrend::default();
    assert!(matches!(model.fit(&[], &[]), Err(Error::DataValidation { .. })));
    assert!(matches!(
        model.fit(&[1.0, 2.0], &[1.0]),
        Err(Error::DataValidation { .. })
    ));
}

#[test]
fn test_tree_splits_step() {
    let (x, y) = step_data();
    let mut tree = RegressionTree::default();
    tree.fit(&x, &y).unwrap();

    assert_eq!(tree.depth(), 1);
    assert_eq!(tree.predict(0.5), 0.0);
    assert_eq!(tree.predict(2.5), 10.0);
}

#[test]
fn test_forest_is_deterministic() {
    let (x, y) = step_data();

    let mut first = RandomForest::default();
    first.fit(&x, &y).unwrap();
    let mut second = RandomForest::default();
    second.fit(&x, &y).unwrap();

    assert_eq!(first.tree_count(), 100);
    assert_eq!(first.predict_many(&x), second.predict_many(&x));
    assert!(first.predict(3.0) > first.predict(0.0));
}

#[test]
fn test_boosting_converges_on_step() {
    let (x, y) = step_data();
    let mut model = GradientBoosting::default();
    model.fit(&x, &y).unwrap();

    assert_eq!(model.stage_count(), 100);
    assert!((model.predict(0.0) - 0.0).abs() < 1e-3);
    assert!((model.predict(3.0) - 10.0).abs() < 1e-3);
}

#[test]
fn test_svr_gamma_and_flat_target() {
    let x = [0.0, 1.0, 2.0, 3.0, 4.0];

    let mut model = KernelSvr::default();
    model.fit(&x, &[0.05, -0.05, 0.0, 0.02, -0.01]).unwrap();
    assert!((model.gamma() - 0.5).abs() < 1e-12);
    // Every target sits inside the epsilon tube
    assert_eq!(model.predict(2.0), 0.0);
}

#[test]
fn test_svr_follows_trend() {
    let x = [0.0, 1.0, 2.0, 3.0, 4.0];
    let y = [0.0, 0.5, 1.0, 1.5, 2.0];

    let mut model = KernelSvr::default();
    model.fit(&x, &y).unwrap();
    assert!(model.predict(4.0) > model.predict(0.0) + 1.0);
}

#[test]
fn test_every_kind_builds_and_fits() {
    let (x, y) = step_data();
    for kind in [
        RegressionKind::Linear,
        RegressionKind::RandomForest,
        RegressionKind::GradientBoosting,
        RegressionKind::KernelSvr,
    ] {
        let mut model = kind.build();
        model.fit(&x, &y).unwrap();
        assert!(model.predict(1.5).is_finite(), "{}", kind);
    }
}
