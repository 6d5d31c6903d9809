//! Tests for the global z-score test

use super::*;
use crate::Error;
use crate::app::services::anomaly_filter::global::{global_flags, mean_and_sample_std};

#[test]
fn test_sample_standard_deviation() {
    let (mean, std) = mean_and_sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
    assert!((mean - 5.0).abs() < 1e-12);
    // Population std is 2.0; the sample estimate uses n - 1
    assert!((std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);

    let (mean, std) = mean_and_sample_std(&[3.0]);
    assert_eq!(mean, 3.0);
    assert!(std.is_nan());
}

#[test]
fn test_warm_outlier_is_flagged() {
    let dataset = create_global_outlier_dataset();
    let flags = global_flags(&dataset.records, 2.0).unwrap();

    assert_eq!(flags.iter().filter(|f| **f).count(), 1);
    assert!(flags[9]);
}

#[test]
fn test_outlier_at_unusual_elevation_is_exempt() {
    let mut dataset = create_global_outlier_dataset();
    // Same warm reading, but at a mountain-top elevation far from the batch mean
    dataset.records[9].elevation = Some(2500.0);

    let flags = global_flags(&dataset.records, 2.0).unwrap();
    assert!(flags.iter().all(|f| !f));
}

#[test]
fn test_flags_invariant_under_affine_rescaling() {
    let dataset = create_global_outlier_dataset();
    let original = global_flags(&dataset.records, 2.0).unwrap();

    let rescaled: Vec<_> = dataset
        .records
        .iter()
        .cloned()
        .map(|mut r| {
            r.temperature = 1.8 * r.temperature + 32.0;
            r
        })
        .collect();

    assert_eq!(global_flags(&rescaled, 2.0).unwrap(), original);
}

#[test]
fn test_constant_temperatures_never_flag() {
    let records: Vec<_> = (0..5)
        .map(|i| create_test_record("s", 50.0, 14.0 + i as f64, 12.0, 100.0 * i as f64, None, 0))
        .collect();

    let flags = global_flags(&records, 2.0).unwrap();
    assert!(flags.iter().all(|f| !f));
}

#[test]
fn test_missing_elevation_is_an_error() {
    let mut dataset = create_global_outlier_dataset();
    dataset.records[3].elevation = None;

    let result = global_flags(&dataset.records, 2.0);
    assert!(matches!(result, Err(Error::MissingColumn { .. })));
}
