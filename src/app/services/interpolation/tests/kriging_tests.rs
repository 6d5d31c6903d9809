//! Tests for ordinary kriging

use crate::app::services::interpolation::kriging::{OrdinaryKriging, merge_duplicate_locations};
use crate::app::services::interpolation::variogram::{FittedVariogram, VariogramModel};

fn exponential() -> FittedVariogram {
    FittedVariogram {
        model: VariogramModel::Exponential,
        nugget: 0.0,
        psill: 1.0,
        range: 3.0,
    }
}

#[test]
fn test_exact_hit_returns_sample() {
    let coords = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
    let values = [3.0, 5.0, 7.0];
    let kriging = OrdinaryKriging::new(&coords, &values, exponential(), 10);

    assert_eq!(kriging.predict(1.0, 0.0), 5.0);
    assert_eq!(kriging.sample_count(), 3);
}

#[test]
fn test_symmetric_midpoint_is_mean() {
    let coords = [[0.0, 0.0], [2.0, 0.0]];
    let values = [10.0, 20.0];
    let kriging = OrdinaryKriging::new(&coords, &values, exponential(), 10);

    assert!((kriging.predict(1.0, 0.0) - 15.0).abs() < 1e-9);
}

#[test]
fn test_weights_sum_to_one() {
    let coords = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
    let kriging = OrdinaryKriging::new(&coords, &[4.0; 4], exponential(), 10);

    // A constant field is reproduced anywhere
    assert!((kriging.predict(0.3, 0.6) - 4.0).abs() < 1e-9);
    assert!((kriging.predict(5.0, -2.0) - 4.0).abs() < 1e-9);
}

#[test]
fn test_single_neighbour_and_empty() {
    let coords = [[0.0, 0.0], [1.0, 0.0]];
    let kriging = OrdinaryKriging::new(&coords, &[1.0, 9.0], exponential(), 1);
    assert_eq!(kriging.predict(0.9, 0.0), 9.0);

    let empty = OrdinaryKriging::new(&[], &[], exponential(), 5);
    assert!(empty.predict(0.0, 0.0).is_nan());
}

#[test]
fn test_duplicate_locations_are_averaged() {
    let coords = [[1.0, 1.0], [0.0, -0.0], [1.0, 1.0], [0.0, 0.0]];
    let values = [2.0, 10.0, 4.0, 20.0];

    let (merged, averaged) = merge_duplicate_locations(&coords, &values);
    assert_eq!(merged, vec![[1.0, 1.0], [0.0, -0.0]]);
    assert_eq!(averaged, vec![3.0, 15.0]);

    let kriging = OrdinaryKriging::new(&coords, &values, exponential(), 10);
    assert_eq!(kriging.sample_count(), 2);
    assert_eq!(kriging.predict(1.0, 1.0), 3.0);
}
