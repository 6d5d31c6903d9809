//! Tests for spatial interpolation

pub mod kriging_tests;
pub mod regression_tests;

use crate::app::models::PredictedRecord;
use crate::app::services::enrichment::ElevationGrid;
use crate::app::services::interpolation::RegionBoundary;
use ndarray::Array2;

/// Unit square boundary from (0, 0) to (1, 1)
pub fn create_unit_square() -> RegionBoundary {
    RegionBoundary::rectangle(0.0, 0.0, 1.0, 1.0).unwrap()
}

/// Elevation rising 100 m per unit of longitude over the unit square
pub fn create_sloped_elevation() -> ElevationGrid {
    let values = Array2::from_shape_vec((2, 2), vec![0.0, 0.0, 100.0, 100.0]).unwrap();
    ElevationGrid::new(vec![0.0, 1.0], vec![0.0, 1.0], values).unwrap()
}

pub fn create_test_prediction(sensor_id: &str, lon: f64, lat: f64, temperature: f64) -> PredictedRecord {
    PredictedRecord {
        hour: 12,
        sensor_id: sensor_id.to_string(),
        latitude: lat,
        longitude: lon,
        predicted_temperature: temperature,
    }
}

/// Five sites placed on nodes of a 5x5 unit-square grid
pub fn create_test_predictions() -> Vec<PredictedRecord> {
    vec![
        create_test_prediction("10.0.0.1", 0.25, 0.25, 18.0),
        create_test_prediction("10.0.0.2", 0.75, 0.25, 16.5),
        create_test_prediction("10.0.0.3", 0.5, 0.75, 17.2),
        create_test_prediction("10.0.0.4", 0.25, 0.75, 19.1),
        create_test_prediction("10.0.0.5", 0.75, 0.75, 15.8),
    ]
}
