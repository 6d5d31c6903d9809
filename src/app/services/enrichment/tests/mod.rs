//! Tests for measurement enrichment


use crate::app::models::{Measurement, SensorMetadata};
use crate::app::services::enrichment::ElevationGrid;
use chrono::{TimeZone, Utc};
use ndarray::Array2;
use std::collections::HashMap;

/// Create a complete measurement at the given UTC hour on 2024-07-01
pub fn create_test_measurement(sensor_id: &str, hour: u32, uptime: Option<f64>) -> Measurement {
    Measurement::new(
        sensor_id,
        Utc.with_ymd_and_hms(2024, 7, 1, hour, 0, 0).unwrap(),
        24.5,
        -48.0,
        uptime,
        true,
    )
}

/// Create complete metadata for a sensor at (lat, lon)
pub fn create_test_metadata(link_id: i64, latitude: f64, longitude: f64) -> SensorMetadata {
    SensorMetadata {
        link_id: Some(link_id),
        site_id: Some(link_id * 10),
        azimuth: Some(90.0),
        latitude: Some(latitude),
        longitude: Some(longitude),
    }
}

/// Metadata map for sensors "10.0.0.1" and "10.0.0.2"
pub fn create_test_metadata_map() -> HashMap<String, SensorMetadata> {
    let mut metadata = HashMap::new();
    metadata.insert("10.0.0.1".to_string(), create_test_metadata(1, 50.0, 14.0));
    metadata.insert("10.0.0.2".to_string(), create_test_metadata(2, 50.5, 15.0));
    metadata
}

/// 3x3 grid over lon 14..16, lat 49..51 where elevation = 100*lon_index + 10*lat_index
pub fn create_test_elevation_grid() -> ElevationGrid {
    let lons = vec![14.0, 15.0, 16.0];
    let lats = vec![49.0, 50.0, 51.0];
    let values = Array2::from_shape_fn((3, 3), |(i, j)| 100.0 * i as f64 + 10.0 * j as f64);
    ElevationGrid::new(lons, lats, values).unwrap()
}
