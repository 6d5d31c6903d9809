//! Tests for the anomaly filter

pub mod combine_tests;
pub mod global_tests;
pub mod temporal_tests;

use crate::app::models::{Dataset, EnrichedRecord};
use chrono::{Duration, NaiveDate};

/// Create an enriched record `minutes` after 2024-05-01 12:00
pub fn create_test_record(
    sensor_id: &str,
    latitude: f64,
    longitude: f64,
    temperature: f64,
    elevation: f64,
    uptime: Option<f64>,
    minutes: i64,
) -> EnrichedRecord {
    let time = NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        + Duration::minutes(minutes);

    EnrichedRecord {
        sensor_id: sensor_id.to_string(),
        time,
        temperature,
        signal: -50.0,
        uptime,
        daylight: true,
        link_id: 1,
        azimuth: 180.0,
        latitude,
        longitude,
        hour: 12,
        day: 122,
        elevation: Some(elevation),
    }
}

/// Ten sensors one degree apart; sensor "s9" is a strong warm outlier at an ordinary elevation
///
/// No sensor has neighbours within 20 km, so only the global test can flag.
pub fn create_global_outlier_dataset() -> Dataset {
    let temperatures = [10.0, 10.5, 9.5, 10.2, 9.8, 10.1, 9.9, 10.3, 9.7, 30.0];
    let elevations = [200.0, 300.0, 250.0, 220.0, 280.0, 260.0, 240.0, 230.0, 270.0, 250.0];

    let records = temperatures
        .iter()
        .zip(elevations)
        .enumerate()
        .map(|(i, (t, e))| {
            create_test_record(&format!("s{}", i), 49.0 + i as f64, 14.0, *t, e, None, 0)
        })
        .collect();

    Dataset::new(records, true, false)
}

/// Five sensors at 10 °C and one at 20 °C within a few kilometres, all at the same elevation
pub fn create_local_outlier_dataset() -> Dataset {
    let offsets = [
        (0.00, 0.00),
        (0.03, 0.00),
        (0.00, 0.03),
        (-0.03, 0.00),
        (0.00, -0.03),
    ];

    let mut records: Vec<EnrichedRecord> = offsets
        .iter()
        .enumerate()
        .map(|(i, (dlat, dlon))| {
            create_test_record(&format!("n{}", i), 50.0 + dlat, 14.5 + dlon, 10.0, 300.0, None, 0)
        })
        .collect();
    records.push(create_test_record("hot", 50.02, 14.52, 20.0, 300.0, None, 0));

    Dataset::new(records, true, false)
}
