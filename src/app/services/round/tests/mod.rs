//! Tests for round orchestration and scheduling

pub mod orchestrator_tests;

use crate::app::adapters::{
    GridRecord, MeasurementSource, MetadataStore, ParametersRecord, ResultStore,
};
use crate::app::context::RoundContext;
use crate::app::models::{Measurement, SensorMetadata};
use crate::app::services::enrichment::ElevationGrid;
use crate::app::services::inference::TemperatureModel;
use crate::app::services::interpolation::RegionBoundary;
use crate::app::services::round::{RoundOrchestrator, RoundServices};
use crate::config::PipelineConfig;
use crate::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Five sites over lon 14..15, lat 49..50: (sensor, link, lon, lat, temperature)
pub const TEST_SITES: [(&str, i64, f64, f64, f64); 5] = [
    ("10.0.0.1", 1, 14.25, 49.25, 18.0),
    ("10.0.0.2", 1, 14.75, 49.25, 16.5),
    ("10.0.0.3", 2, 14.5, 49.75, 17.2),
    ("10.0.0.4", 2, 14.25, 49.75, 19.1),
    ("10.0.0.5", 3, 14.75, 49.75, 15.8),
];

/// Round start used by every orchestrator test: 14:05:30 in Prague
pub fn create_test_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, 12, 5, 30).unwrap()
}

pub fn create_test_context() -> RoundContext {
    RoundContext::starting_at(1, create_test_start(), chrono_tz::Europe::Prague)
}

/// Two readings per site at 11:10 and 11:40 UTC, 0.1 °C either side of the site value
pub fn create_test_measurements() -> Vec<Measurement> {
    let mut measurements = Vec::new();
    for (minute, offset, uptime) in [(10, -0.1, 100.0), (40, 0.1, 130.0)] {
        for (sensor, _, _, _, temperature) in TEST_SITES {
            measurements.push(Measurement::new(
                sensor,
                Utc.with_ymd_and_hms(2024, 7, 1, 11, minute, 0).unwrap(),
                temperature + offset,
                -50.0,
                Some(uptime),
                true,
            ));
        }
    }
    measurements
}

pub fn create_test_metadata() -> HashMap<String, SensorMetadata> {
    TEST_SITES
        .iter()
        .enumerate()
        .map(|(i, (sensor, link, lon, lat, _))| {
            (
                sensor.to_string(),
                SensorMetadata {
                    link_id: Some(*link),
                    site_id: Some(i as i64 + 1),
                    azimuth: Some(45.0 * i as f64),
                    latitude: Some(*lat),
                    longitude: Some(*lon),
                },
            )
        })
        .collect()
}

/// Elevation rising from 200 m in the south-west to 500 m in the north-east
pub fn create_test_elevation() -> Arc<ElevationGrid> {
    let points = [
        (14.0, 49.0, 200.0),
        (15.0, 49.0, 300.0),
        (14.0, 50.0, 400.0),
        (15.0, 50.0, 500.0),
    ];
    Arc::new(ElevationGrid::from_points(&points).unwrap())
}

pub fn create_test_boundary() -> Arc<RegionBoundary> {
    Arc::new(RegionBoundary::rectangle(14.0, 49.0, 15.0, 50.0).unwrap())
}

/// Small grid and no retry delay
pub fn create_test_config() -> PipelineConfig {
    PipelineConfig::default()
        .with_grid_resolution(20)
        .with_retry(2, 0)
}

pub struct FixedSource(pub Vec<Measurement>);

impl MeasurementSource for FixedSource {
    fn fetch(&self, _ctx: &RoundContext) -> Result<Vec<Measurement>> {
        Ok(self.0.clone())
    }
}

pub struct MapMetadata(pub HashMap<String, SensorMetadata>);

impl MetadataStore for MapMetadata {
    fn lookup(&self, sensor_ids: &[String]) -> Result<HashMap<String, SensorMetadata>> {
        Ok(sensor_ids
            .iter()
            .filter_map(|id| self.0.get(id).map(|m| (id.clone(), m.clone())))
            .collect())
    }
}

pub struct FailingMetadata;

impl MetadataStore for FailingMetadata {
    fn lookup(&self, _sensor_ids: &[String]) -> Result<HashMap<String, SensorMetadata>> {
        Err(Error::acquisition("metadata store unreachable"))
    }
}

/// Predicts the measured temperature unchanged
pub struct EchoModel;

impl TemperatureModel for EchoModel {
    fn predict(&self, features: &[f64; 6]) -> f64 {
        features[0]
    }
}

pub struct NanModel;

impl TemperatureModel for NanModel {
    fn predict(&self, _features: &[f64; 6]) -> f64 {
        f64::NAN
    }
}

pub struct PanickingModel;

impl TemperatureModel for PanickingModel {
    fn predict(&self, _features: &[f64; 6]) -> f64 {
        panic!("model weights corrupted")
    }
}

/// Result store keeping rows in shared vectors the test can inspect
#[derive(Clone, Default)]
pub struct RecordingStore {
    pub grids: Arc<Mutex<Vec<GridRecord>>>,
    pub parameters: Arc<Mutex<Vec<ParametersRecord>>>,
    pub fail_grids: bool,
}

impl ResultStore for RecordingStore {
    fn write_grid(&self, record: &GridRecord) -> Result<()> {
        if self.fail_grids {
            return Err(Error::data_validation("grid table locked"));
        }
        self.grids.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn write_parameters(&self, record: &ParametersRecord) -> Result<()> {
        self.parameters.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Services over the standard test scenario with no side-effect adapters
pub fn create_test_services(model: Box<dyn TemperatureModel>) -> RoundServices {
    RoundServices {
        source: Box::new(FixedSource(create_test_measurements())),
        metadata: Box::new(MapMetadata(create_test_metadata())),
        model,
        results: None,
        renderer: None,
        exporter: None,
    }
}

pub fn create_test_orchestrator(services: RoundServices) -> RoundOrchestrator {
    RoundOrchestrator::new(
        &create_test_config(),
        services,
        create_test_elevation(),
        create_test_boundary(),
    )
    .unwrap()
}
