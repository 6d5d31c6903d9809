//! Core data structures for the temperature map pipeline
//!
//! Defines raw link measurements, sensor metadata, enriched and predicted
//! records, the per-round dataset and the interpolated output grid.

use chrono::{DateTime, NaiveDateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A single aggregated reading from one link endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Sensor identifier (the endpoint's management address)
    pub sensor_id: String,
    /// Aggregation window end, UTC
    pub time: DateTime<Utc>,
    /// Unit temperature reported by the radio
    pub temperature: Option<f64>,
    /// Received signal level
    pub signal: Option<f64>,
    /// Device uptime counter
    pub uptime: Option<f64>,
    /// Whether the window fell between sunrise and sunset
    pub daylight: Option<bool>,
}

impl Measurement {
    /// Create a fully populated measurement
    pub fn new(
        sensor_id: impl Into<String>,
        time: DateTime<Utc>,
        temperature: f64,
        signal: f64,
        uptime: Option<f64>,
        daylight: bool,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            time,
            temperature: Some(temperature),
            signal: Some(signal),
            uptime,
            daylight: Some(daylight),
        }
    }
}

/// Site and link attributes of a sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorMetadata {
    pub link_id: Option<i64>,
    pub site_id: Option<i64>,
    pub azimuth: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl SensorMetadata {
    /// Metadata for a sensor the store could not resolve
    pub fn missing() -> Self {
        Self {
            link_id: None,
            site_id: None,
            azimuth: None,
            latitude: None,
            longitude: None,
        }
    }

    /// Check whether every attribute the enricher attaches is present
    pub fn is_complete(&self) -> bool {
        self.link_id.is_some()
            && self.azimuth.is_some()
            && self.latitude.is_some()
            && self.longitude.is_some()
    }
}

/// Measurement joined with metadata and derived covariates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub sensor_id: String,
    /// Regional civil time without offset
    pub time: NaiveDateTime,
    pub temperature: f64,
    pub signal: f64,
    pub uptime: Option<f64>,
    pub daylight: bool,
    pub link_id: i64,
    pub azimuth: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// Hour of day, 0-23
    pub hour: u32,
    /// Day of year, 1-366
    pub day: u32,
    /// Terrain elevation, present when an elevation grid was supplied
    pub elevation: Option<f64>,
}

/// One round's enriched records plus the optional columns they carry
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<EnrichedRecord>,
    /// Elevation was attached during enrichment
    pub has_elevation: bool,
    /// The acquisition reported uptime counters
    pub has_uptime: bool,
}

impl Dataset {
    pub fn new(records: Vec<EnrichedRecord>, has_elevation: bool, has_uptime: bool) -> Self {
        Self {
            records,
            has_elevation,
            has_uptime,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Per-site model output aggregated over one hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedRecord {
    pub hour: u32,
    pub sensor_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub predicted_temperature: f64,
}

/// Interpolated temperature field over the region grid
///
/// Axis 0 runs along X (longitude), axis 1 along Y (latitude). Cells outside
/// the region boundary hold [`crate::constants::MISSING_VALUE`].
#[derive(Debug, Clone)]
pub struct OutputGrid {
    pub grid_x: Array2<f64>,
    pub grid_y: Array2<f64>,
    pub temperature: Array2<f64>,
}

impl OutputGrid {
    /// Number of cells along each axis
    pub fn shape(&self) -> (usize, usize) {
        self.temperature.dim()
    }

    /// Minimum and maximum over the finite cells
    pub fn temperature_range(&self) -> Option<(f64, f64)> {
        finite_range(self.temperature.iter().copied())
    }

    /// Bounds of the X and Y coordinate arrays: (x_min, x_max, y_min, y_max)
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let (x_min, x_max) = finite_range(self.grid_x.iter().copied())?;
        let (y_min, y_max) = finite_range(self.grid_y.iter().copied())?;
        Some((x_min, x_max, y_min, y_max))
    }

    /// Count of cells holding a finite temperature
    pub fn finite_cells(&self) -> usize {
        self.temperature.iter().filter(|v| v.is_finite()).count()
    }

    /// Value of the cell nearest to (x, y), or the sentinel outside the grid extent
    pub fn value_at(&self, x: f64, y: f64) -> f64 {
        let Some((x_min, x_max, y_min, y_max)) = self.bounds() else {
            return crate::constants::MISSING_VALUE;
        };
        if x < x_min || x > x_max || y < y_min || y > y_max {
            return crate::constants::MISSING_VALUE;
        }

        let (nx, ny) = self.shape();
        let i = nearest_index(x, x_min, x_max, nx);
        let j = nearest_index(y, y_min, y_max, ny);
        self.temperature[[i, j]]
    }
}

fn nearest_index(value: f64, min: f64, max: f64, count: usize) -> usize {
    if count <= 1 || max <= min {
        return 0;
    }
    let step = (max - min) / (count - 1) as f64;
    (((value - min) / step).round() as usize).min(count - 1)
}

fn finite_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
