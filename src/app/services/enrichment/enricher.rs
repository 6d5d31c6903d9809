//! Joins raw measurements with sensor metadata and derived covariates

use super::elevation::ElevationGrid;
use crate::Result;
use crate::app::models::{Dataset, EnrichedRecord, Measurement, SensorMetadata};
use chrono::{Datelike, Timelike};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counters describing one enrichment pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub total_input: usize,
    /// Rows whose sensor had no complete metadata
    pub missing_metadata: usize,
    /// Rows with a missing measurement field
    pub incomplete_measurements: usize,
    pub enriched: usize,
}

impl EnrichmentStats {
    pub fn dropped(&self) -> usize {
        self.missing_metadata + self.incomplete_measurements
    }

    pub fn summary(&self) -> String {
        format!(
            "Enriched {}/{} measurements ({} without metadata, {} incomplete)",
            self.enriched, self.total_input, self.missing_metadata, self.incomplete_measurements
        )
    }
}

/// Attaches metadata, regional time and elevation to raw measurements
#[derive(Debug, Clone)]
pub struct DataEnricher {
    timezone: Tz,
    elevation: Option<Arc<ElevationGrid>>,
}

impl DataEnricher {
    /// Create an enricher normalising to `timezone`
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            elevation: None,
        }
    }

    /// Attach elevation from the given grid
    pub fn with_elevation(mut self, grid: Arc<ElevationGrid>) -> Self {
        self.elevation = Some(grid);
        self
    }

    /// Enrich one round's measurements
    ///
    /// Rows whose sensor metadata is incomplete, or whose measurement misses a
    /// field, are dropped. When no measurement reports an uptime counter the
    /// uptime column is considered absent instead.
    ///
    /// # Arguments
    ///
    /// * `measurements` - Raw measurements of the round
    /// * `metadata` - Metadata keyed by sensor id
    ///
    /// # Returns
    ///
    /// The enriched dataset together with drop counters
    pub fn enrich(
        &self,
        measurements: Vec<Measurement>,
        metadata: &HashMap<String, SensorMetadata>,
    ) -> Result<(Dataset, EnrichmentStats)> {
        let mut stats = EnrichmentStats {
            total_input: measurements.len(),
            ..Default::default()
        };

        let has_uptime = measurements.iter().any(|m| m.uptime.is_some());
        if !has_uptime && !measurements.is_empty() {
            warn!("No measurement reports an uptime counter, temporal checks will be skipped");
        }

        let mut records = Vec::with_capacity(measurements.len());
        for measurement in measurements {
            let Some(sensor) = metadata.get(&measurement.sensor_id).filter(|m| m.is_complete())
            else {
                stats.missing_metadata += 1;
                continue;
            };

            match self.enrich_single(measurement, sensor, has_uptime) {
                Some(record) => records.push(record),
                None => stats.incomplete_measurements += 1,
            }
        }

        stats.enriched = records.len();
        debug!("{}", stats.summary());
        info!(
            enriched = stats.enriched,
            dropped = stats.dropped(),
            elevation = self.elevation.is_some(),
            "Enrichment finished"
        );

        Ok((
            Dataset::new(records, self.elevation.is_some(), has_uptime),
            stats,
        ))
    }

    fn enrich_single(
        &self,
        measurement: Measurement,
        sensor: &SensorMetadata,
        has_uptime: bool,
    ) -> Option<EnrichedRecord> {
        let temperature = measurement.temperature.filter(|v| v.is_finite())?;
        let signal = measurement.signal.filter(|v| v.is_finite())?;
        let daylight = measurement.daylight?;
        let uptime = if has_uptime {
            Some(measurement.uptime.filter(|v| v.is_finite())?)
        } else {
            None
        };

        let latitude = sensor.latitude?;
        let longitude = sensor.longitude?;

        let elevation = match &self.elevation {
            Some(grid) => Some(grid.nearest(longitude, latitude)?),
            None => None,
        };

        let local = measurement.time.with_timezone(&self.timezone).naive_local();

        Some(EnrichedRecord {
            sensor_id: measurement.sensor_id,
            time: local,
            temperature,
            signal,
            uptime,
            daylight,
            link_id: sensor.link_id?,
            azimuth: sensor.azimuth?,
            latitude,
            longitude,
            hour: local.hour(),
            day: local.ordinal(),
            elevation,
        })
    }
}
