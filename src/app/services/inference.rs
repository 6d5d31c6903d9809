//! Per-link temperature inference
//!
//! The pretrained model is produced elsewhere and shipped as JSON. This module
//! only applies it to enriched records and aggregates the output per site.

use crate::app::models::{Dataset, EnrichedRecord, PredictedRecord};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Model input features, in the order the model was trained on
pub const FEATURE_NAMES: [&str; 6] = ["temperature", "daylight", "hour", "day", "signal", "azimuth"];

/// A trained model mapping one enriched record to a temperature
pub trait TemperatureModel: Send + Sync {
    fn predict(&self, features: &[f64; 6]) -> f64;
}

/// Feature vector of a record in [`FEATURE_NAMES`] order
pub fn features(record: &EnrichedRecord) -> [f64; 6] {
    [
        record.temperature,
        if record.daylight { 1.0 } else { 0.0 },
        record.hour as f64,
        record.day as f64,
        record.signal,
        record.azimuth,
    ]
}

/// Linear model over standardised features
///
/// `prediction = intercept + sum(weight_k * (x_k - mean_k) / scale_k)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledLinearModel {
    pub means: [f64; 6],
    pub scales: [f64; 6],
    pub weights: [f64; 6],
    pub intercept: f64,
}

impl ScaledLinearModel {
    /// Load a model exported as JSON
    ///
    /// # Errors
    ///
    /// `FileNotFound` for a missing file, `Json` for a malformed one and
    /// `Inference` when a scale is zero or not finite.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::file_not_found(path.display().to_string()));
        }
        let content = fs::read_to_string(path)
            .map_err(|e| Error::io(format!("Failed to read model {}", path.display()), e))?;
        let model: Self = serde_json::from_str(&content)
            .map_err(|e| Error::json(format!("Invalid model file {}", path.display()), e))?;
        model.validate()?;

        debug!("Loaded inference model from {}", path.display());
        Ok(model)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, scale) in FEATURE_NAMES.iter().zip(&self.scales) {
            if !scale.is_finite() || *scale == 0.0 {
                return Err(Error::inference(format!(
                    "Feature '{}' has invalid scale {}",
                    name, scale
                )));
            }
        }
        Ok(())
    }
}

impl TemperatureModel for ScaledLinearModel {
    fn predict(&self, features: &[f64; 6]) -> f64 {
        features
            .iter()
            .zip(&self.means)
            .zip(&self.scales)
            .zip(&self.weights)
            .map(|(((x, mean), scale), weight)| weight * (x - mean) / scale)
            .sum::<f64>()
            + self.intercept
    }
}

/// Apply `model` to every record and average per (hour, sensor, location)
///
/// Output is sorted by hour, sensor id, latitude and longitude.
///
/// # Errors
///
/// `Inference` when the model yields a non-finite value.
pub fn predict_dataset(model: &dyn TemperatureModel, dataset: &Dataset) -> Result<Vec<PredictedRecord>> {
    let mut rows: Vec<(&EnrichedRecord, f64)> = Vec::with_capacity(dataset.len());
    for record in &dataset.records {
        let value = model.predict(&features(record));
        if !value.is_finite() {
            return Err(Error::inference(format!(
                "Non-finite prediction for sensor {} at {}",
                record.sensor_id, record.time
            )));
        }
        rows.push((record, value));
    }

    rows.sort_by(|(a, _), (b, _)| {
        a.hour
            .cmp(&b.hour)
            .then_with(|| a.sensor_id.cmp(&b.sensor_id))
            .then_with(|| a.latitude.total_cmp(&b.latitude))
            .then_with(|| a.longitude.total_cmp(&b.longitude))
    });

    let mut predictions: Vec<PredictedRecord> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for (record, value) in rows {
        match predictions.last_mut() {
            Some(last)
                if last.hour == record.hour
                    && last.sensor_id == record.sensor_id
                    && last.latitude == record.latitude
                    && last.longitude == record.longitude =>
            {
                last.predicted_temperature += value;
                if let Some(count) = counts.last_mut() {
                    *count += 1;
                }
            }
            _ => {
                predictions.push(PredictedRecord {
                    hour: record.hour,
                    sensor_id: record.sensor_id.clone(),
                    latitude: record.latitude,
                    longitude: record.longitude,
                    predicted_temperature: value,
                });
                counts.push(1);
            }
        }
    }
    for (prediction, count) in predictions.iter_mut().zip(counts) {
        prediction.predicted_temperature /= count as f64;
    }

    info!(
        records = dataset.len(),
        sites = predictions.len(),
        "Temperature inference completed"
    );
    Ok(predictions)
}
