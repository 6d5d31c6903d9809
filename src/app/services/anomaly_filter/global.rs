//! Batch-wide z-score test
//!
//! A record is globally anomalous when its temperature is far from the batch
//! mean while its elevation is not, so warm valleys and cold peaks survive.

use crate::app::models::EnrichedRecord;
use crate::constants::columns;
use crate::{Error, Result};

/// Mean and sample standard deviation (n - 1 denominator)
///
/// Returns NaN for the deviation with fewer than two values.
pub fn mean_and_sample_std(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, f64::NAN);
    }

    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (mean, variance.sqrt())
}

/// Flag records with `|z(temperature)| > threshold` and `|z(elevation)| <= threshold`
///
/// A zero or undefined deviation yields non-finite z-scores, which never flag.
///
/// # Errors
///
/// `MissingColumn` when any record lacks an elevation.
pub fn global_flags(records: &[EnrichedRecord], z_threshold: f64) -> Result<Vec<bool>> {
    let elevations = records
        .iter()
        .map(|r| r.elevation)
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| Error::missing_column(columns::ELEVATION, "global anomaly test"))?;
    let temperatures: Vec<f64> = records.iter().map(|r| r.temperature).collect();

    let (temp_mean, temp_std) = mean_and_sample_std(&temperatures);
    let (elev_mean, elev_std) = mean_and_sample_std(&elevations);

    let flags = temperatures
        .iter()
        .zip(&elevations)
        .map(|(t, e)| {
            let z_temp = (t - temp_mean) / temp_std;
            let z_elev = (e - elev_mean) / elev_std;
            z_temp.abs() > z_threshold && z_elev.abs() <= z_threshold
        })
        .collect();

    Ok(flags)
}
