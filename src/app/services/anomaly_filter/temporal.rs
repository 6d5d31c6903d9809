//! Uptime-counter integrity check
//!
//! A device whose uptime counter ever decreases within the batch has
//! restarted; none of its readings are trusted for the round.

use crate::app::models::EnrichedRecord;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Result of the temporal stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemporalOutcome {
    /// Records removed because their sensor restarted
    pub removed: usize,
    /// Distinct sensors that restarted
    pub restarts: usize,
}

/// Sensors whose uptime counter decreases between time-ordered readings
pub fn find_restarted_sensors(records: &[EnrichedRecord]) -> HashSet<String> {
    let mut by_sensor: HashMap<&str, Vec<(chrono::NaiveDateTime, f64)>> = HashMap::new();
    for record in records {
        if let Some(uptime) = record.uptime {
            by_sensor
                .entry(record.sensor_id.as_str())
                .or_default()
                .push((record.time, uptime));
        }
    }

    by_sensor
        .into_iter()
        .filter_map(|(sensor, mut readings)| {
            // Stable sort keeps input order for equal timestamps
            readings.sort_by_key(|(time, _)| *time);
            readings
                .windows(2)
                .any(|pair| pair[1].1 - pair[0].1 < 0.0)
                .then(|| sensor.to_string())
        })
        .collect()
}

/// Drop every record of a sensor that restarted during the batch
///
/// Surviving records keep their input order.
pub fn remove_uptime_resets(records: Vec<EnrichedRecord>) -> (Vec<EnrichedRecord>, TemporalOutcome) {
    let restarted = find_restarted_sensors(&records);
    if restarted.is_empty() {
        return (records, TemporalOutcome::default());
    }

    let before = records.len();
    let kept: Vec<EnrichedRecord> = records
        .into_iter()
        .filter(|record| !restarted.contains(&record.sensor_id))
        .collect();

    let outcome = TemporalOutcome {
        removed: before - kept.len(),
        restarts: restarted.len(),
    };
    debug!(
        "Uptime check removed {} records from {} restarted sensors",
        outcome.removed, outcome.restarts
    );

    (kept, outcome)
}
