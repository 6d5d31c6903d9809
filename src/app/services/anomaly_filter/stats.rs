//! Anomaly filter counters

use super::combine::CombineMode;
use serde::Serialize;
use tracing::info;

/// Counts produced once per filter pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnomalySummary {
    pub total_input: usize,
    /// Records removed by the uptime check
    pub uptime_removed: usize,
    /// Sensors that restarted
    pub restarts: usize,
    pub global_anomalies: usize,
    pub local_anomalies: usize,
    /// Records with too few neighbours for the local test
    pub unevaluated: usize,
    /// Records removed by the combination step
    pub combined_anomalies: usize,
    pub combine_mode: CombineMode,
    pub total_output: usize,
}

impl AnomalySummary {
    /// Share of the input that survived, as a percentage
    pub fn retention_rate(&self) -> f64 {
        if self.total_input == 0 {
            0.0
        } else {
            (self.total_output as f64 / self.total_input as f64) * 100.0
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Anomaly filter: {} -> {} records ({:.1}% retained, {} restarts, {} global, {} local, {} unevaluated, {} combined by {})",
            self.total_input,
            self.total_output,
            self.retention_rate(),
            self.restarts,
            self.global_anomalies,
            self.local_anomalies,
            self.unevaluated,
            self.combined_anomalies,
            self.combine_mode
        )
    }

    /// Emit the summary as one structured log event
    pub fn log(&self) {
        info!(
            uptime_removed = self.uptime_removed,
            restarts = self.restarts,
            global_anomalies = self.global_anomalies,
            local_anomalies = self.local_anomalies,
            unevaluated = self.unevaluated,
            combined_anomalies = self.combined_anomalies,
            combine_mode = %self.combine_mode,
            "anomaly_detection_summary"
        );
    }
}
