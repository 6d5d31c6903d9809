//! Three-stage anomaly filter over one round's dataset

use super::combine::{AnomalyTag, CombineMode};
use super::global::global_flags;
use super::local::{LocalTest, LocalVerdict};
use super::stats::AnomalySummary;
use super::temporal::remove_uptime_resets;
use crate::app::models::Dataset;
use crate::config::AnomalyConfig;
use crate::constants::{
    DEFAULT_MIN_NEIGHBORS, DEFAULT_RADIUS_KM, DEFAULT_RESIDUAL_THRESHOLD, DEFAULT_Z_THRESHOLD,
    columns,
};
use crate::{Error, Result};
use tracing::debug;

/// Removes physically implausible readings from a dataset
///
/// Runs the uptime check, the global z-score test and the local residual test
/// in that order, then drops records according to the [`CombineMode`].
#[derive(Debug, Clone)]
pub struct AnomalyFilter {
    z_threshold: f64,
    local: LocalTest,
    combine_mode: CombineMode,
}

impl Default for AnomalyFilter {
    fn default() -> Self {
        Self {
            z_threshold: DEFAULT_Z_THRESHOLD,
            local: LocalTest {
                residual_threshold: DEFAULT_RESIDUAL_THRESHOLD,
                min_neighbors: DEFAULT_MIN_NEIGHBORS,
                radius_km: DEFAULT_RADIUS_KM,
            },
            combine_mode: CombineMode::Union,
        }
    }
}

impl AnomalyFilter {
    /// Build a filter from configuration, parsing the combine mode
    ///
    /// # Errors
    ///
    /// `Configuration` for an unknown combine mode.
    pub fn from_config(config: &AnomalyConfig) -> Result<Self> {
        Ok(Self {
            z_threshold: config.z_threshold,
            local: LocalTest {
                residual_threshold: config.residual_threshold,
                min_neighbors: config.min_neighbors,
                radius_km: config.radius_km,
            },
            combine_mode: config.combine_mode.parse()?,
        })
    }

    pub fn with_combine_mode(mut self, mode: CombineMode) -> Self {
        self.combine_mode = mode;
        self
    }

    pub fn with_z_threshold(mut self, threshold: f64) -> Self {
        self.z_threshold = threshold;
        self
    }

    pub fn with_residual_threshold(mut self, threshold: f64) -> Self {
        self.local.residual_threshold = threshold;
        self
    }

    pub fn with_min_neighbors(mut self, min_neighbors: usize) -> Self {
        self.local.min_neighbors = min_neighbors;
        self
    }

    pub fn with_radius_km(mut self, radius_km: f64) -> Self {
        self.local.radius_km = radius_km;
        self
    }

    pub fn combine_mode(&self) -> CombineMode {
        self.combine_mode
    }

    /// Tag every record without removing anything
    ///
    /// Returns the tags together with the local verdicts, aligned with
    /// `dataset.records`.
    ///
    /// # Errors
    ///
    /// `MissingColumn` when the dataset carries no elevation.
    pub fn tag(&self, dataset: &Dataset) -> Result<(Vec<AnomalyTag>, Vec<LocalVerdict>)> {
        if !dataset.has_elevation {
            return Err(Error::missing_column(columns::ELEVATION, "anomaly detection"));
        }

        let global = global_flags(&dataset.records, self.z_threshold)?;
        let local = self.local.evaluate(&dataset.records);

        let tags = global
            .iter()
            .zip(&local)
            .map(|(g, l)| AnomalyTag::from_flags(*g, l.is_anomalous()))
            .collect();
        Ok((tags, local))
    }

    /// Run all stages and return the clean dataset with its summary
    ///
    /// # Arguments
    ///
    /// * `dataset` - Enriched records of the round
    ///
    /// # Returns
    ///
    /// The surviving records, in input order, and the pass counters
    pub fn filter(&self, dataset: Dataset) -> Result<(Dataset, AnomalySummary)> {
        let mut summary = AnomalySummary {
            total_input: dataset.len(),
            combine_mode: self.combine_mode,
            ..Default::default()
        };

        let dataset = if dataset.has_uptime {
            let Dataset {
                records,
                has_elevation,
                has_uptime,
            } = dataset;
            let (records, outcome) = remove_uptime_resets(records);
            summary.uptime_removed = outcome.removed;
            summary.restarts = outcome.restarts;
            Dataset::new(records, has_elevation, has_uptime)
        } else {
            debug!("Uptime column absent, skipping temporal check");
            dataset
        };

        let (tags, verdicts) = self.tag(&dataset)?;

        summary.global_anomalies = tags.iter().filter(|t| t.is_global()).count();
        summary.local_anomalies = verdicts.iter().filter(|v| v.is_anomalous()).count();
        summary.unevaluated = verdicts
            .iter()
            .filter(|v| **v == LocalVerdict::Unevaluated)
            .count();

        let Dataset {
            records,
            has_elevation,
            has_uptime,
        } = dataset;
        let kept: Vec<_> = records
            .into_iter()
            .zip(&tags)
            .filter(|(_, tag)| !self.combine_mode.removes(**tag))
            .map(|(record, _)| record)
            .collect();

        summary.combined_anomalies = tags.len() - kept.len();
        summary.total_output = kept.len();
        summary.log();
        debug!("{}", summary.summary());

        Ok((Dataset::new(kept, has_elevation, has_uptime), summary))
    }
}
