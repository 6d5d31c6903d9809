//! Round summary derived from the enriched dataset

use crate::app::models::Dataset;
use crate::constants::{IMAGE_NAME_FORMAT, get_grid_export_filename, get_image_filename};
use chrono::{Duration, NaiveDateTime, Timelike};
use std::collections::HashSet;

/// Links contributing to a round and the artifact names derived from its hour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSummary {
    /// Unique link ids in first-seen order
    pub link_ids: Vec<i64>,
    /// First record's regional time ceiled to the whole hour
    pub image_time: NaiveDateTime,
    pub image_name: String,
}

impl RoundSummary {
    /// Summarise `dataset`, or `None` when it holds no records
    pub fn collect(dataset: &Dataset) -> Option<Self> {
        let first = dataset.records.first()?;

        let mut seen = HashSet::new();
        let link_ids = dataset
            .records
            .iter()
            .map(|record| record.link_id)
            .filter(|link_id| seen.insert(*link_id))
            .collect();

        let image_time = ceil_to_hour(first.time);
        Some(Self {
            link_ids,
            image_time,
            image_name: get_image_filename(&hour_label(image_time)),
        })
    }

    /// File name for the Parquet export of this round's grid
    pub fn export_name(&self) -> String {
        get_grid_export_filename(&hour_label(self.image_time))
    }
}

fn hour_label(time: NaiveDateTime) -> String {
    time.format(IMAGE_NAME_FORMAT).to_string()
}

/// Smallest whole hour not earlier than `time`
pub fn ceil_to_hour(time: NaiveDateTime) -> NaiveDateTime {
    let floored = time
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time);
    if floored == time {
        time
    } else {
        floored + Duration::hours(1)
    }
}
