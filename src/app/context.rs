//! Per-round execution context passed into every stage

use crate::constants::ROUND_LOG_FORMAT;
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::Span;

/// Identity and timing of one processing round
#[derive(Debug, Clone)]
pub struct RoundContext {
    /// Monotonic round counter, starting at 1
    pub id: u64,
    /// Wall-clock start of the round
    pub started: DateTime<Utc>,
    /// Regional zone used for log lines and persisted start time
    pub timezone: Tz,
    span: Span,
}

impl RoundContext {
    /// Create the context for round `id` starting now
    pub fn new(id: u64, timezone: Tz) -> Self {
        Self::starting_at(id, Utc::now(), timezone)
    }

    /// Create the context for a round with an explicit start time
    pub fn starting_at(id: u64, started: DateTime<Utc>, timezone: Tz) -> Self {
        let label = started
            .with_timezone(&timezone)
            .format(ROUND_LOG_FORMAT)
            .to_string();
        let span = tracing::info_span!("round", id, started = %label);
        Self {
            id,
            started,
            timezone,
            span,
        }
    }

    /// Start time in regional civil time without offset
    pub fn started_local(&self) -> NaiveDateTime {
        self.started.with_timezone(&self.timezone).naive_local()
    }

    /// Start time formatted for log lines
    pub fn started_label(&self) -> String {
        self.started_local().format(ROUND_LOG_FORMAT).to_string()
    }

    /// Tracing span that all stage logs of this round are recorded under
    pub fn span(&self) -> &Span {
        &self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_started_label_uses_regional_time() {
        let started = Utc.with_ymd_and_hms(2024, 1, 15, 11, 5, 0).unwrap();
        let context = RoundContext::starting_at(3, started, chrono_tz::Europe::Prague);

        assert_eq!(context.id, 3);
        assert_eq!(context.started_label(), "2024-01-15 12:05");
    }
}
