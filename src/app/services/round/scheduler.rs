//! Hourly round scheduling on the async runtime

use super::orchestrator::{RoundOrchestrator, RoundOutcome};
use crate::app::context::RoundContext;
use crate::{Error, Result};
use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Time left until the next whole hour of `timezone`; a full hour when `now`
/// is on the hour there
pub fn duration_until_next_hour(now: DateTime<Utc>, timezone: Tz) -> StdDuration {
    let local = now.with_timezone(&timezone);
    let into_hour = Duration::minutes(i64::from(local.minute()))
        + Duration::seconds(i64::from(local.second()))
        + Duration::nanoseconds(i64::from(local.nanosecond()));
    (Duration::hours(1) - into_hour)
        .to_std()
        .unwrap_or(StdDuration::ZERO)
}

/// Outcome counters over the scheduler's lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub rounds: u64,
    pub completed: u64,
    pub no_data: u64,
    pub failed: u64,
}

impl SchedulerStats {
    fn record(&mut self, outcome: &RoundOutcome) {
        self.rounds += 1;
        match outcome {
            RoundOutcome::Completed(_) => self.completed += 1,
            RoundOutcome::NoData { .. } => self.no_data += 1,
            RoundOutcome::Failed { .. } | RoundOutcome::Panicked { .. } => self.failed += 1,
        }
    }
}

/// Drives rounds back to back, one per hour
///
/// The first round starts immediately. Each round runs on a blocking worker
/// and is awaited before the scheduler sleeps, so rounds never overlap.
/// Cancellation is honoured only between rounds.
pub struct Scheduler {
    orchestrator: Arc<RoundOrchestrator>,
    timezone: Tz,
    run_once: bool,
    token: CancellationToken,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<RoundOrchestrator>, timezone: Tz, token: CancellationToken) -> Self {
        Self {
            orchestrator,
            timezone,
            run_once: false,
            token,
        }
    }

    /// Stop after the first round
    pub fn with_run_once(mut self, run_once: bool) -> Self {
        self.run_once = run_once;
        self
    }

    /// Run rounds until cancelled, or once when so configured
    ///
    /// # Errors
    ///
    /// `ProcessingInterrupted` when the blocking worker of a round cannot be
    /// joined.
    pub async fn run(&self) -> Result<SchedulerStats> {
        let mut stats = SchedulerStats::default();
        let mut round_id = 0;

        while !self.token.is_cancelled() {
            round_id += 1;
            let ctx = RoundContext::new(round_id, self.timezone);
            let orchestrator = Arc::clone(&self.orchestrator);

            let outcome = tokio::task::spawn_blocking(move || orchestrator.run(&ctx))
                .await
                .map_err(|e| Error::processing_interrupted(format!("Round worker failed: {}", e)))?;
            debug!(round = round_id, outcome = ?outcome, "Round finished");
            stats.record(&outcome);

            if self.run_once {
                break;
            }

            let wait = duration_until_next_hour(Utc::now(), self.timezone);
            info!("Next round in {}s", wait.as_secs());
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = self.token.cancelled() => {
                    info!("Scheduler cancelled between rounds");
                    break;
                }
            }
        }

        info!(
            rounds = stats.rounds,
            completed = stats.completed,
            no_data = stats.no_data,
            failed = stats.failed,
            "Scheduler stopped"
        );
        Ok(stats)
    }
}
