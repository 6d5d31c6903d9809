//! Hourly processing rounds
//!
//! [`RoundOrchestrator`] runs one round end to end and contains every failure
//! at the round boundary. The [`scheduler`] drives rounds once per civil hour
//! on a blocking worker thread.

pub mod orchestrator;
pub mod scheduler;
pub mod summary;

#[cfg(test)]
pub mod tests;

pub use orchestrator::{RoundOrchestrator, RoundOutcome, RoundReport, RoundServices, Stage};
pub use scheduler::{Scheduler, SchedulerStats, duration_until_next_hour};
pub use summary::{RoundSummary, ceil_to_hour};
