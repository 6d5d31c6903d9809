//! Anomaly filtering for enriched link measurements
//!
//! Readings pass three plausibility checks before they reach inference:
//!
//! 1. **Temporal integrity**: sensors whose uptime counter decreases lose all
//!    their records ([`temporal`])
//! 2. **Global test**: temperature z-score against the batch, exempting
//!    records at unusual elevations ([`global`])
//! 3. **Local test**: residual against the mean of nearby records ([`local`])
//!
//! The global and local verdicts form an [`AnomalyTag`] per record and the
//! [`CombineMode`] decides which tags are removed ([`combine`]). Counters are
//! collected in an [`AnomalySummary`] ([`stats`]).

pub mod combine;
pub mod filter;
pub mod global;
pub mod local;
pub mod stats;
pub mod temporal;

#[cfg(test)]
pub mod tests;

pub use combine::{AnomalyTag, CombineMode};
pub use filter::AnomalyFilter;
pub use local::{LocalTest, LocalVerdict};
pub use stats::AnomalySummary;
pub use temporal::{TemporalOutcome, remove_uptime_resets};
