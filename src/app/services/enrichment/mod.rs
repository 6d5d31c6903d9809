//! Measurement enrichment
//!
//! Turns raw link measurements into [`EnrichedRecord`](crate::app::models::EnrichedRecord)
//! rows: sensor metadata is attached per sensor id, timestamps are normalised
//! to regional civil time, hour-of-day and day-of-year are derived, and an
//! elevation covariate is looked up when an elevation grid is available.
//!
//! - [`enricher`] - the [`DataEnricher`] pass and its counters
//! - [`elevation`] - the rectilinear [`ElevationGrid`] shared with the interpolator

pub mod elevation;
pub mod enricher;

#[cfg(test)]
pub mod tests;

pub use elevation::ElevationGrid;
pub use enricher::{DataEnricher, EnrichmentStats};
