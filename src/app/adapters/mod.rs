//! Boundaries to the systems a round reads from and writes to
//!
//! The round orchestrator only sees the traits defined here. Concrete
//! adapters are file-backed (polars), SQLite-backed (rusqlite) or write
//! images (plotters).

pub mod acquisition;
pub mod geodata;
pub mod grid_export;
pub mod image_access;
pub mod metadata_store;
pub mod renderer;
pub mod result_store;
pub mod table;

use crate::Result;
use crate::app::context::RoundContext;
use crate::app::models::{Measurement, OutputGrid, SensorMetadata};
use std::collections::HashMap;
use std::path::PathBuf;

pub use acquisition::{RetryPolicy, TableMeasurementSource, acquire_with_retry};
pub use geodata::{load_elevation_grid, load_region_boundary};
pub use grid_export::ParquetGridExporter;
pub use image_access::{ImageAccessPolicy, ImageRequestError};
pub use metadata_store::SqliteMetadataStore;
pub use renderer::PngGridRenderer;
pub use result_store::{GridRecord, ParametersRecord, SqliteResultStore};

/// Source of raw link measurements for one round
pub trait MeasurementSource: Send + Sync {
    fn fetch(&self, ctx: &RoundContext) -> Result<Vec<Measurement>>;
}

/// Lookup of per-sensor link and site attributes
pub trait MetadataStore: Send + Sync {
    /// Metadata for each requested sensor; unknown sensors map to
    /// [`SensorMetadata::missing`]
    fn lookup(&self, sensor_ids: &[String]) -> Result<HashMap<String, SensorMetadata>>;
}

/// Persistence of round results
pub trait ResultStore: Send + Sync {
    fn write_grid(&self, record: &GridRecord) -> Result<()>;
    fn write_parameters(&self, record: &ParametersRecord) -> Result<()>;
}

/// Image rendering of an output grid
pub trait GridRenderer: Send + Sync {
    /// Render `grid` under `file_name` and return the written path
    fn render(&self, grid: &OutputGrid, file_name: &str) -> Result<PathBuf>;
}

/// Raw export of an output grid
pub trait GridExporter: Send + Sync {
    fn export(&self, grid: &OutputGrid, file_name: &str) -> Result<PathBuf>;
}
