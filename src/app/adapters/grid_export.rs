//! Parquet export of output grids for offline analysis

use super::GridExporter;
use crate::app::models::OutputGrid;
use crate::{Error, Result};
use polars::prelude::{ParquetCompression, ParquetWriter as PolarsParquetWriter, StatisticsOptions};
use std::fs::{self, File};
use std::path::PathBuf;
use tracing::info;

/// Writes one row per grid cell with `x`, `y` and `temperature` columns
///
/// Exterior cells are kept with a null temperature so the file reproduces the
/// full mesh.
#[derive(Debug, Clone)]
pub struct ParquetGridExporter {
    output_dir: PathBuf,
    compression: ParquetCompression,
}

impl ParquetGridExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            compression: ParquetCompression::Snappy,
        }
    }

    pub fn with_compression(mut self, compression: ParquetCompression) -> Self {
        self.compression = compression;
        self
    }
}

impl GridExporter for ParquetGridExporter {
    fn export(&self, grid: &OutputGrid, file_name: &str) -> Result<PathBuf> {
        let xs: Vec<f64> = grid.grid_x.iter().copied().collect();
        let ys: Vec<f64> = grid.grid_y.iter().copied().collect();
        let temperatures: Vec<Option<f64>> = grid
            .temperature
            .iter()
            .map(|value| value.is_finite().then_some(*value))
            .collect();

        let mut frame = polars::df!(
            "x" => xs,
            "y" => ys,
            "temperature" => temperatures
        )
        .map_err(|e| Error::table("Failed to assemble grid frame", e))?;

        fs::create_dir_all(&self.output_dir).map_err(|e| {
            Error::io(
                format!("Failed to create export directory {}", self.output_dir.display()),
                e,
            )
        })?;
        let path = self.output_dir.join(file_name);
        let file = File::create(&path)
            .map_err(|e| Error::io(format!("Failed to create {}", path.display()), e))?;

        PolarsParquetWriter::new(file)
            .with_compression(self.compression)
            .with_statistics(StatisticsOptions::full())
            .finish(&mut frame)
            .map_err(|e| Error::table(format!("Failed to write {}", path.display()), e))?;

        info!("Grid exported to {} ({} cells)", path.display(), frame.height());
        Ok(path)
    }
}
