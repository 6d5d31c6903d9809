//! Start-up loaders for the elevation raster and the region boundary

use super::table::{f64_column, has_column, read_table};
use crate::app::services::enrichment::ElevationGrid;
use crate::app::services::interpolation::RegionBoundary;
use crate::constants::{ELEVATION_NODATA, columns};
use crate::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Load an elevation raster exported in long format
///
/// The table holds one row per raster node with `lon`, `lat` and `elevation`
/// columns. Null elevations are treated as nodata.
pub fn load_elevation_grid(path: &Path) -> Result<ElevationGrid> {
    let df = read_table(path)?;
    for column in [columns::RASTER_LON, columns::RASTER_LAT, columns::RASTER_ELEVATION] {
        if !has_column(&df, column) {
            return Err(Error::missing_column(column, "elevation loading"));
        }
    }

    let lons = f64_column(&df, columns::RASTER_LON)?;
    let lats = f64_column(&df, columns::RASTER_LAT)?;
    let elevations = f64_column(&df, columns::RASTER_ELEVATION)?;

    let points: Vec<(f64, f64, f64)> = lons
        .iter()
        .zip(&lats)
        .zip(&elevations)
        .filter_map(|((lon, lat), elevation)| {
            Some(((*lon)?, (*lat)?, elevation.unwrap_or(ELEVATION_NODATA)))
        })
        .collect();

    let grid = ElevationGrid::from_points(&points)?;
    info!(
        "Elevation raster loaded from {}: {}x{} nodes",
        path.display(),
        grid.lons().len(),
        grid.lats().len()
    );
    Ok(grid)
}

/// Load the region boundary from a GeoJSON file
pub fn load_region_boundary(path: &Path) -> Result<RegionBoundary> {
    if !path.exists() {
        return Err(Error::file_not_found(path.display().to_string()));
    }
    let content = fs::read_to_string(path)
        .map_err(|e| Error::io(format!("Failed to read boundary {}", path.display()), e))?;
    let boundary = RegionBoundary::from_geojson_str(&content)?;

    info!(
        "Region boundary loaded from {} with {} polygons",
        path.display(),
        boundary.polygon_count()
    );
    Ok(boundary)
}
