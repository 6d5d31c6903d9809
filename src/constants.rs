//! Application constants for the CML temperature map pipeline
//!
//! This module contains default thresholds, grid settings, store constants
//! and column names used throughout the pipeline.

// =============================================================================
// Anomaly Detection Defaults
// =============================================================================

/// Global z-score threshold for temperature (and the elevation exemption)
pub const DEFAULT_Z_THRESHOLD: f64 = 2.0;

/// Absolute residual against the local neighbour mean, in degrees Celsius
pub const DEFAULT_RESIDUAL_THRESHOLD: f64 = 6.0;

/// Minimum neighbours required before the local test may flag a record
pub const DEFAULT_MIN_NEIGHBORS: usize = 5;

/// Neighbour search radius in kilometres
pub const DEFAULT_RADIUS_KM: f64 = 20.0;

/// Flat-earth conversion used by the local test (kilometres per degree)
pub const KM_PER_DEGREE: f64 = 111.0;

// =============================================================================
// Interpolation Defaults
// =============================================================================

/// Grid cells per axis
pub const DEFAULT_GRID_RESOLUTION: usize = 500;

/// Closest samples used by the moving-window kriging system
pub const DEFAULT_N_CLOSEST: usize = 40;

/// Default variogram family
pub const DEFAULT_VARIOGRAM_MODEL: &str = "spherical";

/// Default trend regression
pub const DEFAULT_REGRESSION_MODEL: &str = "linear";

/// Number of lag bins in the experimental semivariogram
pub const VARIOGRAM_LAG_BINS: usize = 6;

/// Seed shared by the stochastic trend models
pub const REGRESSION_RANDOM_SEED: u64 = 42;

/// Missing-value sentinel written to exterior grid cells
pub const MISSING_VALUE: f64 = f64::NAN;

/// Nodata marker used by the elevation raster export
pub const ELEVATION_NODATA: f64 = -3.402_823_466_385_288_6e38;

// =============================================================================
// Schedule and Output Defaults
// =============================================================================

/// Regional civil time zone records are normalised to
pub const DEFAULT_TIMEZONE: &str = "Europe/Prague";

/// Retention window advertised with each grid, in seconds
pub const DEFAULT_RETENTION_SECONDS: i64 = 43_200;

/// Refresh interval advertised with each grid, in seconds
pub const DEFAULT_TIMESTEP_SECONDS: i64 = 1_800;

/// Image name format derived from the ceiled round time
pub const IMAGE_NAME_FORMAT: &str = "%Y-%m-%d_%H%M";

/// Extension of rendered grid images
pub const IMAGE_EXTENSION: &str = "png";

/// Timestamp format used in round start/end log lines
pub const ROUND_LOG_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Retry constants for transient acquisition errors
pub const MAX_RETRY_ATTEMPTS: usize = 3;
pub const RETRY_DELAY_MS: u64 = 2_000;

/// Acquisition window ending at the round start
pub const DEFAULT_WINDOW_MINUTES: i64 = 60;

// =============================================================================
// Column Name Constants
// =============================================================================

/// Column names of the acquisition export
pub mod columns {
    pub const TIME: &str = "time";
    pub const TEMPERATURE: &str = "temperature";
    pub const SIGNAL: &str = "signal";
    pub const UPTIME: &str = "uptime";
    pub const SENSOR_ID: &str = "sensor_id";
    pub const DAYLIGHT: &str = "daylight";

    // Derived and attached columns referenced in stage errors
    pub const ELEVATION: &str = "elevation";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";

    // Elevation raster export
    pub const RASTER_LON: &str = "lon";
    pub const RASTER_LAT: &str = "lat";
    pub const RASTER_ELEVATION: &str = "elevation";
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Convert a search radius in kilometres to degrees
pub fn radius_km_to_degrees(radius_km: f64) -> f64 {
    radius_km / KM_PER_DEGREE
}

/// Get the image file name for a formatted round hour
pub fn get_image_filename(hour_label: &str) -> String {
    format!("{}.{}", hour_label, IMAGE_EXTENSION)
}

/// Get the grid export file name for a formatted round hour
pub fn get_grid_export_filename(hour_label: &str) -> String {
    format!("{}.parquet", hour_label)
}
