//! Configuration management and validation.
//!
//! Provides the pipeline configuration loaded from a JSON file, its defaults
//! and the up-front validation of every string selector.

use crate::app::services::anomaly_filter::CombineMode;
use crate::app::services::interpolation::{RegressionKind, VariogramModel};
use crate::constants::*;
use crate::{Error, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Thresholds of the anomaly filter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Global z-score threshold
    pub z_threshold: f64,

    /// Local residual threshold in degrees Celsius
    pub residual_threshold: f64,

    /// Neighbours required before the local test applies
    pub min_neighbors: usize,

    /// Neighbour search radius in kilometres
    pub radius_km: f64,

    /// `union` or `intersection`
    pub combine_mode: String,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            z_threshold: DEFAULT_Z_THRESHOLD,
            residual_threshold: DEFAULT_RESIDUAL_THRESHOLD,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            radius_km: DEFAULT_RADIUS_KM,
            combine_mode: "union".to_string(),
        }
    }
}

/// Grid and regression-kriging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    /// Cells per grid axis
    pub grid_resolution: usize,

    /// Variogram family name
    pub variogram_model: String,

    /// Closest samples in each local kriging system
    pub n_closest: usize,

    /// Trend regression name
    pub regression_model: String,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            grid_resolution: DEFAULT_GRID_RESOLUTION,
            variogram_model: DEFAULT_VARIOGRAM_MODEL.to_string(),
            n_closest: DEFAULT_N_CLOSEST,
            regression_model: DEFAULT_REGRESSION_MODEL.to_string(),
        }
    }
}

/// Round scheduling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// IANA zone records are normalised to
    pub timezone: String,

    /// Run a single round and exit
    pub run_once: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            run_once: false,
        }
    }
}

/// Retry behaviour of the measurement source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub max_attempts: usize,
    pub retry_delay_ms: u64,

    /// Keep only measurements this many minutes before the round start
    pub window_minutes: Option<i64>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRY_ATTEMPTS,
            retry_delay_ms: RETRY_DELAY_MS,
            window_minutes: Some(DEFAULT_WINDOW_MINUTES),
        }
    }
}

/// Locations of the round inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    /// CSV or Parquet export of the time-series store
    pub measurements_path: PathBuf,

    /// SQLite database with `links` and `sites`
    pub metadata_db: PathBuf,

    /// Long-format elevation raster (lon, lat, elevation)
    pub elevation_path: Option<PathBuf>,

    /// GeoJSON region boundary
    pub boundary_path: PathBuf,

    /// JSON parameters of the inference model
    pub model_path: PathBuf,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            measurements_path: PathBuf::from("data/measurements.csv"),
            metadata_db: PathBuf::from("data/metadata.sqlite"),
            elevation_path: Some(PathBuf::from("data/elevation.parquet")),
            boundary_path: PathBuf::from("data/region.geojson"),
            model_path: PathBuf::from("data/model.json"),
        }
    }
}

/// Output stores and image access
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// SQLite result store
    pub database_path: PathBuf,

    /// Directory receiving rendered images
    pub image_dir: PathBuf,

    /// Directory receiving Parquet grid exports, disabled when unset
    pub grid_export_dir: Option<PathBuf>,

    /// Base URL recorded with each parameters row
    pub image_base_url: Option<String>,

    pub retention_seconds: i64,
    pub timestep_seconds: i64,

    /// Extensions the image access policy serves
    pub allowed_extensions: Vec<String>,

    /// Only caller permitted to fetch images
    pub allowed_caller: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("output/results.sqlite"),
            image_dir: PathBuf::from("images"),
            grid_export_dir: None,
            image_base_url: None,
            retention_seconds: DEFAULT_RETENTION_SECONDS,
            timestep_seconds: DEFAULT_TIMESTEP_SECONDS,
            allowed_extensions: vec![IMAGE_EXTENSION.to_string()],
            allowed_caller: None,
        }
    }
}

/// Main configuration for the temperature map pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub anomaly: AnomalyConfig,
    pub interpolation: InterpolationConfig,
    pub schedule: ScheduleConfig,
    pub acquisition: AcquisitionConfig,
    pub inputs: InputsConfig,
    pub output: OutputConfig,
}

/// Selectors parsed from a validated configuration
#[derive(Debug, Clone, Copy)]
pub struct ResolvedSelectors {
    pub combine_mode: CombineMode,
    pub regression: RegressionKind,
    pub variogram: VariogramModel,
    pub timezone: Tz,
}

impl PipelineConfig {
    /// Load configuration from a JSON file, falling back to defaults for absent keys
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::file_not_found(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("Failed to read config {}", path.display()), e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::json(format!("Invalid config {}", path.display()), e))?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse every selector and check numeric ranges
    pub fn validate(&self) -> Result<ResolvedSelectors> {
        let combine_mode: CombineMode = self.anomaly.combine_mode.parse()?;
        let regression: RegressionKind = self.interpolation.regression_model.parse()?;
        let variogram: VariogramModel = self.interpolation.variogram_model.parse()?;
        let timezone = self.timezone()?;

        if self.interpolation.grid_resolution < 2 {
            return Err(Error::configuration(format!(
                "grid_resolution must be at least 2, got {}",
                self.interpolation.grid_resolution
            )));
        }
        if self.interpolation.n_closest == 0 {
            return Err(Error::configuration("n_closest must be positive"));
        }
        if self.anomaly.radius_km.is_nan() || self.anomaly.radius_km <= 0.0 {
            return Err(Error::configuration(format!(
                "radius_km must be positive, got {}",
                self.anomaly.radius_km
            )));
        }
        if self.acquisition.max_attempts == 0 {
            return Err(Error::configuration("max_attempts must be positive"));
        }
        if self.acquisition.window_minutes.is_some_and(|minutes| minutes <= 0) {
            return Err(Error::configuration("window_minutes must be positive"));
        }
        self.allowed_caller()?;

        debug!(
            "Configuration valid: combine={:?} regression={:?} variogram={:?} tz={}",
            combine_mode, regression, variogram, timezone
        );

        Ok(ResolvedSelectors {
            combine_mode,
            regression,
            variogram,
            timezone,
        })
    }

    /// Parse the configured time zone
    pub fn timezone(&self) -> Result<Tz> {
        self.schedule.timezone.parse::<Tz>().map_err(|_| {
            Error::configuration(format!("Unknown time zone '{}'", self.schedule.timezone))
        })
    }

    /// Parse the permitted caller address
    pub fn allowed_caller(&self) -> Result<Option<IpAddr>> {
        self.output
            .allowed_caller
            .as_deref()
            .map(|raw| {
                raw.parse::<IpAddr>().map_err(|_| {
                    Error::configuration(format!("Invalid allowed_caller address '{}'", raw))
                })
            })
            .transpose()
    }

    /// Set the combine mode of the anomaly filter
    pub fn with_combine_mode(mut self, mode: impl Into<String>) -> Self {
        self.anomaly.combine_mode = mode.into();
        self
    }

    /// Set the trend regression
    pub fn with_regression_model(mut self, model: impl Into<String>) -> Self {
        self.interpolation.regression_model = model.into();
        self
    }

    /// Set the variogram family
    pub fn with_variogram_model(mut self, model: impl Into<String>) -> Self {
        self.interpolation.variogram_model = model.into();
        self
    }

    /// Set grid cells per axis
    pub fn with_grid_resolution(mut self, resolution: usize) -> Self {
        self.interpolation.grid_resolution = resolution;
        self
    }

    /// Set the regional time zone
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.schedule.timezone = timezone.into();
        self
    }

    /// Run one round and exit
    pub fn with_run_once(mut self) -> Self {
        self.schedule.run_once = true;
        self
    }

    /// Set the measurement export path
    pub fn with_measurements_path(mut self, path: PathBuf) -> Self {
        self.inputs.measurements_path = path;
        self
    }

    /// Set the metadata database path
    pub fn with_metadata_db(mut self, path: PathBuf) -> Self {
        self.inputs.metadata_db = path;
        self
    }

    /// Set the image output directory
    pub fn with_image_dir(mut self, path: PathBuf) -> Self {
        self.output.image_dir = path;
        self
    }

    /// Set the result database path
    pub fn with_database_path(mut self, path: PathBuf) -> Self {
        self.output.database_path = path;
        self
    }

    /// Set the retry policy of the measurement source
    pub fn with_retry(mut self, max_attempts: usize, retry_delay_ms: u64) -> Self {
        self.acquisition.max_attempts = max_attempts;
        self.acquisition.retry_delay_ms = retry_delay_ms;
        self
    }
}
