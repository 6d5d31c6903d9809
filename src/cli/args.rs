//! Command-line argument definitions for the temperature map service
//!
//! The service runs a single long-lived command; every flag here overrides a
//! value from the JSON configuration file.

use crate::config::PipelineConfig;
use crate::{Error, Result};
use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the CML temperature map service
///
/// Turns commercial microwave link measurements into hourly temperature maps
/// for a region.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cml-temperature-map",
    version,
    about = "Produce hourly air-temperature maps from commercial microwave link data",
    long_about = "Runs one processing round immediately and then one per hour. Each round \
                  acquires link measurements, enriches them with site metadata, removes \
                  anomalies, predicts per-site temperatures and interpolates them onto a \
                  masked grid that is persisted, rendered and optionally exported."
)]
pub struct Args {
    /// Path to the JSON configuration file
    ///
    /// If not specified, looks for config.json under the user configuration
    /// directory and falls back to built-in defaults.
    #[arg(
        short = 'c',
        long = "config",
        env = "CML_CONFIG",
        value_name = "FILE",
        help = "Path to configuration file (JSON format)"
    )]
    pub config_file: Option<PathBuf>,

    /// Run a single round and exit
    #[arg(long = "once", help = "Run a single round and exit")]
    pub once: bool,

    /// Measurement export read by each round
    #[arg(
        long = "measurements",
        value_name = "FILE",
        help = "CSV or Parquet export of link measurements"
    )]
    pub measurements_path: Option<PathBuf>,

    /// SQLite database holding links and sites
    #[arg(
        long = "metadata-db",
        value_name = "FILE",
        help = "SQLite database with link and site metadata"
    )]
    pub metadata_db: Option<PathBuf>,

    /// Directory receiving rendered images
    #[arg(
        long = "image-dir",
        value_name = "PATH",
        help = "Directory for rendered temperature maps"
    )]
    pub image_dir: Option<PathBuf>,

    /// SQLite database receiving grid and parameters rows
    #[arg(
        long = "database",
        value_name = "FILE",
        help = "SQLite database for round results"
    )]
    pub database_path: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: debug, -vv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors and critical messages
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Args {
    /// Check that explicitly given paths exist
    pub fn validate(&self) -> Result<()> {
        if let Some(config_file) = &self.config_file {
            if !config_file.exists() {
                return Err(Error::configuration(format!(
                    "Config file does not exist: {}",
                    config_file.display()
                )));
            }
        }

        if let Some(metadata_db) = &self.metadata_db {
            if !metadata_db.is_file() {
                return Err(Error::configuration(format!(
                    "Metadata database does not exist: {}",
                    metadata_db.display()
                )));
            }
        }

        Ok(())
    }

    /// Determine the log level from the verbosity flags
    ///
    /// The service logs round summaries at info level, so that is the default.
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Apply the path and mode overrides to `config`
    pub fn apply_overrides(&self, mut config: PipelineConfig) -> PipelineConfig {
        if self.once {
            config = config.with_run_once();
        }
        if let Some(path) = &self.measurements_path {
            config = config.with_measurements_path(path.clone());
        }
        if let Some(path) = &self.metadata_db {
            config = config.with_metadata_db(path.clone());
        }
        if let Some(path) = &self.image_dir {
            config = config.with_image_dir(path.clone());
        }
        if let Some(path) = &self.database_path {
            config = config.with_database_path(path.clone());
        }
        config
    }
}
