//! CML Temperature Map Library
//!
//! A Rust library for turning commercial microwave link (CML) measurements
//! into hourly near-surface air-temperature grids for a region.
//!
//! This library provides tools for:
//! - Enriching raw link measurements with site metadata, regional time and elevation
//! - Rejecting implausible readings with temporal, global and local anomaly tests
//! - Interpolating per-site predicted temperatures onto a masked grid via regression kriging
//! - Running the whole pipeline once per civil hour with per-round failure containment
//! - Persisting round results, rendering grid images and exporting grids to Parquet

pub mod config;
pub mod constants;

// Core application modules
pub mod app {
    pub mod context;
    pub mod models;
    pub mod services {
        pub mod anomaly_filter;
        pub mod enrichment;
        pub mod inference;
        pub mod interpolation;
        pub mod round;
    }
    pub mod adapters;
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{EnrichedRecord, Measurement, OutputGrid, PredictedRecord, SensorMetadata};
pub use config::PipelineConfig;

/// Result type alias for the temperature map pipeline
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for every pipeline stage and adapter
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Polars failed to read or write a table
    #[error("Table error: {message}")]
    Table {
        message: String,
        #[source]
        source: polars::error::PolarsError,
    },

    /// SQLite store error
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: rusqlite::Error,
    },

    /// JSON decoding error (configuration, boundaries, models)
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration error (unknown selector, bad value)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A column required by a pipeline stage is absent from the dataset
    #[error("Missing required column '{column}' for {stage}")]
    MissingColumn { column: String, stage: String },

    /// Coordinate, temperature and elevation arrays disagree in length
    #[error(
        "Dimension mismatch: lon={lon}, lat={lat}, temperature={temperature}, elevation={elevation}"
    )]
    DimensionMismatch {
        lon: usize,
        lat: usize,
        temperature: usize,
        elevation: usize,
    },

    /// Data validation error
    #[error("Data validation error: {message}")]
    DataValidation { message: String },

    /// Acquisition from the time-series store failed
    #[error("Acquisition error: {message}")]
    Acquisition { message: String },

    /// Temperature inference failed
    #[error("Inference error: {message}")]
    Inference { message: String },

    /// Grid rendering failed
    #[error("Render error: {message}")]
    Render { message: String },

    /// Date/time parsing error
    #[error("Date/time parsing error: {message}")]
    DateTimeParsing {
        message: String,
        #[source]
        source: chrono::ParseError,
    },

    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Processing interrupted
    #[error("Processing interrupted: {reason}")]
    ProcessingInterrupted { reason: String },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a table error with context
    pub fn table(message: impl Into<String>, source: polars::error::PolarsError) -> Self {
        Self::Table {
            message: message.into(),
            source,
        }
    }

    /// Create a database error with context
    pub fn database(message: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Database {
            message: message.into(),
            source,
        }
    }

    /// Create a JSON error with context
    pub fn json(message: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            message: message.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a missing column error
    pub fn missing_column(column: impl Into<String>, stage: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
            stage: stage.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(lon: usize, lat: usize, temperature: usize, elevation: usize) -> Self {
        Self::DimensionMismatch {
            lon,
            lat,
            temperature,
            elevation,
        }
    }

    /// Create a data validation error
    pub fn data_validation(message: impl Into<String>) -> Self {
        Self::DataValidation {
            message: message.into(),
        }
    }

    /// Create an acquisition error
    pub fn acquisition(message: impl Into<String>) -> Self {
        Self::Acquisition {
            message: message.into(),
        }
    }

    /// Create an inference error
    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference {
            message: message.into(),
        }
    }

    /// Create a render error
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    /// Create a date/time parsing error
    pub fn datetime_parsing(message: impl Into<String>, source: chrono::ParseError) -> Self {
        Self::DateTimeParsing {
            message: message.into(),
            source,
        }
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a processing interrupted error
    pub fn processing_interrupted(reason: impl Into<String>) -> Self {
        Self::ProcessingInterrupted {
            reason: reason.into(),
        }
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

impl From<polars::error::PolarsError> for Error {
    fn from(error: polars::error::PolarsError) -> Self {
        Self::Table {
            message: "Table operation failed".to_string(),
            source: error,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        Self::Database {
            message: "Database operation failed".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Json {
            message: "JSON decoding failed".to_string(),
            source: error,
        }
    }
}

impl From<chrono::ParseError> for Error {
    fn from(error: chrono::ParseError) -> Self {
        Self::DateTimeParsing {
            message: "Date/time parsing failed".to_string(),
            source: error,
        }
    }
}
