//! One processing round from acquisition to rendered map

use super::summary::RoundSummary;
use crate::app::adapters::{
    GridExporter, GridRecord, GridRenderer, MeasurementSource, MetadataStore, ParametersRecord,
    ResultStore, RetryPolicy, acquire_with_retry,
};
use crate::app::context::RoundContext;
use crate::app::models::OutputGrid;
use crate::app::services::anomaly_filter::{AnomalyFilter, AnomalySummary};
use crate::app::services::enrichment::{DataEnricher, ElevationGrid, EnrichmentStats};
use crate::app::services::inference::{TemperatureModel, predict_dataset};
use crate::app::services::interpolation::{RegionBoundary, SpatialInterpolator};
use crate::config::{OutputConfig, PipelineConfig};
use crate::{Error, Result};
use chrono::Timelike;
use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use sysinfo::System;
use tracing::{error, info, warn};

/// Pipeline stage a round was in when it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Acquisition,
    Metadata,
    Enrichment,
    Filtering,
    Inference,
    Interpolation,
    Persistence,
    Rendering,
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Acquisition => "acquisition",
            Self::Metadata => "metadata",
            Self::Enrichment => "enrichment",
            Self::Filtering => "filtering",
            Self::Inference => "inference",
            Self::Interpolation => "interpolation",
            Self::Persistence => "persistence",
            Self::Rendering => "rendering",
            Self::Export => "export",
        };
        f.write_str(name)
    }
}

/// What a completed round produced
#[derive(Debug, Clone)]
pub struct RoundReport {
    pub summary: RoundSummary,
    pub enrichment: EnrichmentStats,
    pub anomaly: AnomalySummary,
    /// Sites with a predicted temperature
    pub sites: usize,
    /// Grid cells holding a finite temperature
    pub grid_cells: usize,
    pub persisted: bool,
    pub image: Option<PathBuf>,
    pub export: Option<PathBuf>,
}

/// Result of one round as seen by the scheduler
#[derive(Debug, Clone)]
pub enum RoundOutcome {
    Completed(Box<RoundReport>),
    /// Nothing left to map after `stage`; not a failure
    NoData { stage: Stage },
    Failed { stage: Stage, message: String },
    Panicked { message: String },
}

impl RoundOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// External collaborators of a round
pub struct RoundServices {
    pub source: Box<dyn MeasurementSource>,
    pub metadata: Box<dyn MetadataStore>,
    pub model: Box<dyn TemperatureModel>,
    pub results: Option<Box<dyn ResultStore>>,
    pub renderer: Option<Box<dyn GridRenderer>>,
    pub exporter: Option<Box<dyn GridExporter>>,
}

struct StageError {
    stage: Stage,
    error: Error,
}

trait StageContext<T> {
    fn during(self, stage: Stage) -> std::result::Result<T, StageError>;
}

impl<T> StageContext<T> for Result<T> {
    fn during(self, stage: Stage) -> std::result::Result<T, StageError> {
        self.map_err(|error| StageError { stage, error })
    }
}

/// Runs rounds against fixed geodata and services
pub struct RoundOrchestrator {
    enricher: DataEnricher,
    filter: AnomalyFilter,
    interpolator: SpatialInterpolator,
    boundary: Arc<RegionBoundary>,
    elevation: Arc<ElevationGrid>,
    retry: RetryPolicy,
    output: OutputConfig,
    services: RoundServices,
}

impl RoundOrchestrator {
    /// Build the orchestrator, resolving every configured selector
    ///
    /// # Errors
    ///
    /// `Configuration` for an unknown combine mode, regression model,
    /// variogram model or time zone.
    pub fn new(
        config: &PipelineConfig,
        services: RoundServices,
        elevation: Arc<ElevationGrid>,
        boundary: Arc<RegionBoundary>,
    ) -> Result<Self> {
        let selectors = config.validate()?;

        Ok(Self {
            enricher: DataEnricher::new(selectors.timezone).with_elevation(Arc::clone(&elevation)),
            filter: AnomalyFilter::from_config(&config.anomaly)?,
            interpolator: SpatialInterpolator::from_config(&config.interpolation)?,
            boundary,
            elevation,
            retry: RetryPolicy::new(config.acquisition.max_attempts, config.acquisition.retry_delay_ms),
            output: config.output.clone(),
            services,
        })
    }

    /// Run one round, containing failures and panics
    pub fn run(&self, ctx: &RoundContext) -> RoundOutcome {
        let _entered = ctx.span().enter();
        info!("Calculation started on {}", ctx.started_label());

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.execute(ctx))) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(StageError { stage, error })) => {
                log_failure(stage, &error);
                RoundOutcome::Failed {
                    stage,
                    message: error.to_string(),
                }
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(panic = %message, "Round panicked and was abandoned");
                RoundOutcome::Panicked { message }
            }
        };

        log_memory();
        info!(
            "Calculation ended on {}. Waiting for another round",
            chrono::Utc::now()
                .with_timezone(&ctx.timezone)
                .format(crate::constants::ROUND_LOG_FORMAT)
        );
        outcome
    }

    fn execute(&self, ctx: &RoundContext) -> std::result::Result<RoundOutcome, StageError> {
        let measurements = acquire_with_retry(self.services.source.as_ref(), ctx, &self.retry);
        if measurements.is_empty() {
            warn!("No measurements acquired, skipping round");
            return Ok(RoundOutcome::NoData {
                stage: Stage::Acquisition,
            });
        }

        let mut sensor_ids: Vec<String> = measurements.iter().map(|m| m.sensor_id.clone()).collect();
        sensor_ids.sort();
        sensor_ids.dedup();
        let metadata = match self.services.metadata.lookup(&sensor_ids) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(stage = %Stage::Metadata, "Metadata lookup failed, sensors lack geolocation: {}", e);
                Default::default()
            }
        };

        let (dataset, enrichment) = self
            .enricher
            .enrich(measurements, &metadata)
            .during(Stage::Enrichment)?;
        let Some(summary) = RoundSummary::collect(&dataset) else {
            warn!("No measurement could be enriched, skipping round");
            return Ok(RoundOutcome::NoData {
                stage: Stage::Enrichment,
            });
        };

        let (dataset, anomaly) = self.filter.filter(dataset).during(Stage::Filtering)?;
        if dataset.is_empty() {
            warn!("Every record was filtered out, skipping round");
            return Ok(RoundOutcome::NoData {
                stage: Stage::Filtering,
            });
        }

        let predictions =
            predict_dataset(self.services.model.as_ref(), &dataset).during(Stage::Inference)?;
        drop(dataset);

        let grid = self
            .interpolator
            .interpolate(&predictions, &self.boundary, &self.elevation)
            .during(Stage::Interpolation)?;

        let persisted = self.persist(ctx, &summary, &grid);
        let image = self.render(&summary, &grid);
        let export = self.export(&summary, &grid);

        info!(
            links = summary.link_ids.len(),
            image = %summary.image_name,
            "Round completed"
        );

        Ok(RoundOutcome::Completed(Box::new(RoundReport {
            sites: predictions.len(),
            grid_cells: grid.finite_cells(),
            summary,
            enrichment,
            anomaly,
            persisted,
            image,
            export,
        })))
    }

    /// Write the grid and parameters rows; each failure is logged on its own
    fn persist(&self, ctx: &RoundContext, summary: &RoundSummary, grid: &OutputGrid) -> bool {
        let Some(store) = &self.services.results else {
            return false;
        };

        let grid_written = GridRecord::new(
            summary.image_time,
            summary.link_ids.clone(),
            summary.image_name.clone(),
            grid,
        )
        .and_then(|record| store.write_grid(&record));
        if let Err(e) = &grid_written {
            log_failure(Stage::Persistence, e);
        }

        let started = ctx.started_local();
        let started = started
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(started);
        let parameters_written = ParametersRecord::new(started, grid, &self.output)
            .and_then(|record| store.write_parameters(&record));
        if let Err(e) = &parameters_written {
            log_failure(Stage::Persistence, e);
        }

        grid_written.is_ok() && parameters_written.is_ok()
    }

    fn render(&self, summary: &RoundSummary, grid: &OutputGrid) -> Option<PathBuf> {
        let renderer = self.services.renderer.as_ref()?;
        renderer
            .render(grid, &summary.image_name)
            .inspect_err(|e| log_failure(Stage::Rendering, e))
            .ok()
    }

    fn export(&self, summary: &RoundSummary, grid: &OutputGrid) -> Option<PathBuf> {
        let exporter = self.services.exporter.as_ref()?;
        exporter
            .export(grid, &summary.export_name())
            .inspect_err(|e| log_failure(Stage::Export, e))
            .ok()
    }
}

/// Log an error with its source chain and a backtrace
fn log_failure(stage: Stage, error: &Error) {
    let mut causes = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }

    error!(
        stage = %stage,
        error = %error,
        causes = ?causes,
        "Error during data processing round\n{}",
        Backtrace::capture()
    );
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn log_memory() {
    let mut system = System::new();
    system.refresh_memory();
    info!(
        used_mib = system.used_memory() / (1024 * 1024),
        total_mib = system.total_memory() / (1024 * 1024),
        "Round resources released"
    );
}
