//! Command implementation for the temperature map service
//!
//! Loads configuration and start-up geodata, opens the stores, wires the
//! round orchestrator and hands it to the hourly scheduler.

use crate::app::adapters::{
    GridExporter, ImageAccessPolicy, ParquetGridExporter, PngGridRenderer, SqliteMetadataStore,
    SqliteResultStore, TableMeasurementSource, load_elevation_grid, load_region_boundary,
};
use crate::app::services::inference::ScaledLinearModel;
use crate::app::services::round::{RoundOrchestrator, RoundServices, Scheduler, SchedulerStats};
use crate::cli::args::Args;
use crate::config::PipelineConfig;
use anyhow::{Context, Result};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Run the service until cancelled, or for one round with `--once`
pub async fn run(args: Args, token: CancellationToken) -> Result<SchedulerStats> {
    setup_logging(&args)?;
    args.validate()?;

    let config = load_configuration(&args)?;
    let selectors = config.validate().context("Invalid configuration")?;

    print_banner(&config);
    check_image_access(&config)?;

    let orchestrator = build_orchestrator(&config)?;
    let scheduler = Scheduler::new(Arc::new(orchestrator), selectors.timezone, token)
        .with_run_once(config.schedule.run_once);

    let started = Instant::now();
    let stats = scheduler.run().await?;
    print_summary(&stats, started);

    Ok(stats)
}

/// Set up logging based on verbosity flags
fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cml_temperature_map={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cml-temperature-map").join("config.json"))
}

/// Load the configuration file (explicit, then default location) and apply CLI overrides
fn load_configuration(args: &Args) -> Result<PipelineConfig> {
    let config_file = args
        .config_file
        .clone()
        .or_else(|| default_config_path().filter(|path| path.exists()));

    let config = match &config_file {
        Some(path) => {
            info!("Using config file: {}", path.display());
            PipelineConfig::load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => {
            info!("No config file found, using defaults");
            PipelineConfig::default()
        }
    };

    Ok(args.apply_overrides(config))
}

fn check_image_access(config: &PipelineConfig) -> Result<()> {
    let policy = ImageAccessPolicy::from_config(config)?;
    if config.output.allowed_caller.is_none() {
        warn!(
            "No allowed_caller configured, images in {} will not be served to anyone",
            policy.image_dir().display()
        );
    }
    Ok(())
}

/// Load geodata, open stores and load the model
fn build_orchestrator(config: &PipelineConfig) -> Result<RoundOrchestrator> {
    let elevation_path = config
        .inputs
        .elevation_path
        .as_ref()
        .context("An elevation raster is required for interpolation (inputs.elevation_path)")?;
    let elevation = load_elevation_grid(elevation_path)
        .with_context(|| format!("Failed to load elevation from {}", elevation_path.display()))?;
    let boundary = load_region_boundary(&config.inputs.boundary_path).with_context(|| {
        format!(
            "Failed to load region boundary from {}",
            config.inputs.boundary_path.display()
        )
    })?;

    let metadata = SqliteMetadataStore::open(&config.inputs.metadata_db)?;
    let model = ScaledLinearModel::load(&config.inputs.model_path).with_context(|| {
        format!("Failed to load model from {}", config.inputs.model_path.display())
    })?;

    if let Some(parent) = config.output.database_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let results = SqliteResultStore::open(&config.output.database_path)?;

    let mut source = TableMeasurementSource::new(config.inputs.measurements_path.clone());
    if let Some(minutes) = config.acquisition.window_minutes {
        source = source.with_window(chrono::Duration::minutes(minutes));
    }

    let services = RoundServices {
        source: Box::new(source),
        metadata: Box::new(metadata),
        model: Box::new(model),
        results: Some(Box::new(results)),
        renderer: Some(Box::new(PngGridRenderer::new(config.output.image_dir.clone()))),
        exporter: config
            .output
            .grid_export_dir
            .clone()
            .map(|dir| Box::new(ParquetGridExporter::new(dir)) as Box<dyn GridExporter>),
    };

    let orchestrator =
        RoundOrchestrator::new(config, services, Arc::new(elevation), Arc::new(boundary))?;
    Ok(orchestrator)
}

fn print_banner(config: &PipelineConfig) {
    println!("{}", "CML temperature map service".bright_green().bold());
    println!(
        "  Measurements: {}",
        config.inputs.measurements_path.display().to_string().bright_white()
    );
    println!(
        "  Grid: {}x{} cells, {} regression, {} variogram",
        config.interpolation.grid_resolution,
        config.interpolation.grid_resolution,
        config.interpolation.regression_model.bright_white().bold(),
        config.interpolation.variogram_model.bright_white().bold()
    );
    println!(
        "  Anomaly filter: {} mode, z > {}, residual > {} °C",
        config.anomaly.combine_mode.bright_white().bold(),
        config.anomaly.z_threshold,
        config.anomaly.residual_threshold
    );
    println!(
        "  Images: {}",
        config.output.image_dir.display().to_string().bright_white()
    );
}

fn print_summary(stats: &SchedulerStats, started: Instant) {
    println!("\n{}", "Service Summary".bright_green().bold());
    println!(
        "  Rounds: {} ({} completed, {} without data, {} failed)",
        stats.rounds.to_string().bright_white().bold(),
        stats.completed.to_string().bright_white().bold(),
        stats.no_data,
        if stats.failed > 0 {
            stats.failed.to_string().bright_red().bold()
        } else {
            stats.failed.to_string().normal()
        }
    );
    println!("  Uptime: {:.1}s", started.elapsed().as_secs_f64());
}
