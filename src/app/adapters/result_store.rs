//! Persistence of round results in SQLite

use super::ResultStore;
use crate::app::models::OutputGrid;
use crate::config::OutputConfig;
use crate::{Error, Result};
use chrono::NaiveDateTime;
use rusqlite::{Connection, ErrorCode, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS realtime_temperature_grids (
        time TEXT PRIMARY KEY,
        links TEXT NOT NULL,
        image_name TEXT NOT NULL,
        temp_min INTEGER NOT NULL,
        temp_max INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS realtime_temperature_parameters (
        started TEXT NOT NULL,
        retention INTEGER NOT NULL,
        timestep INTEGER NOT NULL,
        x_min REAL NOT NULL,
        x_max REAL NOT NULL,
        y_min REAL NOT NULL,
        y_max REAL NOT NULL,
        x_count INTEGER NOT NULL,
        y_count INTEGER NOT NULL,
        images_url TEXT
    );
";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Round `value` to `decimals` places, ties to even
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Grid row: hour, contributing links, image and temperature span
#[derive(Debug, Clone, PartialEq)]
pub struct GridRecord {
    pub time: NaiveDateTime,
    pub links: Vec<i64>,
    pub image_name: String,
    pub temp_min: i64,
    pub temp_max: i64,
}

impl GridRecord {
    /// Build the row for `grid`, rounding its temperature span to integers
    ///
    /// # Errors
    ///
    /// `DataValidation` when the grid has no finite cell.
    pub fn new(
        time: NaiveDateTime,
        links: Vec<i64>,
        image_name: impl Into<String>,
        grid: &OutputGrid,
    ) -> Result<Self> {
        let (min, max) = grid
            .temperature_range()
            .ok_or_else(|| Error::data_validation("Output grid has no finite temperature"))?;
        Ok(Self {
            time,
            links,
            image_name: image_name.into(),
            temp_min: min.round_ties_even() as i64,
            temp_max: max.round_ties_even() as i64,
        })
    }
}

/// Parameters row describing the grid geometry and refresh policy
#[derive(Debug, Clone, PartialEq)]
pub struct ParametersRecord {
    pub started: NaiveDateTime,
    pub retention: i64,
    pub timestep: i64,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub x_count: usize,
    pub y_count: usize,
    pub images_url: Option<String>,
}

impl ParametersRecord {
    /// Build the row for a round started at `started` (regional time)
    pub fn new(started: NaiveDateTime, grid: &OutputGrid, output: &OutputConfig) -> Result<Self> {
        let (x_min, x_max, y_min, y_max) = grid
            .bounds()
            .ok_or_else(|| Error::data_validation("Output grid has no coordinates"))?;
        let (x_count, y_count) = grid.shape();
        Ok(Self {
            started,
            retention: output.retention_seconds,
            timestep: output.timestep_seconds,
            x_min: round_to(x_min, 4),
            x_max: round_to(x_max, 4),
            y_min: round_to(y_min, 4),
            y_max: round_to(y_max, 4),
            x_count,
            y_count,
            images_url: output.image_base_url.clone(),
        })
    }
}

/// Result tables in SQLite, one transaction per row
#[derive(Debug)]
pub struct SqliteResultStore {
    conn: Mutex<Connection>,
}

impl SqliteResultStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            Error::database(format!("Failed to open result store {}", path.display()), e)
        })?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::database("Failed to open in-memory result store", e))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::database("Failed to create result schema", e))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::data_validation("Result store connection lock poisoned"))
    }

    /// Number of rows in the grid table
    pub fn grid_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM realtime_temperature_grids", [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }

    /// Number of rows in the parameters table
    pub fn parameters_count(&self) -> Result<usize> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM realtime_temperature_parameters",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Stored grid row for `time`, if any
    pub fn grid_at(&self, time: NaiveDateTime) -> Result<Option<GridRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT time, links, image_name, temp_min, temp_max
             FROM realtime_temperature_grids WHERE time = ?1",
        )?;
        let mut rows = stmt.query(params![time.format(TIME_FORMAT).to_string()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let time: String = row.get(0)?;
        let links: String = row.get(1)?;
        Ok(Some(GridRecord {
            time: NaiveDateTime::parse_from_str(&time, TIME_FORMAT)?,
            links: serde_json::from_str(&links)?,
            image_name: row.get(2)?,
            temp_min: row.get(3)?,
            temp_max: row.get(4)?,
        }))
    }
}

fn is_constraint_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}

impl ResultStore for SqliteResultStore {
    fn write_grid(&self, record: &GridRecord) -> Result<()> {
        let links = serde_json::to_string(&record.links)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO realtime_temperature_grids (time, links, image_name, temp_min, temp_max)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.time.format(TIME_FORMAT).to_string(),
                links,
                record.image_name,
                record.temp_min,
                record.temp_max
            ],
        );

        match inserted {
            Ok(_) => {
                tx.commit()?;
                info!("Interpolation data from {} successfully recorded", record.time);
                Ok(())
            }
            Err(e) if is_constraint_violation(&e) => {
                // Dropping the transaction rolls it back
                warn!("Duplicate grid entry for {}: {}", record.time, e);
                Ok(())
            }
            Err(e) => Err(Error::database(
                format!("Failed to record grid for {}", record.time),
                e,
            )),
        }
    }

    fn write_parameters(&self, record: &ParametersRecord) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO realtime_temperature_parameters
             (started, retention, timestep, x_min, x_max, y_min, y_max, x_count, y_count, images_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.started.format(TIME_FORMAT).to_string(),
                record.retention,
                record.timestep,
                record.x_min,
                record.x_max,
                record.y_min,
                record.y_max,
                record.x_count as i64,
                record.y_count as i64,
                record.images_url
            ],
        )
        .map_err(|e| Error::database(format!("Failed to record parameters for {}", record.started), e))?;
        tx.commit()?;

        info!("Parameters data for {} successfully recorded", record.started);
        Ok(())
    }
}
