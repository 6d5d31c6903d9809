//! Sensor metadata from the link inventory database

use super::MetadataStore;
use crate::app::models::SensorMetadata;
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS sites (
        id INTEGER PRIMARY KEY,
        x REAL,
        y REAL
    );
    CREATE TABLE IF NOT EXISTS links (
        id INTEGER PRIMARY KEY,
        site_a INTEGER,
        site_b INTEGER,
        azimuth_a REAL,
        azimuth_b REAL,
        ip_a TEXT,
        ip_b TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_links_ip_a ON links(ip_a);
    CREATE INDEX IF NOT EXISTS idx_links_ip_b ON links(ip_b);
";

/// One row of the `links` table
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRow {
    pub id: i64,
    pub site_a: i64,
    pub site_b: i64,
    pub azimuth_a: f64,
    pub azimuth_b: f64,
    pub ip_a: String,
    pub ip_b: String,
}

/// Link inventory in SQLite
///
/// A sensor id is the management address of one link endpoint; it selects
/// the side (A or B) whose azimuth and site apply. Site `x` is longitude and
/// `y` latitude.
#[derive(Debug)]
pub struct SqliteMetadataStore {
    conn: Mutex<Connection>,
}

impl SqliteMetadataStore {
    /// Open the inventory at `path`, creating missing tables
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            Error::database(format!("Failed to open metadata store {}", path.display()), e)
        })?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::database("Failed to open in-memory metadata store", e))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::database("Failed to create metadata schema", e))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::data_validation("Metadata store connection lock poisoned"))
    }

    pub fn insert_site(&self, id: i64, x: f64, y: f64) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO sites (id, x, y) VALUES (?1, ?2, ?3)",
                params![id, x, y],
            )
            .map_err(|e| Error::database(format!("Failed to insert site {}", id), e))?;
        Ok(())
    }

    pub fn insert_link(&self, link: &LinkRow) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO links (id, site_a, site_b, azimuth_a, azimuth_b, ip_a, ip_b)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    link.id,
                    link.site_a,
                    link.site_b,
                    link.azimuth_a,
                    link.azimuth_b,
                    link.ip_a,
                    link.ip_b
                ],
            )
            .map_err(|e| Error::database(format!("Failed to insert link {}", link.id), e))?;
        Ok(())
    }

    /// Metadata of one sensor, [`SensorMetadata::missing`] when not in the inventory
    fn lookup_one(conn: &Connection, sensor_id: &str) -> rusqlite::Result<SensorMetadata> {
        let link = conn
            .query_row(
                "SELECT id, site_a, site_b, azimuth_a, azimuth_b, ip_a, ip_b
                 FROM links WHERE ip_a = ?1 OR ip_b = ?1",
                params![sensor_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<i64>>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                        row.get::<_, Option<f64>>(3)?,
                        row.get::<_, Option<f64>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, Option<String>>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((link_id, site_a, site_b, azimuth_a, azimuth_b, ip_a, ip_b)) = link else {
            return Ok(SensorMetadata::missing());
        };

        let (azimuth, site_id) = if ip_a.as_deref().map(str::trim) == Some(sensor_id) {
            (azimuth_a, site_a)
        } else if ip_b.as_deref().map(str::trim) == Some(sensor_id) {
            (azimuth_b, site_b)
        } else {
            warn!("Azimuth and site cannot be assigned for sensor {}", sensor_id);
            (None, None)
        };

        let coordinates = match site_id {
            Some(site_id) => conn
                .query_row(
                    "SELECT x, y FROM sites WHERE id = ?1",
                    params![site_id],
                    |row| Ok((row.get::<_, Option<f64>>(0)?, row.get::<_, Option<f64>>(1)?)),
                )
                .optional()?,
            None => None,
        };
        if coordinates.is_none() && site_id.is_some() {
            warn!("No coordinates found for site {:?}", site_id);
        }
        let (longitude, latitude) = coordinates.unwrap_or((None, None));

        Ok(SensorMetadata {
            link_id: Some(link_id),
            site_id,
            azimuth,
            latitude,
            longitude,
        })
    }
}

impl MetadataStore for SqliteMetadataStore {
    fn lookup(&self, sensor_ids: &[String]) -> Result<HashMap<String, SensorMetadata>> {
        let conn = self.conn()?;
        let mut metadata = HashMap::with_capacity(sensor_ids.len());
        let mut found = 0;

        for sensor_id in sensor_ids {
            if metadata.contains_key(sensor_id) {
                continue;
            }
            let entry = match Self::lookup_one(&conn, sensor_id.trim()) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Metadata lookup failed for sensor {}: {}", sensor_id, e);
                    SensorMetadata::missing()
                }
            };
            if entry.link_id.is_some() {
                found += 1;
            } else {
                debug!("No link found for sensor {}", sensor_id);
            }
            metadata.insert(sensor_id.clone(), entry);
        }

        info!("Metadata resolved for {} of {} sensors", found, metadata.len());
        Ok(metadata)
    }
}
