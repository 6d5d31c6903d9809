//! Measurement acquisition from exported tables, with bounded retries

use super::MeasurementSource;
use super::table::{f64_column, has_column, read_table, str_column};
use crate::app::context::RoundContext;
use crate::app::models::Measurement;
use crate::constants::{MAX_RETRY_ATTEMPTS, RETRY_DELAY_MS, columns};
use crate::{Error, Result};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration as StdDuration;
use tracing::{debug, info, warn};

/// Bounded attempts with a fixed delay between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: StdDuration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRY_ATTEMPTS,
            delay: StdDuration::from_millis(RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: StdDuration::from_millis(delay_ms),
        }
    }
}

/// Fetch measurements, retrying failures per `policy`
///
/// Returns an empty vector once every attempt has failed, so the round sees
/// "no data" rather than an error.
pub fn acquire_with_retry(
    source: &dyn MeasurementSource,
    ctx: &RoundContext,
    policy: &RetryPolicy,
) -> Vec<Measurement> {
    for attempt in 1..=policy.max_attempts {
        match source.fetch(ctx) {
            Ok(measurements) => {
                info!("Acquired {} measurements", measurements.len());
                return measurements;
            }
            Err(e) => {
                warn!(
                    "Failed to acquire measurements (attempt {}/{}): {}",
                    attempt, policy.max_attempts, e
                );
                if attempt < policy.max_attempts {
                    thread::sleep(policy.delay);
                }
            }
        }
    }

    warn!(
        "Acquisition failed after {} attempts, continuing without data",
        policy.max_attempts
    );
    Vec::new()
}

/// Measurements exported as CSV or Parquet
///
/// Expected columns are `time` (RFC 3339 or `YYYY-MM-DD HH:MM:SS` in UTC),
/// `temperature`, `signal`, `sensor_id`, `daylight` and optionally `uptime`.
#[derive(Debug, Clone)]
pub struct TableMeasurementSource {
    path: PathBuf,
    window: Option<Duration>,
}

impl TableMeasurementSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            window: None,
        }
    }

    /// Keep only records within `window` before the round start
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every measurement in the table
    pub fn read_all(&self) -> Result<Vec<Measurement>> {
        let df = read_table(&self.path)?;

        for column in [
            columns::TIME,
            columns::TEMPERATURE,
            columns::SIGNAL,
            columns::SENSOR_ID,
            columns::DAYLIGHT,
        ] {
            if !has_column(&df, column) {
                return Err(Error::missing_column(column, "acquisition"));
            }
        }

        let times = str_column(&df, columns::TIME)?;
        let temperatures = f64_column(&df, columns::TEMPERATURE)?;
        let signals = f64_column(&df, columns::SIGNAL)?;
        let sensors = str_column(&df, columns::SENSOR_ID)?;
        let daylight = f64_column(&df, columns::DAYLIGHT)?;
        let uptimes = if has_column(&df, columns::UPTIME) {
            f64_column(&df, columns::UPTIME)?
        } else {
            vec![None; df.height()]
        };

        let mut measurements = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            let (Some(time), Some(sensor_id)) = (&times[row], &sensors[row]) else {
                debug!("Skipping row {} without time or sensor id", row);
                continue;
            };
            measurements.push(Measurement {
                sensor_id: sensor_id.trim().to_string(),
                time: parse_time(time)?,
                temperature: temperatures[row],
                signal: signals[row],
                uptime: uptimes[row],
                daylight: daylight[row].map(|value| value != 0.0),
            });
        }

        Ok(measurements)
    }
}

impl MeasurementSource for TableMeasurementSource {
    fn fetch(&self, ctx: &RoundContext) -> Result<Vec<Measurement>> {
        let measurements = self.read_all()?;
        let Some(window) = self.window else {
            return Ok(measurements);
        };

        let end = ctx.started;
        let start = end - window;
        let total = measurements.len();
        let kept: Vec<Measurement> = measurements
            .into_iter()
            .filter(|m| m.time > start && m.time <= end)
            .collect();
        debug!(
            "Kept {} of {} measurements between {} and {}",
            kept.len(),
            total,
            start,
            end
        );
        Ok(kept)
    }
}

/// Parse an RFC 3339 timestamp, or a naive one taken as UTC
pub fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Ok(time.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::datetime_parsing(format!("Invalid measurement time '{}'", value), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::Prague;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, rows: &[&str]) -> PathBuf {
        let path = dir.path().join("measurements.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "time,temperature,signal,uptime,sensor_id,daylight").unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        path
    }

    fn create_test_context() -> RoundContext {
        RoundContext::starting_at(1, Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap(), Prague)
    }

    struct FlakySource {
        failures: usize,
        calls: AtomicUsize,
    }

    impl MeasurementSource for FlakySource {
        fn fetch(&self, _ctx: &RoundContext) -> Result<Vec<Measurement>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(Error::acquisition("store unavailable"))
            } else {
                Ok(vec![Measurement::new(
                    "10.0.0.1",
                    Utc.with_ymd_and_hms(2024, 7, 1, 11, 55, 0).unwrap(),
                    30.0,
                    -45.0,
                    None,
                    true,
                )])
            }
        }
    }

    #[test]
    fn test_read_csv_measurements() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            &[
                "2024-07-01T11:05:00Z,31.5,-47.2,1000,10.0.0.1 ,1",
                "2024-07-01 11:10:00,31.0,-47.0,,10.0.0.2,0",
            ],
        );

        let measurements = TableMeasurementSource::new(path).read_all().unwrap();
        assert_eq!(measurements.len(), 2);
        assert_eq!(measurements[0].sensor_id, "10.0.0.1");
        assert_eq!(measurements[0].uptime, Some(1000.0));
        assert_eq!(measurements[0].daylight, Some(true));
        assert_eq!(measurements[1].uptime, None);
        assert_eq!(measurements[1].daylight, Some(false));
        assert_eq!(
            measurements[1].time,
            Utc.with_ymd_and_hms(2024, 7, 1, 11, 10, 0).unwrap()
        );
    }

    #[test]
    fn test_window_filter() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            &[
                "2024-07-01T10:30:00Z,31.5,-47.2,1000,10.0.0.1,1",
                "2024-07-01T11:30:00Z,31.0,-47.0,1300,10.0.0.1,1",
                "2024-07-01T12:30:00Z,31.0,-47.0,1600,10.0.0.1,1",
            ],
        );

        let source = TableMeasurementSource::new(path).with_window(Duration::hours(1));
        let measurements = source.fetch(&create_test_context()).unwrap();
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].uptime, Some(1300.0));
    }

    #[test]
    fn test_missing_column_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("measurements.csv");
        std::fs::write(&path, "time,temperature\n2024-07-01T11:05:00Z,30\n").unwrap();

        let result = TableMeasurementSource::new(path).read_all();
        assert!(matches!(result, Err(Error::MissingColumn { .. })));
    }

    #[test]
    fn test_retry_recovers_from_transient_failure() {
        let source = FlakySource {
            failures: 2,
            calls: AtomicUsize::new(0),
        };
        let policy = RetryPolicy::new(3, 0);

        let measurements = acquire_with_retry(&source, &create_test_context(), &policy);
        assert_eq!(measurements.len(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_retry_exhaustion_returns_empty() {
        let source = FlakySource {
            failures: usize::MAX,
            calls: AtomicUsize::new(0),
        };
        let policy = RetryPolicy::new(3, 0);

        let measurements = acquire_with_retry(&source, &create_test_context(), &policy);
        assert!(measurements.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_parse_time_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap();
        assert_eq!(parse_time("2024-07-01T11:00:00+02:00").unwrap(), expected);
        assert_eq!(parse_time("2024-07-01 09:00:00").unwrap(), expected);
        assert!(parse_time("yesterday").is_err());
    }
}
