//! Tabular file access shared by the file-backed adapters
//!
//! CSV and Parquet files are scanned lazily with polars and collected into a
//! `DataFrame`; typed column accessors turn columns into plain vectors.

use crate::{Error, Result};
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

/// Supported on-disk table formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    /// Detect the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("csv") => Ok(Self::Csv),
            Some("parquet") | Some("pq") => Ok(Self::Parquet),
            _ => Err(Error::configuration(format!(
                "Unsupported table format for {}",
                path.display()
            ))),
        }
    }
}

/// Read a whole CSV or Parquet file into memory
pub fn read_table(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(Error::file_not_found(path.display().to_string()));
    }

    let frame = match TableFormat::from_path(path)? {
        TableFormat::Csv => LazyCsvReader::new(path)
            .with_has_header(true)
            .finish()
            .map_err(|e| Error::table(format!("Failed to scan {}", path.display()), e))?,
        TableFormat::Parquet => LazyFrame::scan_parquet(path, ScanArgsParquet::default())
            .map_err(|e| Error::table(format!("Failed to scan {}", path.display()), e))?,
    };

    let df = frame
        .collect()
        .map_err(|e| Error::table(format!("Failed to read {}", path.display()), e))?;

    debug!("Read {} rows from {}", df.height(), path.display());
    Ok(df)
}

/// Check whether a frame carries a column
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|column| column.as_str() == name)
}

/// Extract a column as nullable floats, casting numeric and boolean types
pub fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(name)
        .map_err(|e| Error::table(format!("Missing column '{}'", name), e))?
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(|e| Error::table(format!("Column '{}' is not numeric", name), e))?;

    let values = series
        .f64()
        .map_err(|e| Error::table(format!("Column '{}' is not numeric", name), e))?
        .into_iter()
        .map(|value| value.filter(|v| !v.is_nan()))
        .collect();
    Ok(values)
}

/// Extract a column as nullable strings
pub fn str_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(name)
        .map_err(|e| Error::table(format!("Missing column '{}'", name), e))?
        .as_materialized_series()
        .cast(&DataType::String)
        .map_err(|e| Error::table(format!("Column '{}' is not text", name), e))?;

    let values = series
        .str()
        .map_err(|e| Error::table(format!("Column '{}' is not text", name), e))?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            TableFormat::from_path(Path::new("a/b.CSV")).unwrap(),
            TableFormat::Csv
        );
        assert_eq!(
            TableFormat::from_path(Path::new("x.parquet")).unwrap(),
            TableFormat::Parquet
        );
        assert!(TableFormat::from_path(Path::new("x.tif")).is_err());
    }

    #[test]
    fn test_read_csv_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("values.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "name,value").unwrap();
        writeln!(file, "a,1.5").unwrap();
        writeln!(file, "b,").unwrap();
        writeln!(file, "c,3").unwrap();
        drop(file);

        let df = read_table(&path).unwrap();
        assert!(has_column(&df, "value"));
        assert!(!has_column(&df, "other"));

        let values = f64_column(&df, "value").unwrap();
        assert_eq!(values, vec![Some(1.5), None, Some(3.0)]);

        let names = str_column(&df, "name").unwrap();
        assert_eq!(names[0].as_deref(), Some("a"));
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_table(Path::new("/nonexistent/values.csv"));
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
    }
}
