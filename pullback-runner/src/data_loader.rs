//! Bar loading from CSV files.
//!
//! The engine needs, per (symbol, cadence), an OHLCV series sorted ascending
//! with no duplicate timestamps. This module reads such series from
//! `timestamp,open,high,low,close,volume` CSV files and enforces that
//! contract before anything reaches the calculator. Fetching the data is
//! someone else's job.
//!
//! Per-symbol files in a data directory follow `<SYMBOL>_1d.csv` (daily) and
//! `<SYMBOL>_4h.csv` (intraday).

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use pullback_core::domain::{validate_series, BarError};
use pullback_core::Bar;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} row {row}: unrecognised timestamp '{value}'")]
    Timestamp {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error("{path}: {source}")]
    Series {
        path: PathBuf,
        #[source]
        source: BarError,
    },
}

#[derive(Debug, Deserialize)]
struct CsvBar {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

/// Read one series from a CSV file with a header row.
pub fn load_bars_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let mut bars = Vec::new();
    for (row, record) in reader.deserialize::<CsvBar>().enumerate() {
        let record = record.map_err(csv_err)?;
        let timestamp =
            parse_timestamp(&record.timestamp).ok_or_else(|| LoadError::Timestamp {
                path: path.to_path_buf(),
                row: row + 1,
                value: record.timestamp.clone(),
            })?;
        bars.push(Bar {
            timestamp,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }

    validate_series(&bars).map_err(|source| LoadError::Series {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bars = bars.len(), "loaded bars");
    Ok(bars)
}

/// Daily and intraday file paths for `symbol` inside `dir`.
pub fn symbol_paths(dir: &Path, symbol: &str) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("{symbol}_1d.csv")),
        dir.join(format!("{symbol}_4h.csv")),
    )
}

/// Load the (daily, intraday) pair for `symbol` from `dir`.
pub fn load_symbol(dir: &Path, symbol: &str) -> Result<(Vec<Bar>, Vec<Bar>), LoadError> {
    let (daily_path, intraday_path) = symbol_paths(dir, symbol);
    Ok((load_bars_csv(&daily_path)?, load_bars_csv(&intraday_path)?))
}

/// Parse `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` or RFC 3339 (converted to UTC).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(ts);
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.naive_utc())
}

/// Deterministic BLAKE3 hash over a series, for tagging reports with the
/// exact data they were computed on.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.timestamp.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
