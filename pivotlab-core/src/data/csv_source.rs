//! CSV bar source.
//!
//! Reads terminal history exports laid out as `{dir}/{SYMBOL}_{TF}.csv` with
//! the terminal's column names: `time, open, high, low, close, tick_volume`
//! (`spread` and `real_volume` are accepted and ignored). `time` is either
//! unix seconds or `YYYY-MM-DD HH:MM:SS`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::provider::{BarSource, DataError};
use crate::domain::{Bar, Timeframe};

#[derive(Debug, Deserialize)]
struct CsvRow {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    tick_volume: f64,
}

/// Parse a bar time: unix seconds, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`.
pub fn parse_bar_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Bars from CSV exports in one directory.
#[derive(Debug)]
pub struct CsvBarSource {
    dir: PathBuf,
    last_error: Mutex<Option<String>>,
}

impl CsvBarSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last_error: Mutex::new(None),
        }
    }

    pub fn path_for(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.dir.join(format!("{symbol}_{timeframe}.csv"))
    }

    fn read_file(path: &Path) -> Result<Vec<Bar>, DataError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| match e.into_kind() {
            csv::ErrorKind::Io(io) => DataError::Io(io),
            other => DataError::Other(format!("{other:?}")),
        })?;

        let mut bars = Vec::new();
        for (line, record) in reader.deserialize::<CsvRow>().enumerate() {
            let row = record.map_err(|e| {
                DataError::ResponseFormatChanged(format!(
                    "{}: row {}: {e}",
                    path.display(),
                    line + 1
                ))
            })?;
            let timestamp = parse_bar_time(&row.time).ok_or_else(|| {
                DataError::ResponseFormatChanged(format!(
                    "{}: row {}: unrecognised time '{}'",
                    path.display(),
                    line + 1,
                    row.time
                ))
            })?;
            bars.push(Bar {
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.tick_volume,
            });
        }
        Ok(bars)
    }

    fn record(&self, err: &DataError) {
        if let Ok(mut slot) = self.last_error.lock() {
            *slot = Some(err.to_string());
        }
    }
}

impl BarSource for CsvBarSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(symbol, timeframe);
        let result = if path.exists() {
            Self::read_file(&path).map(|bars| {
                let start = bars.len().saturating_sub(count);
                bars[start..].to_vec()
            })
        } else {
            Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
        };
        if let Err(e) = &result {
            self.record(e);
        }
        result
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|slot| slot.clone())
    }
}
