//! Terminal connector bar source.
//!
//! Talks to the connector's HTTP bridge:
//! `GET {base}/historical-data/{symbol}?timeframe=TF&count=N` answering
//! `{"data": [[time, open, high, low, close, tick_volume, spread, real_volume], ...]}`.
//! A 404 means the terminal has no bars for the request. There is no retry;
//! callers decide what to do with `SourceUnavailable`.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

use super::csv_source::parse_bar_time;
use super::provider::{BarSource, DataError};
use crate::domain::{Bar, Timeframe};

#[derive(Debug, Deserialize)]
struct HistoricalResponse {
    data: Vec<Vec<Value>>,
}

fn number(row: &[Value], idx: usize, what: &str) -> Result<f64, DataError> {
    row.get(idx)
        .and_then(Value::as_f64)
        .ok_or_else(|| DataError::ResponseFormatChanged(format!("missing or non-numeric {what}")))
}

/// Convert connector rows into bars. Row layout follows the terminal's
/// rates array; columns past `tick_volume` are ignored.
pub fn parse_rows(rows: &[Vec<Value>]) -> Result<Vec<Bar>, DataError> {
    rows.iter()
        .map(|row| {
            let timestamp = match row.first() {
                Some(Value::Number(n)) => n
                    .as_i64()
                    .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
                    .map(|dt| dt.naive_utc()),
                Some(Value::String(s)) => parse_bar_time(s),
                _ => None,
            }
            .ok_or_else(|| DataError::ResponseFormatChanged("missing or invalid time".into()))?;

            Ok(Bar {
                timestamp,
                open: number(row, 1, "open")?,
                high: number(row, 2, "high")?,
                low: number(row, 3, "low")?,
                close: number(row, 4, "close")?,
                volume: row.get(5).and_then(Value::as_f64).unwrap_or(0.0),
            })
        })
        .collect()
}

/// Blocking HTTP client for the terminal connector.
pub struct ConnectorBarSource {
    client: reqwest::blocking::Client,
    base_url: String,
    last_error: Mutex<Option<String>>,
}

impl ConnectorBarSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::SourceUnavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            last_error: Mutex::new(None),
        })
    }

    pub fn historical_url(&self, symbol: &str) -> String {
        format!("{}/historical-data/{symbol}", self.base_url)
    }

    fn request(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, DataError> {
        let count = count.to_string();
        let resp = self
            .client
            .get(self.historical_url(symbol))
            .query(&[("timeframe", timeframe.as_str()), ("count", count.as_str())])
            .send()
            .map_err(|e| DataError::SourceUnavailable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(DataError::SourceUnavailable(format!(
                "HTTP {status} for {symbol} {timeframe}"
            )));
        }

        let body: HistoricalResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;
        parse_rows(&body.data)
    }
}

impl BarSource for ConnectorBarSource {
    fn name(&self) -> &str {
        "connector"
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, DataError> {
        let result = self.request(symbol, timeframe, count);
        if let Err(e) = &result {
            warn!(symbol, timeframe = %timeframe, error = %e, "connector request failed");
            if let Ok(mut slot) = self.last_error.lock() {
                *slot = Some(e.to_string());
            }
        }
        result
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|slot| slot.clone())
    }
}
