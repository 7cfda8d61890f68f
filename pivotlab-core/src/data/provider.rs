//! Bar source and account source traits plus structured error types.
//!
//! The BarSource trait abstracts over where bars come from (terminal
//! connector, CSV exports, in-memory tables) so the pipeline can be driven
//! and tested without a live terminal.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{aggregate_positions, Bar, BarError, BarTable, PositionLot, PositionSummary, Timeframe};

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("data source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid bars: {0}")]
    InvalidBars(#[from] BarError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data error: {0}")]
    Other(String),
}

/// Anything that can hand out ordered bars for a (symbol, timeframe) pair.
pub trait BarSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Up to `count` most recent bars, oldest first.
    ///
    /// An empty vector means the source answered but has no bars.
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, DataError>;

    /// Text of the most recent failure, if the source keeps one.
    fn last_error(&self) -> Option<String> {
        None
    }
}

/// Open positions and order history as reported by the terminal.
pub trait AccountSource: Send + Sync {
    fn open_positions(&self, symbol: &str) -> Result<Vec<PositionLot>, DataError>;

    /// Number of orders in the history between `from` and `to`, inclusive.
    fn order_history_count(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<usize, DataError>;

    /// All open lots for `symbol` folded into one summary.
    fn open_position(&self, symbol: &str) -> Result<Option<PositionSummary>, DataError> {
        let lots = self.open_positions(symbol)?;
        Ok(aggregate_positions(symbol, &lots))
    }
}

/// Fetch bars and validate them into a table.
pub fn fetch_table(
    source: &dyn BarSource,
    symbol: &str,
    timeframe: Timeframe,
    count: usize,
) -> Result<BarTable, DataError> {
    if count == 0 {
        return Err(DataError::InvalidRequest("bar count must be positive".into()));
    }
    let bars = source.fetch_bars(symbol, timeframe, count)?;
    let table = BarTable::new(bars)?.tail(count);
    let suspect = table.bars().iter().filter(|b| !b.is_sane()).count();
    if suspect > 0 {
        warn!(symbol, suspect, "bars with inconsistent high/low/open/close");
    }
    debug!(
        source = source.name(),
        symbol,
        timeframe = %timeframe,
        requested = count,
        received = table.len(),
        "fetched bars"
    );
    Ok(table)
}

/// Percentage change between the last two daily closes.
///
/// `None` when fewer than two D1 bars exist.
pub fn daily_change(source: &dyn BarSource, symbol: &str) -> Result<Option<f64>, DataError> {
    let table = fetch_table(source, symbol, Timeframe::D1, 2)?;
    let bars = table.bars();
    if bars.len() < 2 {
        return Ok(None);
    }
    let previous = bars[bars.len() - 2].close;
    let current = bars[bars.len() - 1].close;
    Ok(Some((current - previous) / previous * 100.0))
}

/// In-memory bars, positions and order history.
#[derive(Debug, Default)]
pub struct MemorySource {
    bars: HashMap<(String, Timeframe), Vec<Bar>>,
    positions: Vec<PositionLot>,
    orders: Vec<NaiveDateTime>,
    last_error: Mutex<Option<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) -> Self {
        self.insert_bars(symbol, timeframe, bars);
        self
    }

    pub fn insert_bars(&mut self, symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) {
        self.bars.insert((symbol.to_string(), timeframe), bars);
    }

    pub fn with_position(mut self, lot: PositionLot) -> Self {
        self.positions.push(lot);
        self
    }

    pub fn with_order(mut self, time: NaiveDateTime) -> Self {
        self.orders.push(time);
        self
    }

    fn record(&self, err: &DataError) {
        if let Ok(mut slot) = self.last_error.lock() {
            *slot = Some(err.to_string());
        }
    }
}

impl BarSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, DataError> {
        match self.bars.get(&(symbol.to_string(), timeframe)) {
            Some(bars) => {
                let start = bars.len().saturating_sub(count);
                Ok(bars[start..].to_vec())
            }
            None => {
                let err = DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                };
                self.record(&err);
                Err(err)
            }
        }
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|slot| slot.clone())
    }
}

impl AccountSource for MemorySource {
    fn open_positions(&self, symbol: &str) -> Result<Vec<PositionLot>, DataError> {
        Ok(self
            .positions
            .iter()
            .filter(|lot| lot.symbol == symbol)
            .cloned()
            .collect())
    }

    fn order_history_count(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<usize, DataError> {
        if from > to {
            return Err(DataError::InvalidRequest(format!(
                "history range starts at {from} after it ends at {to}"
            )));
        }
        Ok(self.orders.iter().filter(|&&t| t >= from && t <= to).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            timestamp: ts(day),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100.0,
        }
    }

    fn lot(symbol: &str, volume: f64, price_open: f64, profit: f64) -> PositionLot {
        PositionLot {
            symbol: symbol.into(),
            volume,
            price_open,
            profit,
        }
    }

    #[test]
    fn fetch_returns_most_recent_bars() {
        let source = MemorySource::new().with_bars(
            "EURUSD",
            Timeframe::H1,
            vec![bar(1, 1.0), bar(2, 2.0), bar(3, 3.0)],
        );
        let table = fetch_table(&source, "EURUSD", Timeframe::H1, 2).unwrap();
        assert_eq!(table.closes(), vec![2.0, 3.0]);
    }

    #[test]
    fn unknown_symbol_sets_last_error() {
        let source = MemorySource::new();
        assert!(source.last_error().is_none());
        let err = fetch_table(&source, "XAUUSD", Timeframe::D1, 10).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
        assert!(source.last_error().unwrap().contains("XAUUSD"));
    }

    #[test]
    fn zero_count_is_rejected() {
        let source = MemorySource::new();
        assert!(matches!(
            fetch_table(&source, "EURUSD", Timeframe::D1, 0),
            Err(DataError::InvalidRequest(_))
        ));
    }

    #[test]
    fn out_of_order_bars_are_rejected() {
        let source =
            MemorySource::new().with_bars("EURUSD", Timeframe::D1, vec![bar(3, 1.0), bar(2, 1.0)]);
        assert!(matches!(
            fetch_table(&source, "EURUSD", Timeframe::D1, 5),
            Err(DataError::InvalidBars(_))
        ));
    }

    #[test]
    fn daily_change_uses_last_two_closes() {
        let source = MemorySource::new().with_bars(
            "EURUSD",
            Timeframe::D1,
            vec![bar(1, 90.0), bar(2, 100.0), bar(3, 105.0)],
        );
        let change = daily_change(&source, "EURUSD").unwrap().unwrap();
        assert!((change - 5.0).abs() < 1e-12);
    }

    #[test]
    fn daily_change_needs_two_bars() {
        let source = MemorySource::new().with_bars("EURUSD", Timeframe::D1, vec![bar(1, 90.0)]);
        assert_eq!(daily_change(&source, "EURUSD").unwrap(), None);
    }

    #[test]
    fn open_position_aggregates_lots_for_symbol() {
        let source = MemorySource::new()
            .with_position(lot("EURUSD", 1.0, 1.10, 5.0))
            .with_position(lot("EURUSD", 3.0, 1.20, -2.0))
            .with_position(lot("GBPUSD", 2.0, 1.30, 1.0));
        let summary = source.open_position("EURUSD").unwrap().unwrap();
        assert_eq!(summary.count, 2);
        assert!((summary.volume - 4.0).abs() < 1e-12);
        assert!((summary.price - 1.175).abs() < 1e-12);
        assert!((summary.profit - 3.0).abs() < 1e-12);
        assert!(source.open_position("USDJPY").unwrap().is_none());
    }

    #[test]
    fn order_history_counts_inclusive_range() {
        let source = MemorySource::new()
            .with_order(ts(1))
            .with_order(ts(5))
            .with_order(ts(9));
        assert_eq!(source.order_history_count(ts(1), ts(5)).unwrap(), 2);
        assert!(source.order_history_count(ts(9), ts(1)).is_err());
    }
}
