//! Bar and BarTable: the fundamental market data units.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for a single symbol over one sampling period.
///
/// `volume` is the tick volume reported by the terminal; it is carried for
/// completeness but no feature reads it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BarError {
    #[error("bar {index} at {timestamp} is not after the previous bar at {previous}")]
    NotIncreasing {
        index: usize,
        timestamp: NaiveDateTime,
        previous: NaiveDateTime,
    },

    #[error("bar {index} at {timestamp} has a non-finite or non-positive price")]
    InvalidPrice {
        index: usize,
        timestamp: NaiveDateTime,
    },
}

/// Ordered sequence of bars with strictly increasing timestamps.
///
/// Gaps (weekends, holidays) are allowed and never filled. Once built the
/// table is read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BarTable {
    bars: Vec<Bar>,
}

impl BarTable {
    /// Validate ordering and prices, then wrap the bars.
    pub fn new(bars: Vec<Bar>) -> Result<Self, BarError> {
        for (index, bar) in bars.iter().enumerate() {
            if bar.is_void() || bar.close <= 0.0 {
                return Err(BarError::InvalidPrice {
                    index,
                    timestamp: bar.timestamp,
                });
            }
            if index > 0 {
                let previous = bars[index - 1].timestamp;
                if bar.timestamp <= previous {
                    return Err(BarError::NotIncreasing {
                        index,
                        timestamp: bar.timestamp,
                        previous,
                    });
                }
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Keep only the most recent `count` bars.
    pub fn tail(&self, count: usize) -> BarTable {
        let start = self.bars.len().saturating_sub(count);
        BarTable {
            bars: self.bars[start..].to_vec(),
        }
    }
}
