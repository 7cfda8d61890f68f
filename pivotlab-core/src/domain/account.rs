//! Open-position aggregation for account reporting.
//!
//! The terminal reports one entry per open lot; callers usually want a single
//! net view per symbol.

use serde::{Deserialize, Serialize};

/// One open position lot as reported by the terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionLot {
    pub symbol: String,
    pub volume: f64,
    pub price_open: f64,
    pub profit: f64,
}

/// Aggregated view of all open lots for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSummary {
    pub symbol: String,
    pub volume: f64,
    /// Volume-weighted average entry price.
    pub price: f64,
    pub profit: f64,
    pub count: usize,
}

/// Fold the lots into one summary. `None` when there is nothing open.
pub fn aggregate_positions(symbol: &str, lots: &[PositionLot]) -> Option<PositionSummary> {
    if lots.is_empty() {
        return None;
    }

    let mut volume = 0.0;
    let mut profit = 0.0;
    let mut weighted_price = 0.0;
    for lot in lots {
        volume += lot.volume;
        profit += lot.profit;
        weighted_price += lot.price_open * lot.volume;
    }

    if volume == 0.0 {
        return None;
    }

    Some(PositionSummary {
        symbol: symbol.to_string(),
        volume,
        price: weighted_price / volume,
        profit,
        count: lots.len(),
    })
}
