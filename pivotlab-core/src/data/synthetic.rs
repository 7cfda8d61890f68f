//! Synthetic bars for offline development.
//!
//! A seeded random walk with a configurable drift. The seed is derived from
//! the symbol name, so the same symbol always produces the same bars.
//! Weekend timestamps are skipped for every timeframe below W1.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::provider::{BarSource, DataError};
use crate::domain::{Bar, Timeframe};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Timestamp of the first bar.
    pub start: NaiveDateTime,
    pub start_price: f64,
    /// Mean return per bar.
    pub drift: f64,
    /// Half-width of the uniform per-bar return noise.
    pub volatility: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2020, 1, 6)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
            start_price: 100.0,
            drift: 0.0003,
            volatility: 0.01,
        }
    }
}

fn is_weekend(ts: NaiveDateTime) -> bool {
    matches!(ts.weekday(), Weekday::Sat | Weekday::Sun)
}

/// `count` bars for `symbol`, oldest first.
pub fn synthetic_bars(
    symbol: &str,
    timeframe: Timeframe,
    count: usize,
    config: &SyntheticConfig,
) -> Vec<Bar> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let step = chrono::Duration::minutes(i64::from(timeframe.minutes()));
    let skip_weekends = timeframe.minutes() < Timeframe::W1.minutes();

    let mut bars = Vec::with_capacity(count);
    let mut price = config.start_price;
    let mut current = config.start;

    while bars.len() < count {
        if skip_weekends && is_weekend(current) {
            current += step;
            continue;
        }

        let noise = if config.volatility > 0.0 {
            rng.gen_range(-config.volatility..config.volatility)
        } else {
            0.0
        };
        let open = price;
        let close = (price * (1.0 + config.drift + noise)).max(f64::MIN_POSITIVE);
        let wick = config.volatility.max(0.0) * 0.5;
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..=wick));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..=wick));
        let volume = rng.gen_range(100..10_000u32) as f64;

        bars.push(Bar {
            timestamp: current,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        current += step;
    }

    bars
}

/// Bar source that generates bars on demand.
#[derive(Debug, Clone, Default)]
pub struct SyntheticBarSource {
    config: SyntheticConfig,
}

impl SyntheticBarSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self { config }
    }
}

impl BarSource for SyntheticBarSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, DataError> {
        Ok(synthetic_bars(symbol, timeframe, count, &self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BarTable;

    #[test]
    fn same_symbol_same_bars() {
        let config = SyntheticConfig::default();
        let a = synthetic_bars("EURUSD", Timeframe::D1, 50, &config);
        let b = synthetic_bars("EURUSD", Timeframe::D1, 50, &config);
        assert_eq!(a, b);
        let c = synthetic_bars("GBPUSD", Timeframe::D1, 50, &config);
        assert_ne!(a, c);
    }

    #[test]
    fn daily_bars_skip_weekends() {
        let bars = synthetic_bars("EURUSD", Timeframe::D1, 30, &SyntheticConfig::default());
        assert_eq!(bars.len(), 30);
        assert!(bars.iter().all(|b| !is_weekend(b.timestamp)));
    }

    #[test]
    fn bars_form_a_valid_table() {
        let bars = synthetic_bars("XAUUSD", Timeframe::H1, 500, &SyntheticConfig::default());
        assert!(bars.iter().all(|b| b.is_sane()));
        assert!(BarTable::new(bars).is_ok());
    }

    #[test]
    fn zero_volatility_follows_drift() {
        let config = SyntheticConfig {
            drift: 0.01,
            volatility: 0.0,
            ..SyntheticConfig::default()
        };
        let bars = synthetic_bars("EURUSD", Timeframe::D1, 3, &config);
        assert!((bars[2].close - 100.0 * 1.01f64.powi(3)).abs() < 1e-9);
    }
}
