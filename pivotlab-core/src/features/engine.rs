//! The feature engine: bar table in, feature table out.
//!
//! One implementation serves both training and live prediction. All
//! indicators are computed once over the whole bar series, then rows
//! before `WARMUP_BARS` and rows holding any non-finite value are dropped.

use tracing::{debug, warn};

use super::schema::{
    EMA_FAST_PERIOD, EMA_SLOW_PERIOD, FEATURE_COLUMNS, MACD_FAST_PERIOD, MACD_SIGNAL_PERIOD,
    MACD_SLOW_PERIOD, RSI_PERIOD, WARMUP_BARS,
};
use super::table::{FeatureRow, FeatureTable};
use crate::domain::BarTable;
use crate::indicators::{Ema, Indicator, Macd, Rsi, WeeklyPivot};

/// 1.0 when the fast average is at or above the slow one, else 0.0.
///
/// NaN when either input is NaN.
pub fn crossover_flag(fast: f64, slow: f64) -> f64 {
    if fast.is_nan() || slow.is_nan() {
        f64::NAN
    } else if fast >= slow {
        1.0
    } else {
        0.0
    }
}

/// Fixed indicator set behind every feature column.
#[derive(Debug, Clone)]
pub struct FeatureEngine {
    pivot: WeeklyPivot,
    ema_fast: Ema,
    ema_slow: Ema,
    rsi: Rsi,
    macd: Macd,
}

impl Default for FeatureEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureEngine {
    pub fn new() -> Self {
        Self {
            pivot: WeeklyPivot::new(),
            ema_fast: Ema::new(EMA_FAST_PERIOD),
            ema_slow: Ema::new(EMA_SLOW_PERIOD),
            rsi: Rsi::new(RSI_PERIOD),
            macd: Macd::main(MACD_FAST_PERIOD, MACD_SLOW_PERIOD, MACD_SIGNAL_PERIOD),
        }
    }

    /// Column names in output order.
    pub fn columns(&self) -> Vec<String> {
        FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect()
    }

    /// Longest look-back across the indicator set.
    pub fn max_lookback(&self) -> usize {
        let signal = Macd::signal(MACD_FAST_PERIOD, MACD_SLOW_PERIOD, MACD_SIGNAL_PERIOD);
        [
            self.pivot.lookback(),
            self.ema_fast.lookback(),
            self.ema_slow.lookback(),
            self.rsi.lookback(),
            self.macd.lookback(),
            signal.lookback(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// Compute every feature column for `table`.
    ///
    /// A table shorter than `WARMUP_BARS` yields an empty feature table.
    pub fn compute(&self, table: &BarTable) -> FeatureTable {
        let bars = table.bars();
        let n = bars.len();
        let columns = self.columns();

        if n < WARMUP_BARS {
            warn!(
                bars = n,
                warmup = WARMUP_BARS,
                "not enough bars to complete warm-up; feature table is empty"
            );
            return FeatureTable::empty(columns);
        }

        let pivot = self.pivot.compute(bars);
        let ema_fast = self.ema_fast.compute(bars);
        let ema_slow = self.ema_slow.compute(bars);
        let rsi = self.rsi.compute(bars);
        let macd = self.macd.compute_all(bars);

        let mut rows = Vec::with_capacity(n - WARMUP_BARS);
        let mut incomplete = 0usize;

        for (i, bar) in bars.iter().enumerate().skip(WARMUP_BARS) {
            let close = bar.close;
            let pp = pivot[i];
            let values = vec![
                pp,
                (close - pp) / pp,
                ema_fast[i],
                ema_slow[i],
                close - ema_fast[i],
                crossover_flag(ema_fast[i], ema_slow[i]),
                rsi[i],
                macd.main[i],
                macd.signal[i],
                macd.histogram[i],
            ];
            debug_assert_eq!(values.len(), columns.len());

            if values.iter().all(|v| v.is_finite()) {
                rows.push(FeatureRow {
                    timestamp: bar.timestamp,
                    close,
                    values,
                });
            } else {
                incomplete += 1;
            }
        }

        if incomplete > 0 {
            debug!(
                dropped = incomplete,
                "dropped rows with missing values after warm-up"
            );
        }
        debug!(
            bars = n,
            rows = rows.len(),
            warmup = WARMUP_BARS,
            "computed feature table"
        );

        FeatureTable::new(columns, rows)
    }
}

/// Run the shared feature engine over a bar table.
pub fn compute_features(table: &BarTable) -> FeatureTable {
    FeatureEngine::new().compute(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn drift_table(n: usize) -> BarTable {
        let closes: Vec<f64> = (0..n)
            .map(|t| 100.0 * 1.004f64.powi(t as i32) * (1.0 + 0.002 * (t as f64).sin()))
            .collect();
        BarTable::new(make_bars(&closes)).unwrap()
    }

    #[test]
    fn lookback_matches_published_warmup() {
        assert_eq!(FeatureEngine::new().max_lookback(), WARMUP_BARS);
    }

    #[test]
    fn short_table_gives_empty_features() {
        let table = drift_table(WARMUP_BARS - 1);
        let features = compute_features(&table);
        assert!(features.is_empty());
        assert_eq!(features.columns().len(), FEATURE_COLUMNS.len());
    }

    #[test]
    fn empty_table_gives_empty_features() {
        assert!(compute_features(&BarTable::default()).is_empty());
    }

    #[test]
    fn rows_start_after_warmup() {
        let table = drift_table(120);
        let features = compute_features(&table);

        assert_eq!(features.len(), 120 - WARMUP_BARS);
        assert_eq!(
            features.rows()[0].timestamp,
            table.bars()[WARMUP_BARS].timestamp
        );
        assert!(features
            .rows()
            .iter()
            .all(|r| r.values.iter().all(|v| v.is_finite())));
    }

    #[test]
    fn derived_columns_are_consistent() {
        let features = compute_features(&drift_table(120));
        let idx = |name: &str| features.column_index(name).unwrap();

        for row in features.rows() {
            let pp = row.values[idx("pp_weekly")];
            let ema20 = row.values[idx("ema_20")];
            let ema50 = row.values[idx("ema_50")];
            assert!((row.values[idx("dist_pp")] - (row.close - pp) / pp).abs() < 1e-12);
            assert!((row.values[idx("ema20_diff")] - (row.close - ema20)).abs() < 1e-12);
            assert_eq!(row.values[idx("ema_cross")], crossover_flag(ema20, ema50));
            let rsi = row.values[idx("rsi_14")];
            assert!((0.0..=100.0).contains(&rsi));
            let hist = row.values[idx("macd_hist_12_26_9")];
            let main = row.values[idx("macd_12_26_9")];
            let signal = row.values[idx("macd_signal_12_26_9")];
            assert!((hist - (main - signal)).abs() < 1e-12);
        }
    }

    #[test]
    fn compute_is_deterministic() {
        let table = drift_table(200);
        assert_eq!(compute_features(&table), compute_features(&table));
    }

    #[test]
    fn crossover_tie_counts_as_above() {
        assert_eq!(crossover_flag(101.5, 101.5), 1.0);
        assert_eq!(crossover_flag(101.6, 101.5), 1.0);
        assert_eq!(crossover_flag(101.4, 101.5), 0.0);
        assert!(crossover_flag(f64::NAN, 1.0).is_nan());
    }

    #[test]
    fn flat_closes_mark_every_row_as_crossed() {
        let table = BarTable::new(make_bars(&[100.0; 120])).unwrap();
        let features = compute_features(&table);
        assert_eq!(features.len(), 120 - WARMUP_BARS);

        let idx = |name: &str| features.column_index(name).unwrap();
        for row in features.rows() {
            assert_eq!(row.values[idx("ema_20")], row.values[idx("ema_50")]);
            assert_eq!(row.values[idx("ema_cross")], 1.0);
        }
    }

    #[test]
    fn upward_drift_sets_fast_above_slow() {
        let features = compute_features(&drift_table(200));
        let last = features.last().unwrap();
        let cross = last.values[features.column_index("ema_cross").unwrap()];
        assert_eq!(cross, 1.0);
    }
}
