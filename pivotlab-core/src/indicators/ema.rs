//! Exponential moving average of closes, or of any derived series.
//!
//! alpha = 2 / (period + 1). The first value is the simple mean of the first
//! `period` finite inputs; after that each value folds in one new input.
//! Lookback: period - 1.

use super::Indicator;
use crate::domain::Bar;

/// Running EMA over a stream of values.
#[derive(Debug, Clone)]
struct Smoother {
    period: usize,
    alpha: f64,
    seed_sum: f64,
    seen: usize,
    value: Option<f64>,
}

impl Smoother {
    fn new(period: usize) -> Self {
        Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            seed_sum: 0.0,
            seen: 0,
            value: None,
        }
    }

    /// Feed one value; returns the EMA once the seed window is full.
    fn push(&mut self, x: f64) -> Option<f64> {
        match self.value {
            Some(prev) => {
                let next = prev + self.alpha * (x - prev);
                self.value = Some(next);
            }
            None => {
                self.seed_sum += x;
                self.seen += 1;
                if self.seen == self.period {
                    self.value = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self.value
    }
}

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    /// A zero period is clamped to 1 (the EMA of the input itself).
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ema_of_series(&closes, self.period)
    }
}

/// EMA of an arbitrary series, aligned with the input.
///
/// Leading NaNs are skipped, so the input may be another indicator's output
/// (the MACD signal line smooths the MACD line). Any NaN once smoothing has
/// started, seed window included, makes that position and every later one NaN.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }

    let Some(start) = values.iter().position(|v| !v.is_nan()) else {
        return out;
    };

    let mut smoother = Smoother::new(period);
    for (slot, &x) in out[start..].iter_mut().zip(&values[start..]) {
        if x.is_nan() {
            break;
        }
        if let Some(v) = smoother.push(x) {
            *slot = v;
        }
    }
    out
}
