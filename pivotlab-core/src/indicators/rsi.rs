//! Wilder's relative strength index, bounded to 0..=100.
//!
//! The first value averages the first `period` close-to-close moves; later
//! values smooth gains and losses with weight 1/period. A window with no
//! movement at all reads 50. Lookback: period.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    /// A zero period is clamped to 1.
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut out = vec![f64::NAN; bars.len()];
        let p = self.period as f64;

        let mut gain_sum = 0.0;
        let mut loss_sum = 0.0;
        let mut averages: Option<(f64, f64)> = None;

        for (i, pair) in bars.windows(2).enumerate() {
            let change = pair[1].close - pair[0].close;
            if change.is_nan() {
                break;
            }
            let (gain, loss) = (change.max(0.0), (-change).max(0.0));
            let t = i + 1;

            let (avg_gain, avg_loss) = match averages {
                Some((g, l)) => (g + (gain - g) / p, l + (loss - l) / p),
                None => {
                    gain_sum += gain;
                    loss_sum += loss;
                    if t < self.period {
                        continue;
                    }
                    (gain_sum / p, loss_sum / p)
                }
            };
            averages = Some((avg_gain, avg_loss));
            out[t] = rsi_from_averages(avg_gain, avg_loss);
        }

        out
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    match (avg_gain > 0.0, avg_loss > 0.0) {
        (false, false) => 50.0,
        (true, false) => 100.0,
        (false, true) => 0.0,
        (true, true) => 100.0 * avg_gain / (avg_gain + avg_loss),
    }
}
