//! Weekly pivot point.
//!
//! Bars are grouped by ISO week (Monday..Sunday). Each week yields
//! pivot = (high + low + close) / 3. A bar carries the pivot of the most
//! recent week *before* its own, so no bar sees its own week's high, low or
//! close. Bars in the first week present have no pivot (NaN).
//! Lookback: 0 bars, but the output is NaN until the second week.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use super::Indicator;
use crate::domain::Bar;

/// High, low and last close of one calendar week present in the data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeeklyAggregate {
    /// Sunday closing the ISO week.
    pub week_end: NaiveDate,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl WeeklyAggregate {
    pub fn pivot(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

fn week_key(bar: &Bar) -> (i32, u32) {
    let iso = bar.timestamp.date().iso_week();
    (iso.year(), iso.week())
}

fn week_end((year, week): (i32, u32), fallback: NaiveDate) -> NaiveDate {
    NaiveDate::from_isoywd_opt(year, week, Weekday::Sun).unwrap_or(fallback)
}

/// Resample bars into one aggregate per ISO week, in time order.
///
/// Returns the aggregates together with the index of the aggregate each
/// bar belongs to.
fn resample(bars: &[Bar]) -> (Vec<WeeklyAggregate>, Vec<usize>) {
    let mut weeks: Vec<WeeklyAggregate> = Vec::new();
    let mut owner = Vec::with_capacity(bars.len());
    let mut current: Option<(i32, u32)> = None;

    for bar in bars {
        let key = week_key(bar);
        let same_week = current == Some(key);
        match weeks.last_mut() {
            Some(agg) if same_week => {
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
            }
            _ => {
                weeks.push(WeeklyAggregate {
                    week_end: week_end(key, bar.timestamp.date()),
                    high: bar.high,
                    low: bar.low,
                    close: bar.close,
                });
                current = Some(key);
            }
        }
        owner.push(weeks.len() - 1);
    }

    (weeks, owner)
}

/// One aggregate per calendar week present in `bars`.
pub fn weekly_aggregates(bars: &[Bar]) -> Vec<WeeklyAggregate> {
    resample(bars).0
}

#[derive(Debug, Clone)]
pub struct WeeklyPivot {
    name: String,
}

impl WeeklyPivot {
    pub fn new() -> Self {
        Self {
            name: "pp_weekly".to_string(),
        }
    }
}

impl Default for WeeklyPivot {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for WeeklyPivot {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let (weeks, owner) = resample(bars);
        owner
            .iter()
            .map(|&week| match week.checked_sub(1) {
                Some(prev) => weeks[prev].pivot(),
                None => f64::NAN,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn aggregates_split_on_iso_weeks() {
        // 2024-01-01 is a Monday: 7 bars in week 1, 3 bars in week 2
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let weeks = weekly_aggregates(&bars);

        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].week_end, NaiveDate::from_ymd_opt(2024, 1, 7).unwrap());
        assert_eq!(weeks[1].week_end, NaiveDate::from_ymd_opt(2024, 1, 14).unwrap());
        assert_approx(weeks[0].close, 106.0, DEFAULT_EPSILON);
        assert_approx(weeks[0].high, 107.0, DEFAULT_EPSILON);
        assert_approx(weeks[0].low, 99.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bars_carry_previous_week_pivot() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let pivot = WeeklyPivot::new().compute(&bars);

        assert!(pivot[..7].iter().all(|v| v.is_nan()));
        let expected = (107.0 + 99.0 + 106.0) / 3.0;
        for &v in &pivot[7..] {
            assert_approx(v, expected, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn gap_weeks_use_last_week_present() {
        let mut bars = make_bars(&[100.0, 101.0, 102.0]);
        let mut later = make_bars(&[110.0]);
        later[0].timestamp = bars[0].timestamp + chrono::Duration::days(21);
        bars.extend(later);

        let pivot = WeeklyPivot::new().compute(&bars);
        let expected = weekly_aggregates(&bars[..3])[0].pivot();
        assert_approx(pivot[3], expected, DEFAULT_EPSILON);
    }

    #[test]
    fn empty_input() {
        assert!(weekly_aggregates(&[]).is_empty());
        assert!(WeeklyPivot::new().compute(&[]).is_empty());
    }
}
