//! Feature schema contract: the boundary between training and live inference.
//!
//! Defines the indicator parameters, the full set of computed columns, the
//! ordered subset a model consumes, and the warm-up cutoff. The trainer and
//! the live predictor both read these constants; nothing else decides them.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const EMA_FAST_PERIOD: usize = 20;
pub const EMA_SLOW_PERIOD: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST_PERIOD: usize = 12;
pub const MACD_SLOW_PERIOD: usize = 26;
pub const MACD_SIGNAL_PERIOD: usize = 9;

/// Bumped whenever a column's definition changes.
pub const SCHEMA_VERSION: u32 = 1;

const fn max(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

/// Leading bars without a complete look-back for every indicator.
///
/// Max of EMA50 (49), RSI14 (14) and MACD signal/histogram (26 + 9 - 2 = 33).
pub const WARMUP_BARS: usize = max(
    EMA_SLOW_PERIOD - 1,
    max(RSI_PERIOD, MACD_SLOW_PERIOD + MACD_SIGNAL_PERIOD - 2),
);

/// Every column produced by the feature engine, in output order.
pub const FEATURE_COLUMNS: [&str; 10] = [
    "pp_weekly",
    "dist_pp",
    "ema_20",
    "ema_50",
    "ema20_diff",
    "ema_cross",
    "rsi_14",
    "macd_12_26_9",
    "macd_signal_12_26_9",
    "macd_hist_12_26_9",
];

/// Ordered columns a model is fitted on and predicts from.
pub const MODEL_FEATURES: [&str; 7] = [
    "ema20_diff",
    "ema_cross",
    "rsi_14",
    "macd_12_26_9",
    "macd_hist_12_26_9",
    "dist_pp",
    "ema_50",
];

/// Content hash identifying a feature definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaFingerprint(pub String);

impl fmt::Display for SchemaFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered model fields plus the fingerprint of how they are computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub fields: Vec<String>,
    pub fingerprint: SchemaFingerprint,
}

impl FeatureSchema {
    /// The schema produced by this build of the feature engine.
    pub fn current() -> Self {
        let fields: Vec<String> = MODEL_FEATURES.iter().map(|s| s.to_string()).collect();
        let fingerprint = fingerprint_of(SCHEMA_VERSION, &fields);
        Self {
            version: SCHEMA_VERSION,
            fields,
            fingerprint,
        }
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(String::as_str).collect()
    }
}

/// BLAKE3 over the version, every indicator parameter and the field order.
pub fn fingerprint_of(version: u32, fields: &[String]) -> SchemaFingerprint {
    let canonical = serde_json::json!({
        "version": version,
        "ema": [EMA_FAST_PERIOD, EMA_SLOW_PERIOD],
        "rsi": RSI_PERIOD,
        "macd": [MACD_FAST_PERIOD, MACD_SLOW_PERIOD, MACD_SIGNAL_PERIOD],
        "pivot": "weekly_iso_previous",
        "fields": fields,
    });
    SchemaFingerprint(blake3::hash(canonical.to_string().as_bytes()).to_hex().to_string())
}
