//! PivotLab Core: bars, bar sources, indicators, features, labels and datasets.
//!
//! This crate holds everything that turns raw price history into model-ready
//! rows:
//! - Domain types (bars, timeframes, labels, positions)
//! - Bar sources (terminal connector, CSV exports, in-memory, synthetic)
//! - Indicators (weekly pivot, EMA, RSI, MACD)
//! - The feature engine and its schema contract
//! - Forward-looking labels and the chronological train/evaluation split
//!
//! The feature engine is the only place features are computed. Training and
//! live prediction both call it, so the two can never disagree.

pub mod data;
pub mod dataset;
pub mod domain;
pub mod features;
pub mod indicators;
pub mod labels;

pub use dataset::{build_dataset, DatasetError, DatasetSplit, Samples, DEFAULT_HOLDOUT_FRACTION};
pub use domain::{Bar, BarTable, Label, Timeframe};
pub use features::{compute_features, FeatureSchema, FeatureTable, MODEL_FEATURES, WARMUP_BARS};
pub use labels::{attach_labels, LabelError, LabeledTable};
