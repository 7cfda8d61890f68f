//! Serializable training and prediction configuration.
//!
//! Loaded from TOML, overridden by CLI flags, validated once at the boundary
//! before any bars are fetched.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use pivotlab_core::dataset::DEFAULT_HOLDOUT_FRACTION;
use pivotlab_core::domain::{Timeframe, UnknownTimeframe};
use pivotlab_core::features::WARMUP_BARS;

pub const DEFAULT_LOOKAHEAD: usize = 4;
pub const DEFAULT_THRESHOLD: f64 = 0.005;
pub const DEFAULT_TRAIN_BARS: usize = 10_000;
pub const DEFAULT_PREDICT_BARS: usize = 50;

/// Unique identifier for a training run (content hash of its config).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error(transparent)]
    UnknownTimeframe(#[from] UnknownTimeframe),

    #[error("lookahead must be at least 1, got {0}")]
    InvalidLookahead(usize),

    #[error("threshold must be finite and non-negative, got {0}")]
    InvalidThreshold(f64),

    #[error("holdout fraction must be strictly between 0 and 1, got {0}")]
    InvalidHoldout(f64),

    #[error("bar count {count} must exceed the warm-up of {warmup} bars")]
    BarCountTooSmall { count: usize, warmup: usize },

    #[error("invalid classifier setting: {0}")]
    InvalidClassifier(String),

    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Hyper-parameters of the softmax classifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    pub learning_rate: f64,
    pub max_epochs: usize,
    /// L2 penalty on the weights (not the intercepts).
    pub l2: f64,
    /// Stop once the loss improves by less than this between epochs.
    pub tolerance: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            max_epochs: 2_000,
            l2: 1e-3,
            tolerance: 1e-9,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::InvalidClassifier(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.max_epochs == 0 {
            return Err(ConfigError::InvalidClassifier(
                "max_epochs must be at least 1".into(),
            ));
        }
        if !(self.l2.is_finite() && self.l2 >= 0.0) {
            return Err(ConfigError::InvalidClassifier(format!(
                "l2 must be non-negative, got {}",
                self.l2
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(ConfigError::InvalidClassifier(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

fn default_lookahead() -> usize {
    DEFAULT_LOOKAHEAD
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_holdout() -> f64 {
    DEFAULT_HOLDOUT_FRACTION
}

fn default_train_bars() -> usize {
    DEFAULT_TRAIN_BARS
}

/// Everything needed to reproduce a training run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainConfig {
    pub symbol: String,
    pub timeframe: Timeframe,

    /// Bars ahead used to label each row.
    #[serde(default = "default_lookahead")]
    pub lookahead: usize,

    /// Minimum relative move for a buy/sell label.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Share of the most recent rows held out for evaluation.
    #[serde(default = "default_holdout")]
    pub holdout_fraction: f64,

    /// Bars requested from the source.
    #[serde(default = "default_train_bars")]
    pub bar_count: usize,

    #[serde(default)]
    pub classifier: ClassifierConfig,
}

impl TrainConfig {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            lookahead: DEFAULT_LOOKAHEAD,
            threshold: DEFAULT_THRESHOLD,
            holdout_fraction: DEFAULT_HOLDOUT_FRACTION,
            bar_count: DEFAULT_TRAIN_BARS,
            classifier: ClassifierConfig::default(),
        }
    }

    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject anything the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        if self.lookahead < 1 {
            return Err(ConfigError::InvalidLookahead(self.lookahead));
        }
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if !(self.holdout_fraction > 0.0 && self.holdout_fraction < 1.0) {
            return Err(ConfigError::InvalidHoldout(self.holdout_fraction));
        }
        if self.bar_count <= WARMUP_BARS {
            return Err(ConfigError::BarCountTooSmall {
                count: self.bar_count,
                warmup: WARMUP_BARS,
            });
        }
        self.classifier.validate()
    }

    /// Deterministic hash of the full configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }
}

/// Settings for live prediction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictConfig {
    pub timeframe: Timeframe,
    /// Most recent bars fetched per prediction.
    pub bar_count: usize,
}

impl PredictConfig {
    pub fn new(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            bar_count: DEFAULT_PREDICT_BARS,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bar_count <= WARMUP_BARS {
            return Err(ConfigError::BarCountTooSmall {
                count: self.bar_count,
                warmup: WARMUP_BARS,
            });
        }
        Ok(())
    }
}
