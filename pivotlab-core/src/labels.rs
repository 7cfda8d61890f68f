//! Forward-looking ternary labels.
//!
//! Row t is labelled from the close `lookahead` rows later:
//! - Buy if future / close - 1 > threshold
//! - else Sell if close / future - 1 > threshold
//! - else Neutral
//!
//! The last `lookahead` rows have no future close and are dropped.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::domain::Label;
use crate::features::{FeatureRow, FeatureTable};

#[derive(Debug, Error, PartialEq)]
pub enum LabelError {
    #[error("lookahead must be at least 1, got {0}")]
    InvalidLookahead(usize),

    #[error("threshold must be finite and non-negative, got {0}")]
    InvalidThreshold(f64),
}

/// Check lookahead and threshold before any labelling happens.
pub fn validate_label_params(lookahead: usize, threshold: f64) -> Result<(), LabelError> {
    if lookahead < 1 {
        return Err(LabelError::InvalidLookahead(lookahead));
    }
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(LabelError::InvalidThreshold(threshold));
    }
    Ok(())
}

/// Label for a single (close, future close) pair.
pub fn label_for(close: f64, future: f64, threshold: f64) -> Label {
    if future / close - 1.0 > threshold {
        Label::Buy
    } else if close / future - 1.0 > threshold {
        Label::Sell
    } else {
        Label::Neutral
    }
}

/// Feature rows paired with their labels, in bar order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledTable {
    features: FeatureTable,
    labels: Vec<Label>,
    lookahead: usize,
    threshold: f64,
}

impl LabeledTable {
    pub fn features(&self) -> &FeatureTable {
        &self.features
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn lookahead(&self) -> usize {
        self.lookahead
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FeatureRow, Label)> {
        self.features.rows().iter().zip(self.labels.iter().copied())
    }

    /// Count of rows per label, indexed by `Label::index()`.
    pub fn class_counts(&self) -> [usize; 3] {
        let mut counts = [0usize; 3];
        for label in &self.labels {
            counts[label.index()] += 1;
        }
        counts
    }
}

/// Attach a label to every row that has a close `lookahead` rows ahead.
pub fn attach_labels(
    table: &FeatureTable,
    lookahead: usize,
    threshold: f64,
) -> Result<LabeledTable, LabelError> {
    validate_label_params(lookahead, threshold)?;

    let rows = table.rows();
    let keep = rows.len().saturating_sub(lookahead);

    let labels: Vec<Label> = (0..keep)
        .map(|t| label_for(rows[t].close, rows[t + lookahead].close, threshold))
        .collect();
    let kept_rows = rows[..keep].to_vec();

    let labeled = LabeledTable {
        features: FeatureTable::new(table.columns().to_vec(), kept_rows),
        labels,
        lookahead,
        threshold,
    };
    let [sell, neutral, buy] = labeled.class_counts();
    debug!(rows = keep, sell, neutral, buy, lookahead, threshold, "attached labels");

    Ok(labeled)
}
