//! Chronological train/evaluation split.
//!
//! The labelled table is projected onto the model feature columns and cut
//! once: the head trains, the tail of `ceil(rows * holdout)` rows evaluates.
//! Rows are never shuffled, so every training timestamp precedes every
//! evaluation timestamp.

use chrono::NaiveDateTime;
use ndarray::Array2;
use thiserror::Error;
use tracing::debug;

use crate::domain::Label;
use crate::features::{FeatureError, MODEL_FEATURES};
use crate::labels::LabeledTable;

pub const DEFAULT_HOLDOUT_FRACTION: f64 = 0.2;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("holdout fraction must be strictly between 0 and 1, got {0}")]
    InvalidHoldout(f64),

    #[error("labelled table is empty")]
    Empty,

    #[error("{rows} labelled rows leave no training rows after holding out {test}")]
    EmptyTrain { rows: usize, test: usize },

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error("feature matrix shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Feature matrix, labels and timestamps for one side of the split.
#[derive(Debug, Clone)]
pub struct Samples {
    pub timestamps: Vec<NaiveDateTime>,
    pub features: Array2<f64>,
    pub labels: Vec<Label>,
}

impl Samples {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub feature_names: Vec<String>,
    pub train: Samples,
    pub test: Samples,
}

impl DatasetSplit {
    /// `(train_x, test_x, train_y, test_y)`.
    pub fn into_parts(self) -> (Array2<f64>, Array2<f64>, Vec<Label>, Vec<Label>) {
        (
            self.train.features,
            self.test.features,
            self.train.labels,
            self.test.labels,
        )
    }
}

/// Number of evaluation rows for `rows` labelled rows.
pub fn holdout_size(rows: usize, holdout_fraction: f64) -> usize {
    (rows as f64 * holdout_fraction).ceil() as usize
}

fn samples(
    labeled: &LabeledTable,
    positions: &[usize],
    range: std::ops::Range<usize>,
) -> Result<Samples, DatasetError> {
    let rows = &labeled.features().rows()[range.clone()];
    let mut flat = Vec::with_capacity(rows.len() * positions.len());
    for row in rows {
        flat.extend(positions.iter().map(|&p| row.values[p]));
    }
    Ok(Samples {
        timestamps: rows.iter().map(|r| r.timestamp).collect(),
        features: Array2::from_shape_vec((rows.len(), positions.len()), flat)?,
        labels: labeled.labels()[range].to_vec(),
    })
}

/// Split using the shared model feature set.
pub fn build_dataset(
    labeled: &LabeledTable,
    holdout_fraction: f64,
) -> Result<DatasetSplit, DatasetError> {
    build_dataset_with(labeled, &MODEL_FEATURES, holdout_fraction)
}

/// Split using an explicit ordered feature subset.
pub fn build_dataset_with(
    labeled: &LabeledTable,
    feature_names: &[&str],
    holdout_fraction: f64,
) -> Result<DatasetSplit, DatasetError> {
    if !(holdout_fraction > 0.0 && holdout_fraction < 1.0) {
        return Err(DatasetError::InvalidHoldout(holdout_fraction));
    }
    let rows = labeled.len();
    if rows == 0 {
        return Err(DatasetError::Empty);
    }

    let test = holdout_size(rows, holdout_fraction);
    if test >= rows {
        return Err(DatasetError::EmptyTrain { rows, test });
    }
    let cut = rows - test;

    let positions = labeled.features().resolve(feature_names)?;
    let split = DatasetSplit {
        feature_names: feature_names.iter().map(|s| s.to_string()).collect(),
        train: samples(labeled, &positions, 0..cut)?,
        test: samples(labeled, &positions, cut..rows)?,
    };
    debug!(
        train = split.train.len(),
        test = split.test.len(),
        features = positions.len(),
        "built chronological split"
    );
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureRow, FeatureTable};
    use crate::labels::attach_labels;
    use chrono::NaiveDate;

    fn labeled(n: usize) -> LabeledTable {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let columns: Vec<String> = vec!["x".into(), "y".into()];
        let rows = (0..n + 1)
            .map(|i| FeatureRow {
                timestamp: base + chrono::Duration::days(i as i64),
                close: 100.0 + i as f64,
                values: vec![i as f64, -(i as f64)],
            })
            .collect();
        attach_labels(&FeatureTable::new(columns, rows), 1, 0.0).unwrap()
    }

    #[test]
    fn holdout_rounds_up() {
        assert_eq!(holdout_size(347, 0.2), 70);
        assert_eq!(holdout_size(10, 0.2), 2);
        assert_eq!(holdout_size(11, 0.2), 3);
    }

    #[test]
    fn split_is_chronological() {
        let split = build_dataset_with(&labeled(10), &["y", "x"], 0.2).unwrap();
        assert_eq!(split.train.len(), 8);
        assert_eq!(split.test.len(), 2);
        let last_train = *split.train.timestamps.last().unwrap();
        assert!(split.test.timestamps.iter().all(|&t| t > last_train));
        // column order follows the requested names
        assert_eq!(split.train.features[[3, 0]], -3.0);
        assert_eq!(split.train.features[[3, 1]], 3.0);
        assert_eq!(split.test.features[[0, 1]], 8.0);
    }

    #[test]
    fn into_parts_shapes() {
        let split = build_dataset_with(&labeled(8), &["x"], 0.25).unwrap();
        let (train_x, test_x, train_y, test_y) = split.into_parts();
        assert_eq!(train_x.dim(), (6, 1));
        assert_eq!(test_x.dim(), (2, 1));
        assert_eq!(train_y.len(), 6);
        assert_eq!(test_y.len(), 2);
    }

    #[test]
    fn rejects_holdout_outside_unit_interval() {
        for bad in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            assert!(matches!(
                build_dataset_with(&labeled(10), &["x"], bad),
                Err(DatasetError::InvalidHoldout(_))
            ));
        }
    }

    #[test]
    fn rejects_empty_table() {
        assert!(matches!(
            build_dataset_with(&labeled(0), &["x"], 0.2),
            Err(DatasetError::Empty)
        ));
    }

    #[test]
    fn single_row_leaves_no_training_data() {
        assert!(matches!(
            build_dataset_with(&labeled(1), &["x"], 0.2),
            Err(DatasetError::EmptyTrain { rows: 1, test: 1 })
        ));
    }

    #[test]
    fn unknown_feature_is_reported() {
        assert!(matches!(
            build_dataset_with(&labeled(5), &["nope"], 0.2),
            Err(DatasetError::Feature(FeatureError::MissingColumn(_)))
        ));
    }
}
