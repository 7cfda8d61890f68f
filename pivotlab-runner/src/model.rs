//! The fitted model unit: scaler + classifier + the schema they were fitted on.

use chrono::NaiveDateTime;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pivotlab_core::domain::{Label, Timeframe};
use pivotlab_core::features::{FeatureSchema, SchemaFingerprint};

use crate::classifier::{argmax_label, Classifier, SoftmaxRegression};
use crate::scaler::StandardScaler;

/// Bumped whenever the persisted layout changes.
pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("{rows} feature rows but {labels} labels")]
    LabelCount { rows: usize, labels: usize },

    #[error("dimension mismatch: expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("non-finite values in {0}")]
    NonFinite(&'static str),

    #[error("classifier has not been fitted")]
    NotFitted,
}

/// Provenance recorded alongside the fitted parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub format_version: u32,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub lookahead: usize,
    pub threshold: f64,
    pub holdout_fraction: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    pub trained_at: NaiveDateTime,
    pub run_id: String,
}

/// One live prediction with its class probabilities (sell, neutral, buy).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub label: Label,
    pub probabilities: [f64; 3],
}

/// Scaler and classifier fitted together. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "C: Serialize",
    deserialize = "C: serde::de::DeserializeOwned"
))]
pub struct Model<C = SoftmaxRegression> {
    scaler: StandardScaler,
    classifier: C,
    feature_names: Vec<String>,
    fingerprint: SchemaFingerprint,
    metadata: ModelMetadata,
}

impl<C: Classifier> Model<C> {
    /// Fit the scaler on `x`, then the classifier on the scaled rows.
    pub fn fit(
        x: &Array2<f64>,
        y: &[Label],
        schema: &FeatureSchema,
        mut classifier: C,
        metadata: ModelMetadata,
    ) -> Result<Self, ModelError> {
        if x.ncols() != schema.fields.len() {
            return Err(ModelError::DimensionMismatch {
                expected: schema.fields.len(),
                got: x.ncols(),
            });
        }
        let scaler = StandardScaler::fit(x)?;
        classifier.fit(&scaler.transform(x)?, y)?;
        Ok(Self {
            scaler,
            classifier,
            feature_names: schema.fields.clone(),
            fingerprint: schema.fingerprint.clone(),
            metadata,
        })
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<Label>, ModelError> {
        self.classifier.predict(&self.scaler.transform(x)?)
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        self.classifier.predict_proba(&self.scaler.transform(x)?)
    }

    /// Label and probabilities for a single raw feature row.
    pub fn predict_row(&self, row: &[f64]) -> Result<Prediction, ModelError> {
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite("feature row"));
        }
        let x = Array1::from(row.to_vec()).insert_axis(ndarray::Axis(0));
        let proba = self.predict_proba(&x)?;
        let probs = proba.row(0);
        let mut probabilities = [0.0; 3];
        for (slot, &p) in probabilities.iter_mut().zip(probs.iter()) {
            *slot = p;
        }
        Ok(Prediction {
            label: argmax_label(probabilities.iter()),
            probabilities,
        })
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }
}

impl<C> Model<C> {
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn fingerprint(&self) -> &SchemaFingerprint {
        &self.fingerprint
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// True when the model was fitted on exactly `schema`.
    pub fn matches_schema(&self, schema: &FeatureSchema) -> bool {
        self.feature_names == schema.fields && self.fingerprint == schema.fingerprint
    }
}
