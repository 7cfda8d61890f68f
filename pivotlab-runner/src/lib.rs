//! PivotLab Runner: models, training, persistence and live prediction.
//!
//! This crate builds on `pivotlab-core` to provide:
//! - Training and prediction configuration (TOML, validated at the boundary)
//! - Standard scaler and a pluggable classifier (softmax regression bundled)
//! - The fitted model unit and its on-disk store
//! - The offline training pipeline with a held-out classification report
//! - The live predictor with its feature schema guard
//! - CSV export of feature tables

pub mod classifier;
pub mod config;
pub mod export;
pub mod metrics;
pub mod model;
pub mod predictor;
pub mod scaler;
pub mod store;
pub mod trainer;

pub use classifier::{Classifier, SoftmaxRegression};
pub use config::{ClassifierConfig, ConfigError, PredictConfig, RunId, TrainConfig};
pub use metrics::{ClassificationReport, ConfusionMatrix};
pub use model::{Model, ModelError, ModelMetadata, Prediction, MODEL_FORMAT_VERSION};
pub use predictor::{predict_many, LivePredictor, LiveSignal, PredictError};
pub use scaler::StandardScaler;
pub use store::{ModelStore, StoreError};
pub use trainer::{evaluate, fit, train_and_save, train_model, TrainError, TrainOutcome};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn models_are_shareable_across_threads() {
        assert_send::<Model>();
        assert_sync::<Model>();
        assert_send::<LivePredictor>();
        assert_sync::<LivePredictor>();
    }

    #[test]
    fn results_cross_threads() {
        assert_send::<LiveSignal>();
        assert_send::<PredictError>();
        assert_send::<TrainOutcome>();
        assert_send::<ClassificationReport>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<TrainConfig>();
        assert_sync::<TrainConfig>();
        assert_send::<PredictConfig>();
        assert_sync::<PredictConfig>();
        assert_send::<ModelStore>();
        assert_sync::<ModelStore>();
    }
}
