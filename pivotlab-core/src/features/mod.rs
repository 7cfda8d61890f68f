//! Feature engineering shared by training and live prediction.

pub mod engine;
pub mod schema;
pub mod table;

pub use engine::{compute_features, crossover_flag, FeatureEngine};
pub use schema::{
    fingerprint_of, FeatureSchema, SchemaFingerprint, FEATURE_COLUMNS, MODEL_FEATURES,
    SCHEMA_VERSION, WARMUP_BARS,
};
pub use table::{FeatureError, FeatureRow, FeatureTable};
