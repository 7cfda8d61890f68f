//! Offline training pipeline.
//!
//! Bar source → feature engine → labels → chronological split → scaler +
//! classifier → held-out report. Configuration is validated before any bars
//! are fetched; an empty or under-length history is a hard failure here
//! (unlike live prediction, which reports "no signal").

use ndarray::Array2;
use thiserror::Error;
use tracing::{info, warn};

use pivotlab_core::data::{fetch_table, BarSource, DataError};
use pivotlab_core::dataset::{build_dataset, DatasetError};
use pivotlab_core::domain::Label;
use pivotlab_core::features::{compute_features, FeatureSchema, WARMUP_BARS};
use pivotlab_core::labels::{attach_labels, LabelError};

use crate::classifier::SoftmaxRegression;
use crate::config::{ConfigError, TrainConfig};
use crate::metrics::ClassificationReport;
use crate::model::{Model, ModelError, ModelMetadata, MODEL_FORMAT_VERSION};
use crate::store::{ModelStore, StoreError};

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Label(#[from] LabelError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no bars returned for {symbol}")]
    NoData { symbol: String },

    #[error("{bars} bars leave no feature rows after the {warmup}-bar warm-up")]
    NoFeatureRows { bars: usize, warmup: usize },
}

/// Everything a training run produces.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub model: Model,
    pub report: ClassificationReport,
    pub bars: usize,
    pub feature_rows: usize,
    /// Labelled rows per class, indexed by `Label::index()`.
    pub class_counts: [usize; 3],
    pub train_rows: usize,
    pub test_rows: usize,
}

fn metadata_for(config: &TrainConfig, train_rows: usize, test_rows: usize) -> ModelMetadata {
    ModelMetadata {
        format_version: MODEL_FORMAT_VERSION,
        symbol: config.symbol.to_ascii_uppercase(),
        timeframe: config.timeframe,
        lookahead: config.lookahead,
        threshold: config.threshold,
        holdout_fraction: config.holdout_fraction,
        train_rows,
        test_rows,
        trained_at: chrono::Local::now().naive_local(),
        run_id: config.run_id(),
    }
}

fn fit_for_run(
    train_x: &Array2<f64>,
    train_y: &[Label],
    config: &TrainConfig,
    test_rows: usize,
) -> Result<Model, TrainError> {
    let classifier = SoftmaxRegression::new(config.classifier.clone());
    let metadata = metadata_for(config, train_x.nrows(), test_rows);
    Ok(Model::fit(
        train_x,
        train_y,
        &FeatureSchema::current(),
        classifier,
        metadata,
    )?)
}

/// Fit scaler + classifier on rows laid out in the shared model feature order.
pub fn fit(
    train_x: &Array2<f64>,
    train_y: &[Label],
    config: &TrainConfig,
) -> Result<Model, TrainError> {
    fit_for_run(train_x, train_y, config, 0)
}

/// Score `model` on the held-out rows.
pub fn evaluate(
    model: &Model,
    test_x: &Array2<f64>,
    test_y: &[Label],
) -> Result<ClassificationReport, TrainError> {
    if test_x.nrows() != test_y.len() {
        return Err(ModelError::LabelCount {
            rows: test_x.nrows(),
            labels: test_y.len(),
        }
        .into());
    }
    let predicted = if test_x.nrows() == 0 {
        Vec::new()
    } else {
        model.predict(test_x)?
    };
    Ok(ClassificationReport::from_labels(test_y, &predicted))
}

/// Run the whole offline pipeline for one (symbol, timeframe).
pub fn train_model(source: &dyn BarSource, config: &TrainConfig) -> Result<TrainOutcome, TrainError> {
    config.validate()?;
    info!(
        symbol = %config.symbol,
        timeframe = %config.timeframe,
        bars = config.bar_count,
        run_id = %config.run_id(),
        "training"
    );

    let table = fetch_table(source, &config.symbol, config.timeframe, config.bar_count)?;
    if table.is_empty() {
        return Err(TrainError::NoData {
            symbol: config.symbol.clone(),
        });
    }
    if table.len() < config.bar_count {
        warn!(
            requested = config.bar_count,
            received = table.len(),
            "source returned fewer bars than requested"
        );
    }

    let features = compute_features(&table);
    if features.is_empty() {
        return Err(TrainError::NoFeatureRows {
            bars: table.len(),
            warmup: WARMUP_BARS,
        });
    }

    let labeled = attach_labels(&features, config.lookahead, config.threshold)?;
    let class_counts = labeled.class_counts();
    let split = build_dataset(&labeled, config.holdout_fraction)?;
    let (train_x, test_x, train_y, test_y) = split.into_parts();
    let (train_rows, test_rows) = (train_y.len(), test_y.len());

    let model = fit_for_run(&train_x, &train_y, config, test_rows)?;
    let report = evaluate(&model, &test_x, &test_y)?;

    info!(
        feature_rows = features.len(),
        train_rows,
        test_rows,
        sell = class_counts[0],
        neutral = class_counts[1],
        buy = class_counts[2],
        accuracy = report.accuracy,
        "training complete"
    );

    Ok(TrainOutcome {
        model,
        report,
        bars: table.len(),
        feature_rows: features.len(),
        class_counts,
        train_rows,
        test_rows,
    })
}

/// Train, then persist the model in `store` under its (symbol, timeframe).
pub fn train_and_save(
    source: &dyn BarSource,
    config: &TrainConfig,
    store: &ModelStore,
) -> Result<(TrainOutcome, std::path::PathBuf), TrainError> {
    let outcome = train_model(source, config)?;
    let path = store.save(&outcome.model)?;
    Ok((outcome, path))
}
