//! Live prediction on the freshest bars.
//!
//! The predictor replays the same feature engine the trainer used, takes the
//! newest feature row and projects it onto the model's recorded field list.
//! A model whose field list or fingerprint differs from the running engine's
//! schema is refused when the predictor is built, never at predict time.
//! Each model also belongs to one (symbol, timeframe); asking it about any
//! other pair is an error rather than a signal.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use pivotlab_core::data::{fetch_table, BarSource, DataError};
use pivotlab_core::domain::{BarTable, Label, Timeframe};
use pivotlab_core::features::{FeatureEngine, FeatureError, FeatureSchema, SchemaFingerprint};

use crate::config::{ConfigError, PredictConfig};
use crate::model::{Model, ModelError, Prediction};
use crate::store::{ModelStore, StoreError};

#[derive(Debug, Error)]
pub enum PredictError {
    #[error(
        "feature schema mismatch: model has {found:?} ({found_fingerprint}), \
         engine produces {expected:?} ({expected_fingerprint})"
    )]
    SchemaMismatch {
        expected: Vec<String>,
        expected_fingerprint: SchemaFingerprint,
        found: Vec<String>,
        found_fingerprint: SchemaFingerprint,
    },

    #[error(
        "model trained for {model_symbol} {model_timeframe} cannot predict {symbol} {timeframe}"
    )]
    ModelMismatch {
        model_symbol: String,
        model_timeframe: Timeframe,
        symbol: String,
        timeframe: Timeframe,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The current label for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveSignal {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Timestamp of the bar the signal was computed on.
    pub timestamp: NaiveDateTime,
    pub label: Label,
    /// Sell, neutral, buy.
    pub probabilities: [f64; 3],
}

/// A loaded model bound to the running feature engine.
#[derive(Debug, Clone)]
pub struct LivePredictor {
    model: Model,
    engine: FeatureEngine,
}

impl LivePredictor {
    /// Bind `model`, refusing it if it was fitted on a different schema.
    pub fn new(model: Model) -> Result<Self, PredictError> {
        let schema = FeatureSchema::current();
        if !model.matches_schema(&schema) {
            return Err(PredictError::SchemaMismatch {
                expected: schema.fields,
                expected_fingerprint: schema.fingerprint,
                found: model.feature_names().to_vec(),
                found_fingerprint: model.fingerprint().clone(),
            });
        }
        Ok(Self {
            model,
            engine: FeatureEngine::new(),
        })
    }

    /// Load the model stored for (symbol, timeframe); a blob whose metadata
    /// names another pair is refused.
    pub fn load(store: &ModelStore, symbol: &str, timeframe: Timeframe) -> Result<Self, PredictError> {
        let predictor = Self::new(store.load(symbol, timeframe)?)?;
        predictor.check_target(symbol, timeframe)?;
        Ok(predictor)
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Symbols compare case-insensitively; stored symbols are upper-case.
    fn check_target(&self, symbol: &str, timeframe: Timeframe) -> Result<(), PredictError> {
        let meta = self.model.metadata();
        if symbol.eq_ignore_ascii_case(&meta.symbol) && timeframe == meta.timeframe {
            return Ok(());
        }
        Err(PredictError::ModelMismatch {
            model_symbol: meta.symbol.clone(),
            model_timeframe: meta.timeframe,
            symbol: symbol.to_string(),
            timeframe,
        })
    }

    /// Prediction for the newest row of `table`.
    ///
    /// `None` when the table is too short to produce a feature row.
    pub fn predict_table(
        &self,
        table: &BarTable,
    ) -> Result<Option<(NaiveDateTime, Prediction)>, PredictError> {
        let features = self.engine.compute(table);
        let Some(last) = features.len().checked_sub(1) else {
            return Ok(None);
        };
        let names: Vec<&str> = self.model.feature_names().iter().map(String::as_str).collect();
        let row = features.select_row(last, &names)?;
        let timestamp = features.rows()[last].timestamp;
        Ok(Some((timestamp, self.model.predict_row(&row)?)))
    }

    /// Fetch the freshest bars for `symbol` and label the newest one.
    ///
    /// `Ok(None)` is "no signal": the source had too few bars. A symbol or
    /// timeframe other than the model's own is refused before any fetch.
    pub fn predict(
        &self,
        source: &dyn BarSource,
        symbol: &str,
        config: &PredictConfig,
    ) -> Result<Option<LiveSignal>, PredictError> {
        config.validate()?;
        self.check_target(symbol, config.timeframe)?;

        let table = fetch_table(source, symbol, config.timeframe, config.bar_count)?;
        let Some((timestamp, prediction)) = self.predict_table(&table)? else {
            warn!(symbol, bars = table.len(), "no signal: not enough bars for a feature row");
            return Ok(None);
        };

        debug!(symbol, %timestamp, probabilities = ?prediction.probabilities, "predicted");
        Ok(Some(LiveSignal {
            symbol: symbol.to_string(),
            timeframe: config.timeframe,
            timestamp,
            label: prediction.label,
            probabilities: prediction.probabilities,
        }))
    }
}

/// Predict several symbols concurrently, one predictor per symbol.
///
/// Results come back in input order.
pub fn predict_many(
    source: &dyn BarSource,
    predictors: &[(String, LivePredictor)],
    config: &PredictConfig,
) -> Vec<(String, Result<Option<LiveSignal>, PredictError>)> {
    info!(symbols = predictors.len(), timeframe = %config.timeframe, "predicting");
    predictors
        .par_iter()
        .map(|(symbol, predictor)| (symbol.clone(), predictor.predict(source, symbol, config)))
        .collect()
}
