//! On-disk model store: one JSON blob per (symbol, timeframe).
//!
//! Layout: `{dir}/{SYMBOL}_{TF}.model.json`. Writes go to a `.tmp` sibling
//! first and are renamed into place, so a reader never sees a half-written
//! model.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use pivotlab_core::domain::Timeframe;

use crate::model::{Model, MODEL_FORMAT_VERSION};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no model stored for {symbol} {timeframe}")]
    NotFound { symbol: String, timeframe: Timeframe },

    #[error("unsupported model format version {found} (max supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("model file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("model JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.dir
            .join(format!("{}_{}.model.json", symbol.to_ascii_uppercase(), timeframe))
    }

    pub fn exists(&self, symbol: &str, timeframe: Timeframe) -> bool {
        self.path_for(symbol, timeframe).is_file()
    }

    /// Persist `model` under the key recorded in its metadata.
    pub fn save(&self, model: &Model) -> Result<PathBuf, StoreError> {
        let meta = model.metadata();
        let path = self.path_for(&meta.symbol, meta.timeframe);
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let json = serde_json::to_string_pretty(model)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(io_err)?;
        fs::rename(&tmp_path, &path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            io_err(source)
        })?;

        info!(symbol = %meta.symbol, timeframe = %meta.timeframe, path = %path.display(), "saved model");
        Ok(path)
    }

    pub fn load(&self, symbol: &str, timeframe: Timeframe) -> Result<Model, StoreError> {
        let path = self.path_for(symbol, timeframe);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    symbol: symbol.to_string(),
                    timeframe,
                })
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        parse_model(&content)
    }
}

/// Deserialize a model blob, rejecting formats newer than this build.
pub fn parse_model(json: &str) -> Result<Model, StoreError> {
    // Check the version before the full parse so a newer layout reports
    // the version rather than a field error.
    let raw: serde_json::Value = serde_json::from_str(json)?;
    let found = raw
        .pointer("/metadata/format_version")
        .and_then(serde_json::Value::as_u64)
        .map_or(0, |v| u32::try_from(v).unwrap_or(u32::MAX));
    if found > MODEL_FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found,
            supported: MODEL_FORMAT_VERSION,
        });
    }
    Ok(serde_json::from_value(raw)?)
}
