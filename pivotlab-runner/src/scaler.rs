//! Per-column standardization learned from the training rows only.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::model::ModelError;

/// Columns below this standard deviation are treated as constant.
const MIN_STD: f64 = 1e-12;

/// Fitted mean and standard deviation per column.
///
/// Constant columns get a scale of 1, so they map to zero instead of NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Array2<f64>) -> Result<Self, ModelError> {
        if x.nrows() == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite("training features"));
        }
        let mean = x.mean_axis(Axis(0)).ok_or(ModelError::EmptyTrainingSet)?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s < MIN_STD { 1.0 } else { s });
        Ok(Self { mean, scale })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        if x.ncols() != self.n_features() {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_features(),
                got: x.ncols(),
            });
        }
        Ok((x - &self.mean) / &self.scale)
    }
}
