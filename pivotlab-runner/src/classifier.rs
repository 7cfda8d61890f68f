//! Pluggable classifier over the three trading labels.
//!
//! The training pipeline only needs `fit` and `predict`; `SoftmaxRegression`
//! is the bundled implementation (multinomial logistic regression trained by
//! full-batch gradient descent with an L2 penalty).

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use pivotlab_core::domain::Label;

use crate::config::ClassifierConfig;
use crate::model::ModelError;

const N_CLASSES: usize = 3;

/// A multi-class classifier over {sell, neutral, buy}.
///
/// Column `k` of `predict_proba` belongs to `Label::ALL[k]`.
pub trait Classifier: Send + Sync {
    fn fit(&mut self, x: &Array2<f64>, y: &[Label]) -> Result<(), ModelError>;

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError>;

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<Label>, ModelError> {
        let proba = self.predict_proba(x)?;
        Ok(proba.rows().into_iter().map(|row| argmax_label(row.iter())).collect())
    }

    fn classes(&self) -> [Label; 3] {
        Label::ALL
    }
}

/// Label with the highest score. Ties go to the earlier class.
pub fn argmax_label<'a>(scores: impl Iterator<Item = &'a f64>) -> Label {
    let mut best = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (k, &s) in scores.enumerate() {
        if s > best_score {
            best = k;
            best_score = s;
        }
    }
    Label::from_index(best).unwrap_or(Label::Neutral)
}

fn softmax_rows(mut logits: Array2<f64>) -> Array2<f64> {
    for mut row in logits.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    logits
}

fn one_hot(y: &[Label]) -> Array2<f64> {
    let mut out = Array2::zeros((y.len(), N_CLASSES));
    for (i, label) in y.iter().enumerate() {
        out[[i, label.index()]] = 1.0;
    }
    out
}

fn cross_entropy(proba: &Array2<f64>, targets: &Array2<f64>) -> f64 {
    let eps = 1e-15;
    let n = proba.nrows().max(1) as f64;
    -proba
        .iter()
        .zip(targets.iter())
        .map(|(&p, &t)| t * p.clamp(eps, 1.0).ln())
        .sum::<f64>()
        / n
}

/// Multinomial logistic regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxRegression {
    config: ClassifierConfig,
    /// n_features x 3
    weights: Array2<f64>,
    intercepts: Array1<f64>,
    epochs_run: usize,
    final_loss: f64,
}

impl SoftmaxRegression {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            weights: Array2::zeros((0, N_CLASSES)),
            intercepts: Array1::zeros(N_CLASSES),
            epochs_run: 0,
            final_loss: f64::NAN,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.epochs_run > 0
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn intercepts(&self) -> &Array1<f64> {
        &self.intercepts
    }

    pub fn epochs_run(&self) -> usize {
        self.epochs_run
    }

    pub fn final_loss(&self) -> f64 {
        self.final_loss
    }

    fn logits(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.weights) + &self.intercepts
    }
}

impl Default for SoftmaxRegression {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl Classifier for SoftmaxRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &[Label]) -> Result<(), ModelError> {
        if x.nrows() == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        if x.nrows() != y.len() {
            return Err(ModelError::LabelCount {
                rows: x.nrows(),
                labels: y.len(),
            });
        }

        let n = x.nrows() as f64;
        let targets = one_hot(y);
        let lr = self.config.learning_rate;
        let l2 = self.config.l2;

        self.weights = Array2::zeros((x.ncols(), N_CLASSES));
        self.intercepts = Array1::zeros(N_CLASSES);

        let mut previous = f64::INFINITY;
        let mut loss = f64::NAN;
        let mut epochs = 0;

        for epoch in 0..self.config.max_epochs {
            let proba = softmax_rows(self.logits(x));
            loss = cross_entropy(&proba, &targets)
                + 0.5 * l2 * self.weights.iter().map(|w| w * w).sum::<f64>();
            if !loss.is_finite() {
                return Err(ModelError::NonFinite("training loss"));
            }

            let errors = &proba - &targets;
            let grad_w = x.t().dot(&errors) / n + &self.weights * l2;
            let grad_b = errors.sum_axis(Axis(0)) / n;

            self.weights = &self.weights - &(grad_w * lr);
            self.intercepts = &self.intercepts - &(grad_b * lr);
            epochs = epoch + 1;

            if (previous - loss).abs() < self.config.tolerance {
                break;
            }
            previous = loss;
        }

        self.epochs_run = epochs;
        self.final_loss = loss;
        debug!(epochs, loss, rows = x.nrows(), "fitted softmax regression");
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        if x.ncols() != self.weights.nrows() {
            return Err(ModelError::DimensionMismatch {
                expected: self.weights.nrows(),
                got: x.ncols(),
            });
        }
        Ok(softmax_rows(self.logits(x)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Three well separated clusters on one axis.
    fn clusters() -> (Array2<f64>, Vec<Label>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            let jitter = (i as f64 * 0.37).sin() * 0.2;
            rows.push([-2.0 + jitter, jitter]);
            labels.push(Label::Sell);
            rows.push([0.0 + jitter, -jitter]);
            labels.push(Label::Neutral);
            rows.push([2.0 + jitter, jitter]);
            labels.push(Label::Buy);
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        (Array2::from_shape_vec((rows.len(), 2), flat).unwrap(), labels)
    }

    #[test]
    fn separates_clusters() {
        let (x, y) = clusters();
        let mut model = SoftmaxRegression::default();
        model.fit(&x, &y).unwrap();

        let predicted = model.predict(&array![[-2.1, 0.0], [0.05, 0.0], [2.2, 0.0]]).unwrap();
        assert_eq!(predicted, vec![Label::Sell, Label::Neutral, Label::Buy]);
        assert!(model.final_loss() < 0.5);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let (x, y) = clusters();
        let mut model = SoftmaxRegression::default();
        model.fit(&x, &y).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
            assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)));
        }
    }

    #[test]
    fn single_class_training_predicts_that_class() {
        let x = array![[1.0, 0.5], [0.2, -0.3], [-0.7, 0.1]];
        let y = vec![Label::Buy; 3];
        let mut model = SoftmaxRegression::default();
        model.fit(&x, &y).unwrap();
        assert_eq!(
            model.predict(&array![[0.5, 0.0], [-0.5, 0.0]]).unwrap(),
            vec![Label::Buy, Label::Buy]
        );
    }

    #[test]
    fn unfitted_model_refuses_to_predict() {
        let model = SoftmaxRegression::default();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(ModelError::NotFitted)
        ));
    }

    #[test]
    fn label_count_must_match_rows() {
        let mut model = SoftmaxRegression::default();
        let err = model.fit(&array![[1.0], [2.0]], &[Label::Buy]).unwrap_err();
        assert!(matches!(err, ModelError::LabelCount { rows: 2, labels: 1 }));
    }

    #[test]
    fn argmax_prefers_first_on_tie() {
        assert_eq!(argmax_label([0.4, 0.4, 0.2].iter()), Label::Sell);
        assert_eq!(argmax_label([0.1, 0.2, 0.7].iter()), Label::Buy);
    }
}
