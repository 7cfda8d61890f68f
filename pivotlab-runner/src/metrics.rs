//! Held-out classification report over {sell, neutral, buy}.
//!
//! Advisory only: nothing in the pipeline gates on these numbers.

use serde::{Deserialize, Serialize};
use std::fmt;

use pivotlab_core::domain::Label;

/// `matrix[actual][predicted]`, both indexed by `Label::index()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub matrix: [[usize; 3]; 3],
}

impl ConfusionMatrix {
    pub fn from_labels(actual: &[Label], predicted: &[Label]) -> Self {
        let mut matrix = [[0usize; 3]; 3];
        for (a, p) in actual.iter().zip(predicted) {
            matrix[a.index()][p.index()] += 1;
        }
        Self { matrix }
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..3).map(|k| self.matrix[k][k]).sum()
    }

    /// Rows whose true label is `label`.
    pub fn support(&self, label: Label) -> usize {
        self.matrix[label.index()].iter().sum()
    }

    /// Rows predicted as `label`.
    pub fn predicted(&self, label: Label) -> usize {
        self.matrix.iter().map(|row| row[label.index()]).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub label: Label,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AverageScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: [ClassScores; 3],
    pub accuracy: f64,
    pub macro_avg: AverageScores,
    pub weighted_avg: AverageScores,
    pub confusion: ConfusionMatrix,
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    let denom = precision + recall;
    if denom < 1e-12 {
        0.0
    } else {
        2.0 * precision * recall / denom
    }
}

impl ClassificationReport {
    /// Classes with no true and no predicted rows score 0 everywhere.
    pub fn from_labels(actual: &[Label], predicted: &[Label]) -> Self {
        let confusion = ConfusionMatrix::from_labels(actual, predicted);
        let classes = Label::ALL.map(|label| {
            let tp = confusion.matrix[label.index()][label.index()];
            let precision = ratio(tp, confusion.predicted(label));
            let recall = ratio(tp, confusion.support(label));
            ClassScores {
                label,
                precision,
                recall,
                f1: f1(precision, recall),
                support: confusion.support(label),
            }
        });

        let macro_avg = AverageScores {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / 3.0,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / 3.0,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / 3.0,
        };

        let total = confusion.total();
        let weighted = |score: fn(&ClassScores) -> f64| {
            if total == 0 {
                0.0
            } else {
                classes
                    .iter()
                    .map(|c| score(c) * c.support as f64)
                    .sum::<f64>()
                    / total as f64
            }
        };
        let weighted_avg = AverageScores {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
        };

        Self {
            classes,
            accuracy: ratio(confusion.correct(), total),
            macro_avg,
            weighted_avg,
            confusion,
        }
    }

    pub fn class(&self, label: Label) -> &ClassScores {
        &self.classes[label.index()]
    }

    pub fn support(&self) -> usize {
        self.confusion.total()
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>12} {:>10.4} {:>10.4} {:>10.4} {:>10}",
                c.label.to_string(),
                c.precision,
                c.recall,
                c.f1,
                c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10.4} {:>10}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.support()
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>12} {:>10.4} {:>10.4} {:>10.4} {:>10}",
                name,
                avg.precision,
                avg.recall,
                avg.f1,
                self.support()
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Confusion matrix (rows actual, columns predicted):")?;
        writeln!(f, "{:>12} {:>8} {:>8} {:>8}", "", "sell", "neutral", "buy")?;
        for label in Label::ALL {
            let row = &self.confusion.matrix[label.index()];
            writeln!(
                f,
                "{:>12} {:>8} {:>8} {:>8}",
                label.to_string(),
                row[0],
                row[1],
                row[2]
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Label::{Buy, Neutral, Sell};

    #[test]
    fn perfect_predictions() {
        let y = [Sell, Neutral, Buy, Buy];
        let report = ClassificationReport::from_labels(&y, &y);
        assert_eq!(report.accuracy, 1.0);
        for c in &report.classes {
            assert_eq!(c.precision, 1.0);
            assert_eq!(c.recall, 1.0);
        }
        assert_eq!(report.class(Buy).support, 2);
        assert_eq!(report.confusion.correct(), 4);
    }

    #[test]
    fn hand_computed_scores() {
        let actual = [Buy, Buy, Buy, Sell, Sell, Neutral];
        let predicted = [Buy, Buy, Sell, Sell, Buy, Neutral];
        let report = ClassificationReport::from_labels(&actual, &predicted);

        let buy = report.class(Buy);
        assert!((buy.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((buy.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(buy.support, 3);

        let sell = report.class(Sell);
        assert!((sell.precision - 0.5).abs() < 1e-12);
        assert!((sell.recall - 0.5).abs() < 1e-12);
        assert!((sell.f1 - 0.5).abs() < 1e-12);

        assert!((report.accuracy - 4.0 / 6.0).abs() < 1e-12);
        assert_eq!(report.confusion.matrix[Buy.index()][Sell.index()], 1);
        assert_eq!(report.confusion.matrix[Sell.index()][Buy.index()], 1);
    }

    #[test]
    fn absent_class_scores_zero() {
        let y = [Buy, Buy];
        let report = ClassificationReport::from_labels(&y, &y);
        assert_eq!(report.class(Sell).support, 0);
        assert_eq!(report.class(Sell).f1, 0.0);
        assert!((report.macro_avg.f1 - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(report.weighted_avg.f1, 1.0);
    }

    #[test]
    fn empty_report_is_zero() {
        let report = ClassificationReport::from_labels(&[], &[]);
        assert_eq!(report.accuracy, 0.0);
        assert_eq!(report.weighted_avg.precision, 0.0);
    }

    #[test]
    fn display_lists_every_class() {
        let report = ClassificationReport::from_labels(&[Sell, Buy], &[Sell, Neutral]);
        let text = report.to_string();
        for needle in ["sell", "neutral", "buy", "accuracy", "macro avg", "weighted avg"] {
            assert!(text.contains(needle), "missing {needle}:\n{text}");
        }
    }
}
