//! Evaluation metrics for classifiers.

use serde::{Deserialize, Serialize};

/// Confusion matrix for a `K`-class classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    /// Record one prediction; out-of-range indices are ignored.
    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&v| u64::from(v)).sum()
    }

    pub fn correct(&self) -> u64 {
        (0..self.n_classes)
            .map(|class| u64::from(self.get(class, class)))
            .sum()
    }
}

/// Precision and recall of a single class.
#[derive(Debug, Clone, PartialEq)]
pub struct PerClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f64,
    /// `TP / (TP + FN)`.
    pub recall: f64,
    /// Number of true examples of the class.
    pub support: u32,
}

pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    (0..k)
        .map(|class| {
            let tp = f64::from(cm.get(class, class));
            let support: u32 = (0..k).map(|j| cm.get(class, j)).sum();
            let predicted: u32 = (0..k).map(|i| cm.get(i, class)).sum();
            let fn_ = f64::from(support) - tp;
            let fp = f64::from(predicted) - tp;
            PerClassStats {
                precision: ratio(tp, tp + fp),
                recall: ratio(tp, tp + fn_),
                support,
            }
        })
        .collect()
}

/// Share of correct predictions, `0.0` for an empty matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f64 {
    ratio(cm.correct() as f64, cm.total() as f64)
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_and_per_class_stats() {
        let mut cm = ConfusionMatrix::new(2);
        cm.add(0, 0);
        cm.add(0, 0);
        cm.add(0, 1);
        cm.add(1, 1);
        cm.add(5, 0);
        assert_eq!(cm.total(), 4);
        assert!((accuracy(&cm) - 0.75).abs() < 1e-12);

        let stats = precision_recall_by_class(&cm);
        assert_eq!(stats[0].support, 3);
        assert!((stats[0].precision - 1.0).abs() < 1e-12);
        assert!((stats[0].recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((stats[1].precision - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_matrix_has_zero_accuracy() {
        assert_eq!(accuracy(&ConfusionMatrix::new(3)), 0.0);
    }
}
