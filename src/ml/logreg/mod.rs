//! Multinomial logistic regression trained online by stochastic gradient descent.

use serde::{Deserialize, Serialize};

use crate::classification::ClassificationError;

mod train;
pub use train::{learning_rate_at, softmax, train_shuffled};

/// Regularization prior applied to weights touched by an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorFunction {
    Uniform,
    #[default]
    L1,
    L2,
    ElasticBand,
}

/// Step size and regularization knobs for [`OnlineLogisticRegression`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRegOptions {
    pub prior: PriorFunction,
    pub learning_rate: f64,
    pub alpha: f64,
    pub lambda: f64,
    pub step_offset: u32,
    pub decay_exponent: f64,
}

impl Default for LogRegOptions {
    fn default() -> Self {
        Self {
            prior: PriorFunction::L1,
            learning_rate: 1.0,
            alpha: 1.0,
            lambda: 1e-5,
            step_offset: 10,
            decay_exponent: 0.5,
        }
    }
}

/// Backend that maps fixed-length numeric vectors to class probabilities.
pub trait VectorClassifier: Send {
    fn num_classes(&self) -> usize;

    fn vector_length(&self) -> usize;

    /// Apply one update for an example of `class`.
    fn train(&mut self, class: usize, features: &[f64]) -> Result<(), ClassificationError>;

    /// Probability of every class, in class-index order.
    fn classify_full(&self, features: &[f64]) -> Result<Vec<f64>, ClassificationError>;

    /// Release the model. Further `train`/`classify_full` calls fail.
    fn close(&mut self);
}

/// Online softmax regression with annealed learning rate and lazy priors.
#[derive(Debug, Clone)]
pub struct OnlineLogisticRegression {
    num_classes: usize,
    vector_length: usize,
    options: LogRegOptions,
    /// Row-major `num_classes x vector_length`.
    weights: Vec<f64>,
    step: u64,
    closed: bool,
}

impl OnlineLogisticRegression {
    pub fn new(
        num_classes: usize,
        vector_length: usize,
        options: LogRegOptions,
    ) -> Result<Self, ClassificationError> {
        if num_classes < 2 {
            return Err(ClassificationError::InvalidConfiguration(format!(
                "at least two classes required, got {num_classes}"
            )));
        }
        if vector_length == 0 {
            return Err(ClassificationError::InvalidConfiguration(
                "vector length must be positive".to_string(),
            ));
        }
        Ok(Self {
            num_classes,
            vector_length,
            options,
            weights: vec![0.0; num_classes * vector_length],
            step: 0,
            closed: false,
        })
    }

    pub fn options(&self) -> &LogRegOptions {
        &self.options
    }

    /// Number of updates applied so far.
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check(&self, features: &[f64]) -> Result<(), ClassificationError> {
        if self.closed {
            return Err(ClassificationError::Closed);
        }
        if features.len() != self.vector_length {
            return Err(ClassificationError::VectorLength {
                expected: self.vector_length,
                found: features.len(),
            });
        }
        Ok(())
    }

    fn logits(&self, features: &[f64]) -> Vec<f64> {
        self.weights
            .chunks_exact(self.vector_length)
            .map(|row| row.iter().zip(features).map(|(w, x)| w * x).sum())
            .collect()
    }
}

impl VectorClassifier for OnlineLogisticRegression {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn vector_length(&self) -> usize {
        self.vector_length
    }

    fn train(&mut self, class: usize, features: &[f64]) -> Result<(), ClassificationError> {
        self.check(features)?;
        if class >= self.num_classes {
            return Err(ClassificationError::ClassOutOfRange {
                class,
                classes: self.num_classes,
            });
        }
        let rate = learning_rate_at(&self.options, self.step);
        let shrink = rate * self.options.lambda;
        let probs = softmax(&self.logits(features));
        for (c, row) in self.weights.chunks_exact_mut(self.vector_length).enumerate() {
            let target = if c == class { 1.0 } else { 0.0 };
            let gradient = target - probs[c];
            for (weight, &x) in row.iter_mut().zip(features) {
                if x == 0.0 {
                    continue;
                }
                let updated = *weight + rate * gradient * x;
                *weight = train::regularize(self.options.prior, updated, shrink);
            }
        }
        self.step += 1;
        Ok(())
    }

    fn classify_full(&self, features: &[f64]) -> Result<Vec<f64>, ClassificationError> {
        self.check(features)?;
        Ok(softmax(&self.logits(features)))
    }

    fn close(&mut self) {
        if !self.closed {
            tracing::debug!(steps = self.step, "Closing logistic regression model");
            self.closed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> OnlineLogisticRegression {
        OnlineLogisticRegression::new(2, 4, LogRegOptions::default()).unwrap()
    }

    #[test]
    fn untrained_model_is_uniform() {
        let out = model().classify_full(&[1.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(out, vec![0.5, 0.5]);
    }

    #[test]
    fn training_moves_probability_towards_target() {
        let mut lr = model();
        let x = [1.0, 0.0, 1.0, 0.0];
        for _ in 0..40 {
            lr.train(1, &x).unwrap();
        }
        let out = lr.classify_full(&x).unwrap();
        assert!(out[1] > 0.9, "{out:?}");
        assert_eq!(lr.step(), 40);
        assert_eq!(lr.weights()[1], 0.0);
    }

    #[test]
    fn rejects_bad_input() {
        let mut lr = model();
        assert_eq!(
            lr.train(0, &[1.0]).unwrap_err(),
            ClassificationError::VectorLength {
                expected: 4,
                found: 1
            }
        );
        assert_eq!(
            lr.train(2, &[0.0; 4]).unwrap_err(),
            ClassificationError::ClassOutOfRange {
                class: 2,
                classes: 2
            }
        );
        assert!(OnlineLogisticRegression::new(1, 4, LogRegOptions::default()).is_err());
    }

    #[test]
    fn closed_model_refuses_work() {
        let mut lr = model();
        lr.close();
        lr.close();
        assert!(lr.is_closed());
        assert_eq!(lr.classify_full(&[0.0; 4]), Err(ClassificationError::Closed));
        assert_eq!(lr.train(0, &[0.0; 4]), Err(ClassificationError::Closed));
    }

    #[test]
    fn prior_names_round_trip_through_serde() {
        let prior: PriorFunction = serde_json::from_str("\"elastic_band\"").unwrap();
        assert_eq!(prior, PriorFunction::ElasticBand);
        assert_eq!(PriorFunction::default(), PriorFunction::L1);
    }
}
