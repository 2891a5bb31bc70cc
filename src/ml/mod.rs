//! Numeric classifier backends and evaluation helpers.
//!
//! Backends work on already encoded vectors; turning table rows into vectors
//! is the job of [`crate::classification`].

pub mod logreg;
pub mod metrics;

/// Encoded training example: class index plus feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledVector {
    pub class: usize,
    pub features: Vec<f64>,
}
