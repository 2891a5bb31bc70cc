use thiserror::Error;

use crate::analysis::AnalysisError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("Invalid classifier configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Unknown attribute {0:?}")]
    UnknownAttribute(String),
    #[error("Feature vector has length {found}, expected {expected}")]
    VectorLength { expected: usize, found: usize },
    #[error("Class index {class} out of range for {classes} classes")]
    ClassOutOfRange { class: usize, classes: usize },
    #[error("Classifier already closed")]
    Closed,
    #[error("Classification interrupted")]
    Interrupted,
}

impl From<ClassificationError> for AnalysisError {
    fn from(err: ClassificationError) -> Self {
        match err {
            ClassificationError::Interrupted => AnalysisError::Interrupted,
            other => AnalysisError::failed(other),
        }
    }
}
