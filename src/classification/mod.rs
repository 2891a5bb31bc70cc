//! Row-oriented classification over anonymized tables.
//!
//! A [`ClassificationSchema`] names the class column and the feature columns.
//! [`IncrementalClassifier`] hashes each row into a fixed-length vector and
//! trains a logistic-regression backend on it, either immediately (online) or
//! from a buffer (offline). [`ClassificationAnalysis`] wraps a full train and
//! score pass as a cancellable [`crate::analysis::AnalysisTask`].

mod classifier;
mod encoder;
mod errors;
mod job;
mod result;
mod schema;
mod zero_r;

pub use classifier::{
    ClassLabel, ClassificationMethod, EncodedDataset, IncrementalClassifier, TrainingMode,
};
pub use encoder::{EncodingMode, FeatureEncoder};
pub use errors::ClassificationError;
pub use job::{ClassificationAnalysis, ClassificationSummary};
pub use result::ClassificationResult;
pub use schema::{ClassMap, ClassificationSchema, FeatureMetadata};
pub use zero_r::ZeroR;
