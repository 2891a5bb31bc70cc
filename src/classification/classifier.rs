use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::encoder::{EncodingMode, FeatureEncoder};
use super::errors::ClassificationError;
use super::result::ClassificationResult;
use super::schema::ClassificationSchema;
use crate::config::ClassificationSettings;
use crate::data::DataHandle;
use crate::ml::LabeledVector;
use crate::ml::logreg::{OnlineLogisticRegression, VectorClassifier, train_shuffled};

/// When training examples reach the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingMode {
    /// Every `train` call updates the model immediately.
    #[default]
    Online,
    /// `train` only buffers; the model learns in `train_buffered`.
    Offline,
}

/// Encoded class of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassLabel {
    Known(usize),
    /// Value absent from the class map.
    Unknown,
}

/// A classifier that learns row by row from table handles.
pub trait ClassificationMethod: Send {
    /// Learn from `row`, reading features from `features` and the class from `class`.
    fn train(
        &mut self,
        features: &dyn DataHandle,
        class: &dyn DataHandle,
        row: usize,
    ) -> Result<(), ClassificationError>;

    fn classify(
        &self,
        features: &dyn DataHandle,
        row: usize,
    ) -> Result<ClassificationResult, ClassificationError>;
}

/// Examples buffered by an offline classifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedDataset {
    examples: Vec<LabeledVector>,
}

impl EncodedDataset {
    pub fn examples(&self) -> &[LabeledVector] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn into_examples(self) -> Vec<LabeledVector> {
        self.examples
    }
}

/// Encodes table rows and feeds them to a vector classifier, online or in
/// buffered batches.
pub struct IncrementalClassifier<M = OnlineLogisticRegression> {
    schema: Arc<ClassificationSchema>,
    encoder: FeatureEncoder,
    input: Arc<dyn DataHandle>,
    model: M,
    mode: TrainingMode,
    buffer: EncodedDataset,
    epochs: usize,
    seed: u64,
}

impl IncrementalClassifier<OnlineLogisticRegression> {
    /// Logistic-regression classifier configured from `settings`.
    ///
    /// `input` is the unaggregated handle consulted for microaggregated
    /// features when classifying.
    pub fn new(
        schema: Arc<ClassificationSchema>,
        settings: &ClassificationSettings,
        input: Arc<dyn DataHandle>,
    ) -> Result<Self, ClassificationError> {
        let model = OnlineLogisticRegression::new(
            schema.class_map().len(),
            settings.vector_length,
            settings.logreg_options(),
        )?;
        Ok(Self::with_model(schema, model, input, settings.training_mode)
            .epochs(settings.epochs)
            .seed(settings.seed))
    }
}

impl<M: VectorClassifier> IncrementalClassifier<M> {
    pub fn with_model(
        schema: Arc<ClassificationSchema>,
        model: M,
        input: Arc<dyn DataHandle>,
        mode: TrainingMode,
    ) -> Self {
        Self {
            encoder: FeatureEncoder::new(model.vector_length()),
            schema,
            input,
            model,
            mode,
            buffer: EncodedDataset::default(),
            epochs: 1,
            seed: 0,
        }
    }

    /// Passes over the buffer in `train_buffered`.
    pub fn epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs.max(1);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn mode(&self) -> TrainingMode {
        self.mode
    }

    pub fn schema(&self) -> &Arc<ClassificationSchema> {
        &self.schema
    }

    /// Examples buffered so far; always empty in online mode.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn encode_class(&self, handle: &dyn DataHandle, row: usize) -> ClassLabel {
        handle
            .value(row, self.schema.class_index())
            .and_then(|value| self.schema.class_map().index_of(value))
            .map_or(ClassLabel::Unknown, ClassLabel::Known)
    }

    pub fn encode_features(
        &self,
        handle: &dyn DataHandle,
        row: usize,
        mode: EncodingMode,
    ) -> Vec<f64> {
        self.encoder
            .encode(&self.schema, handle, self.input.as_ref(), row, mode)
    }

    /// Train on every buffered example for the configured epochs. A no-op in
    /// online mode. Returns the number of model updates.
    pub fn train_buffered(
        &mut self,
        is_cancelled: impl Fn() -> bool,
    ) -> Result<usize, ClassificationError> {
        if self.mode == TrainingMode::Online || self.buffer.is_empty() {
            return Ok(0);
        }
        let updates = train_shuffled(
            &mut self.model,
            self.buffer.examples(),
            self.epochs,
            self.seed,
            is_cancelled,
        )?;
        debug!(
            examples = self.buffer.len(),
            epochs = self.epochs,
            updates,
            "Trained on buffered examples"
        );
        Ok(updates)
    }

    /// Release the model and hand back the offline buffer.
    pub fn close(mut self) -> EncodedDataset {
        self.model.close();
        std::mem::take(&mut self.buffer)
    }
}

impl<M: VectorClassifier> ClassificationMethod for IncrementalClassifier<M> {
    /// Rows with an unknown class are skipped.
    fn train(
        &mut self,
        features: &dyn DataHandle,
        class: &dyn DataHandle,
        row: usize,
    ) -> Result<(), ClassificationError> {
        let ClassLabel::Known(class) = self.encode_class(class, row) else {
            trace!(row, "Skipping row with unknown class");
            return Ok(());
        };
        let encoded = self.encode_features(features, row, EncodingMode::Training);
        match self.mode {
            TrainingMode::Online => self.model.train(class, &encoded),
            TrainingMode::Offline => {
                self.buffer.examples.push(LabeledVector {
                    class,
                    features: encoded,
                });
                Ok(())
            }
        }
    }

    fn classify(
        &self,
        features: &dyn DataHandle,
        row: usize,
    ) -> Result<ClassificationResult, ClassificationError> {
        let encoded = self.encode_features(features, row, EncodingMode::Classifying);
        let probabilities = self.model.classify_full(&encoded)?;
        Ok(ClassificationResult::new(
            probabilities,
            Arc::clone(self.schema.class_map()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::schema::FeatureMetadata;
    use crate::data::DataTable;

    fn data() -> Arc<dyn DataHandle> {
        Arc::new(
            DataTable::new(
                ["zip", "disease"],
                [
                    ["81667", "flu"],
                    ["81675", "cold"],
                    ["81667", "flu"],
                    ["81675", "cold"],
                    ["99999", "unseen"],
                ],
            )
            .unwrap(),
        )
    }

    fn classifier(mode: TrainingMode) -> IncrementalClassifier {
        let handle = data();
        let schema = Arc::new(
            ClassificationSchema::new(
                1,
                crate::classification::ClassMap::new(["flu", "cold"]),
                vec![(0, FeatureMetadata::categorical("zip"))],
            )
            .unwrap(),
        );
        let settings = ClassificationSettings {
            vector_length: 128,
            training_mode: mode,
            ..ClassificationSettings::default()
        };
        IncrementalClassifier::new(schema, &settings, handle).unwrap()
    }

    #[test]
    fn unmapped_class_is_unknown() {
        let handle = data();
        let classifier = classifier(TrainingMode::Online);
        assert_eq!(classifier.encode_class(handle.as_ref(), 1), ClassLabel::Known(1));
        assert_eq!(classifier.encode_class(handle.as_ref(), 4), ClassLabel::Unknown);
        assert_eq!(classifier.encode_class(handle.as_ref(), 99), ClassLabel::Unknown);
    }

    #[test]
    fn online_training_updates_immediately() {
        let handle = data();
        let mut classifier = classifier(TrainingMode::Online);
        let before = classifier.classify(handle.as_ref(), 0).unwrap();
        classifier.train(handle.as_ref(), handle.as_ref(), 0).unwrap();
        let after = classifier.classify(handle.as_ref(), 0).unwrap();
        assert_ne!(before.probabilities(), after.probabilities());
        assert_eq!(after.predicted_class(), Some("flu"));
        assert!(classifier.close().is_empty());
    }

    #[test]
    fn offline_training_waits_for_batch() {
        let handle = data();
        let mut classifier = classifier(TrainingMode::Offline);
        let before = classifier.classify(handle.as_ref(), 0).unwrap();
        for row in 0..handle.num_rows() {
            classifier.train(handle.as_ref(), handle.as_ref(), row).unwrap();
        }
        assert_eq!(classifier.buffered(), 4);
        let unchanged = classifier.classify(handle.as_ref(), 0).unwrap();
        assert_eq!(before, unchanged);

        assert_eq!(classifier.train_buffered(|| false).unwrap(), 4);
        let trained = classifier.classify(handle.as_ref(), 0).unwrap();
        assert_ne!(before.probabilities(), trained.probabilities());

        let buffer = classifier.close();
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.examples()[0].class, 0);
    }

    #[test]
    fn batch_training_can_be_cancelled() {
        let handle = data();
        let mut classifier = classifier(TrainingMode::Offline);
        classifier.train(handle.as_ref(), handle.as_ref(), 0).unwrap();
        assert_eq!(
            classifier.train_buffered(|| true).unwrap_err(),
            ClassificationError::Interrupted
        );
    }
}
