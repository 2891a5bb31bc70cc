use super::schema::ClassificationSchema;
use crate::data::DataHandle;

const INTERCEPT_ENCODER: &str = "intercept";
const FEATURE_ENCODER: &str = "feature";
const INTERCEPT_TOKEN: &str = "1";
/// Token added when the schema has no feature columns.
const NO_FEATURES_TOKEN: &str = "Feature:1";

/// Which handle feature values are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingMode {
    /// Always read the handle passed in.
    Training,
    /// Microaggregated numeric features read the unaggregated input handle.
    Classifying,
}

/// Hashes intercept and feature tokens into a fixed-length dense vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureEncoder {
    vector_length: usize,
}

impl FeatureEncoder {
    pub fn new(vector_length: usize) -> Self {
        Self {
            vector_length: vector_length.max(1),
        }
    }

    pub fn vector_length(&self) -> usize {
        self.vector_length
    }

    /// Encode `row`. Missing cells encode as the empty categorical token.
    pub fn encode(
        &self,
        schema: &ClassificationSchema,
        handle: &dyn DataHandle,
        input: &dyn DataHandle,
        row: usize,
        mode: EncodingMode,
    ) -> Vec<f64> {
        let mut vector = vec![0.0; self.vector_length];
        self.add(&mut vector, INTERCEPT_ENCODER, INTERCEPT_TOKEN, 1.0);

        if schema.features().is_empty() {
            self.add(&mut vector, FEATURE_ENCODER, NO_FEATURES_TOKEN, 1.0);
            return vector;
        }

        for (column, metadata) in schema.features() {
            let source = match mode {
                EncodingMode::Classifying if metadata.numeric_microaggregation => input,
                _ => handle,
            };
            let value = source.value(row, *column).unwrap_or_default();
            match metadata.numeric_value(value) {
                Some(number) => {
                    self.add(&mut vector, FEATURE_ENCODER, &format!("Attribute-{column}"), number)
                }
                None => self.add(
                    &mut vector,
                    FEATURE_ENCODER,
                    &format!("Attribute-{column}:{value}"),
                    1.0,
                ),
            }
        }
        vector
    }

    fn add(&self, vector: &mut [f64], encoder: &str, token: &str, weight: f64) {
        vector[self.position(encoder, token)] += weight;
    }

    /// Slot of `token` under `encoder`; stable across runs and platforms.
    pub fn position(&self, encoder: &str, token: &str) -> usize {
        let mut hasher = blake3::Hasher::new();
        hasher.update(encoder.as_bytes());
        hasher.update(&[0]);
        hasher.update(token.as_bytes());
        let digest = hasher.finalize();
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest.as_bytes()[..8]);
        (u64::from_le_bytes(prefix) % self.vector_length as u64) as usize
    }
}
