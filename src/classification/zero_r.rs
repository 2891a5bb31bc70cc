use std::sync::Arc;

use super::classifier::ClassificationMethod;
use super::errors::ClassificationError;
use super::result::ClassificationResult;
use super::schema::ClassificationSchema;
use crate::data::DataHandle;

/// Baseline that ignores features and predicts the class distribution seen
/// during training.
#[derive(Debug, Clone)]
pub struct ZeroR {
    schema: Arc<ClassificationSchema>,
    counts: Vec<usize>,
}

impl ZeroR {
    pub fn new(schema: Arc<ClassificationSchema>) -> Self {
        let counts = vec![0; schema.class_map().len()];
        Self { schema, counts }
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }
}

impl ClassificationMethod for ZeroR {
    fn train(
        &mut self,
        _features: &dyn DataHandle,
        class: &dyn DataHandle,
        row: usize,
    ) -> Result<(), ClassificationError> {
        let known = class
            .value(row, self.schema.class_index())
            .and_then(|value| self.schema.class_map().index_of(value));
        if let Some(index) = known {
            self.counts[index] += 1;
        }
        Ok(())
    }

    fn classify(
        &self,
        _features: &dyn DataHandle,
        _row: usize,
    ) -> Result<ClassificationResult, ClassificationError> {
        let total: usize = self.counts.iter().sum();
        let probabilities = if total == 0 {
            vec![1.0 / self.counts.len().max(1) as f64; self.counts.len()]
        } else {
            self.counts
                .iter()
                .map(|&count| count as f64 / total as f64)
                .collect()
        };
        Ok(ClassificationResult::new(
            probabilities,
            Arc::clone(self.schema.class_map()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::ClassMap;
    use crate::data::DataTable;

    #[test]
    fn predicts_majority_class() {
        let table = DataTable::new(
            ["x", "disease"],
            [["1", "cold"], ["2", "flu"], ["3", "flu"], ["4", "???"]],
        )
        .unwrap();
        let schema = Arc::new(
            ClassificationSchema::new(1, ClassMap::new(["cold", "flu"]), Vec::new()).unwrap(),
        );
        let mut zero_r = ZeroR::new(schema);
        let untrained = zero_r.classify(&table, 0).unwrap();
        assert_eq!(untrained.probabilities(), &[0.5, 0.5]);

        for row in 0..table.num_rows() {
            zero_r.train(&table, &table, row).unwrap();
        }
        assert_eq!(zero_r.counts(), &[1, 2]);
        let result = zero_r.classify(&table, 0).unwrap();
        assert_eq!(result.predicted_class(), Some("flu"));
        assert!((result.confidence() - 2.0 / 3.0).abs() < 1e-12);
    }
}
