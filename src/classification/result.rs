use std::sync::Arc;

use super::schema::ClassMap;

/// Class probabilities for one row together with the map that names them.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    probabilities: Vec<f64>,
    class_map: Arc<ClassMap>,
}

impl ClassificationResult {
    pub fn new(probabilities: Vec<f64>, class_map: Arc<ClassMap>) -> Self {
        Self {
            probabilities,
            class_map,
        }
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn class_map(&self) -> &ClassMap {
        &self.class_map
    }

    /// Index of the most probable class; ties go to the lower index.
    pub fn predicted_index(&self) -> Option<usize> {
        self.probabilities
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (idx, &p)| match best {
                Some((_, top)) if top >= p => best,
                _ => Some((idx, p)),
            })
            .map(|(idx, _)| idx)
    }

    pub fn predicted_class(&self) -> Option<&str> {
        self.predicted_index()
            .and_then(|idx| self.class_map.name(idx))
    }

    /// Probability of the predicted class.
    pub fn confidence(&self) -> f64 {
        self.predicted_index()
            .map(|idx| self.probabilities[idx])
            .unwrap_or(0.0)
    }

    pub fn is_correct(&self, actual: &str) -> bool {
        self.predicted_class() == Some(actual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_most_probable_class() {
        let map = Arc::new(ClassMap::new(["flu", "cold", "none"]));
        let result = ClassificationResult::new(vec![0.2, 0.5, 0.3], map);
        assert_eq!(result.predicted_class(), Some("cold"));
        assert_eq!(result.confidence(), 0.5);
        assert!(result.is_correct("cold"));
        assert!(!result.is_correct("flu"));
    }

    #[test]
    fn ties_prefer_first_class() {
        let map = Arc::new(ClassMap::new(["a", "b"]));
        let result = ClassificationResult::new(vec![0.5, 0.5], map);
        assert_eq!(result.predicted_index(), Some(0));
    }

    #[test]
    fn empty_result_predicts_nothing() {
        let result = ClassificationResult::new(Vec::new(), Arc::new(ClassMap::default()));
        assert_eq!(result.predicted_class(), None);
        assert_eq!(result.confidence(), 0.0);
    }
}
