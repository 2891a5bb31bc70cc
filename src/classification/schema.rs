use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::errors::ClassificationError;
use crate::data::DataHandle;

/// Bijection between class values and dense class indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassMap {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl ClassMap {
    /// Map `names` to indices in order; repeated names keep their first index.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = Self::default();
        for name in names {
            let name = name.into();
            if !map.index.contains_key(&name) {
                map.index.insert(name.clone(), map.names.len());
                map.names.push(name);
            }
        }
        map
    }

    /// Distinct values of `column`, sorted.
    pub fn from_column(handle: &dyn DataHandle, column: usize) -> Self {
        let distinct: BTreeSet<&str> = (0..handle.num_rows())
            .filter_map(|row| handle.value(row, column))
            .collect();
        Self::new(distinct)
    }

    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.index.get(value).copied()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// How one feature attribute is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureMetadata {
    pub name: String,
    /// Encode parseable values as a scalar instead of a token.
    pub numeric: bool,
    /// Values were microaggregated; classify against the unaggregated input.
    pub numeric_microaggregation: bool,
}

impl FeatureMetadata {
    pub fn categorical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            numeric: false,
            numeric_microaggregation: false,
        }
    }

    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            numeric: true,
            ..Self::categorical(name)
        }
    }

    pub fn microaggregated(name: impl Into<String>) -> Self {
        Self {
            numeric_microaggregation: true,
            ..Self::numeric(name)
        }
    }

    /// Scalar value of `value`, or `None` when it must be encoded as a token.
    pub fn numeric_value(&self, value: &str) -> Option<f64> {
        if !self.numeric {
            return None;
        }
        value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

/// Immutable description of a classification job: the class column, its
/// value map and the feature columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationSchema {
    class_index: usize,
    class_map: Arc<ClassMap>,
    features: Vec<(usize, FeatureMetadata)>,
}

impl ClassificationSchema {
    pub fn new(
        class_index: usize,
        class_map: ClassMap,
        features: Vec<(usize, FeatureMetadata)>,
    ) -> Result<Self, ClassificationError> {
        if class_map.is_empty() {
            return Err(ClassificationError::InvalidConfiguration(
                "class map is empty".to_string(),
            ));
        }
        if let Some((_, feature)) = features.iter().find(|(column, _)| *column == class_index) {
            return Err(ClassificationError::InvalidConfiguration(format!(
                "feature {:?} is also the class attribute",
                feature.name
            )));
        }
        Ok(Self {
            class_index,
            class_map: Arc::new(class_map),
            features,
        })
    }

    /// Resolve attribute names against `handle` and derive the class map from
    /// the values of the class column.
    pub fn from_handle(
        handle: &dyn DataHandle,
        class_attribute: &str,
        features: Vec<FeatureMetadata>,
    ) -> Result<Self, ClassificationError> {
        let class_index = handle
            .column_index_of(class_attribute)
            .ok_or_else(|| ClassificationError::UnknownAttribute(class_attribute.to_string()))?;
        let features = features
            .into_iter()
            .map(|feature| match handle.column_index_of(&feature.name) {
                Some(column) => Ok((column, feature)),
                None => Err(ClassificationError::UnknownAttribute(feature.name)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(
            class_index,
            ClassMap::from_column(handle, class_index),
            features,
        )
    }

    pub fn class_index(&self) -> usize {
        self.class_index
    }

    pub fn class_map(&self) -> &Arc<ClassMap> {
        &self.class_map
    }

    /// Feature columns with their metadata, in encoding order.
    pub fn features(&self) -> &[(usize, FeatureMetadata)] {
        &self.features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataTable;

    fn table() -> DataTable {
        DataTable::new(
            ["age", "zip", "disease"],
            [
                ["34", "81667", "flu"],
                ["45", "81675", "cold"],
                ["34", "81667", "flu"],
            ],
        )
        .unwrap()
    }

    #[test]
    fn class_map_deduplicates_in_order() {
        let map = ClassMap::new(["b", "a", "b"]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.index_of("a"), Some(1));
        assert_eq!(map.name(0), Some("b"));
        assert_eq!(map.index_of("z"), None);
    }

    #[test]
    fn numeric_value_respects_flag() {
        assert_eq!(FeatureMetadata::numeric("age").numeric_value(" 42 "), Some(42.0));
        assert_eq!(FeatureMetadata::numeric("age").numeric_value("4*"), None);
        assert_eq!(FeatureMetadata::categorical("zip").numeric_value("81667"), None);
        assert!(FeatureMetadata::microaggregated("age").numeric);
    }

    #[test]
    fn resolves_columns_from_handle() {
        let schema = ClassificationSchema::from_handle(
            &table(),
            "disease",
            vec![FeatureMetadata::numeric("age"), FeatureMetadata::categorical("zip")],
        )
        .unwrap();
        assert_eq!(schema.class_index(), 2);
        assert_eq!(schema.class_map().names(), &["cold", "flu"]);
        assert_eq!(schema.features()[1].0, 1);
    }

    #[test]
    fn rejects_unknown_and_overlapping_attributes() {
        assert_eq!(
            ClassificationSchema::from_handle(&table(), "sex", Vec::new()).unwrap_err(),
            ClassificationError::UnknownAttribute("sex".to_string())
        );
        assert!(matches!(
            ClassificationSchema::from_handle(
                &table(),
                "disease",
                vec![FeatureMetadata::categorical("disease")]
            ),
            Err(ClassificationError::InvalidConfiguration(_))
        ));
    }
}
