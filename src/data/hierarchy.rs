use std::collections::HashMap;

use super::table::{DataError, parse_records};

/// Value generalization hierarchy for one attribute.
///
/// Each row lists a raw value (level 0) followed by its increasingly general
/// replacements, e.g. `["81667", "8166*", "816**", "*"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hierarchy {
    rows: Vec<Vec<String>>,
    lookup: HashMap<String, usize>,
}

impl Hierarchy {
    pub fn new<R>(rows: R) -> Result<Self, DataError>
    where
        R: IntoIterator,
        R::Item: IntoIterator,
        <R::Item as IntoIterator>::Item: Into<String>,
    {
        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let mut lookup = HashMap::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != width || width == 0 {
                return Err(DataError::HierarchyWidth {
                    row: idx,
                    expected: width.max(1),
                    found: row.len(),
                });
            }
            if lookup.insert(row[0].clone(), idx).is_some() {
                return Err(DataError::DuplicateHierarchyValue(row[0].clone()));
            }
        }
        Ok(Self { rows, lookup })
    }

    /// Parse one hierarchy row per line; there is no header.
    pub fn from_delimited(text: &str, delimiter: char) -> Result<Self, DataError> {
        Self::new(parse_records(text, delimiter))
    }

    /// Number of generalization levels, including the raw level.
    pub fn levels(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Replacement for the raw `value` at `level`, if the hierarchy knows it.
    pub fn generalize(&self, value: &str, level: usize) -> Option<&str> {
        let row = self.lookup.get(value)?;
        self.rows[*row].get(level).map(String::as_str)
    }

    /// Display order of every value mentioned in the hierarchy.
    ///
    /// Values are ranked by first appearance when scanning level by level,
    /// so raw values precede their generalizations.
    pub fn value_order(&self) -> HashMap<&str, usize> {
        let mut order = HashMap::new();
        for level in 0..self.levels() {
            for row in &self.rows {
                let next = order.len();
                order.entry(row[level].as_str()).or_insert(next);
            }
        }
        order
    }
}
