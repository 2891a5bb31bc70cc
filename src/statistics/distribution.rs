use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance used when checking that unfiltered frequencies sum to one.
pub const FREQUENCY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DistributionError {
    #[error("Distribution has {values} values but {frequencies} frequencies")]
    LengthMismatch { values: usize, frequencies: usize },
    #[error("Distribution lists value {0:?} more than once")]
    DuplicateValue(String),
}

/// Relative frequencies of the distinct values of one column.
///
/// `values` and `frequency` are parallel; `count` is the number of records the
/// distribution summarizes. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyDistribution {
    values: Vec<String>,
    frequency: Vec<f64>,
    count: usize,
}

impl FrequencyDistribution {
    pub fn new(
        values: Vec<String>,
        frequency: Vec<f64>,
        count: usize,
    ) -> Result<Self, DistributionError> {
        if values.len() != frequency.len() {
            return Err(DistributionError::LengthMismatch {
                values: values.len(),
                frequencies: frequency.len(),
            });
        }
        let mut seen = HashSet::with_capacity(values.len());
        for value in &values {
            if !seen.insert(value.as_str()) {
                return Err(DistributionError::DuplicateValue(value.clone()));
            }
        }
        Ok(Self {
            values,
            frequency,
            count,
        })
    }

    /// Build from absolute counts already in display order.
    pub fn from_counts(entries: Vec<(String, usize)>) -> Result<Self, DistributionError> {
        let count: usize = entries.iter().map(|(_, n)| n).sum();
        let (values, frequency) = entries
            .into_iter()
            .map(|(value, n)| {
                let share = if count == 0 {
                    0.0
                } else {
                    n as f64 / count as f64
                };
                (value, share)
            })
            .unzip();
        Self::new(values, frequency, count)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn frequency(&self) -> &[f64] {
        &self.frequency
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(value, frequency)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.values
            .iter()
            .map(String::as_str)
            .zip(self.frequency.iter().copied())
    }

    pub fn frequency_of(&self, value: &str) -> Option<f64> {
        self.iter()
            .find(|(candidate, _)| *candidate == value)
            .map(|(_, frequency)| frequency)
    }

    /// Whether frequencies sum to one within [`FREQUENCY_TOLERANCE`].
    pub fn is_normalized(&self) -> bool {
        let total: f64 = self.frequency.iter().sum();
        (total - 1.0).abs() <= FREQUENCY_TOLERANCE
    }

    /// Keep only the entries at the given original positions, in the given order.
    ///
    /// Each frequency is read at its value's original index. Out-of-range and
    /// repeated positions are skipped.
    pub(crate) fn select(self, positions: &[usize]) -> Self {
        let Self {
            values,
            frequency,
            count,
        } = self;
        let mut slots: Vec<Option<String>> = values.into_iter().map(Some).collect();
        let mut kept_values = Vec::with_capacity(positions.len());
        let mut kept_frequency = Vec::with_capacity(positions.len());
        for &original in positions {
            if let Some(value) = slots.get_mut(original).and_then(Option::take) {
                kept_values.push(value);
                kept_frequency.push(frequency[original]);
            }
        }
        Self {
            values: kept_values,
            frequency: kept_frequency,
            count,
        }
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<f64>, usize) {
        (self.values, self.frequency, self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_lengths() {
        let err = FrequencyDistribution::new(vec!["a".into()], vec![0.5, 0.5], 2).unwrap_err();
        assert_eq!(
            err,
            DistributionError::LengthMismatch {
                values: 1,
                frequencies: 2
            }
        );
    }

    #[test]
    fn rejects_duplicate_values() {
        let err = FrequencyDistribution::new(vec!["a".into(), "a".into()], vec![0.5, 0.5], 2)
            .unwrap_err();
        assert_eq!(err, DistributionError::DuplicateValue("a".to_string()));
    }

    #[test]
    fn from_counts_normalizes() {
        let dist = FrequencyDistribution::from_counts(vec![
            ("x".into(), 1),
            ("y".into(), 3),
        ])
        .unwrap();
        assert_eq!(dist.count(), 4);
        assert_eq!(dist.frequency(), &[0.25, 0.75]);
        assert!(dist.is_normalized());
        assert_eq!(dist.frequency_of("y"), Some(0.75));
        assert_eq!(dist.frequency_of("z"), None);
    }

    #[test]
    fn empty_counts_produce_empty_distribution() {
        let dist = FrequencyDistribution::from_counts(Vec::new()).unwrap();
        assert!(dist.is_empty());
        assert_eq!(dist.count(), 0);
    }
}
