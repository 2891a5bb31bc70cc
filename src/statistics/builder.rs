use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use ordered_float::OrderedFloat;
use thiserror::Error;

use super::distribution::{DistributionError, FrequencyDistribution};
use super::suppression::is_suppressed;
use crate::analysis::{AnalysisError, Interruptible, ProgressTracker};
use crate::data::{DataHandle, Hierarchy};

/// Share of the progress bar spent counting; the rest covers ordering.
const COUNTING_SHARE: usize = 90;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatisticsError {
    #[error("Column {column} out of range for {columns} columns")]
    ColumnOutOfRange { column: usize, columns: usize },
    #[error("Unknown attribute {0:?}")]
    UnknownAttribute(String),
    #[error("Statistics computation interrupted")]
    Interrupted,
    #[error(transparent)]
    Distribution(#[from] DistributionError),
}

impl From<StatisticsError> for AnalysisError {
    fn from(err: StatisticsError) -> Self {
        match err {
            StatisticsError::Interrupted => AnalysisError::Interrupted,
            other => AnalysisError::failed(other),
        }
    }
}

/// Computes frequency distributions while exposing progress and interruption.
pub trait DistributionComputer: Interruptible {
    /// Distribution of `column`; a hierarchy, when given, defines value order.
    fn compute_frequency_distribution(
        &self,
        column: usize,
        hierarchy: Option<&Hierarchy>,
    ) -> Result<FrequencyDistribution, StatisticsError>;
}

/// [`DistributionComputer`] over a shared [`DataHandle`].
///
/// Intended for a single computation: once interrupted it stays interrupted.
pub struct InterruptibleStatistics {
    handle: Arc<dyn DataHandle>,
    tracker: ProgressTracker,
    level: usize,
}

impl InterruptibleStatistics {
    pub fn new(handle: Arc<dyn DataHandle>) -> Self {
        Self {
            handle,
            tracker: ProgressTracker::new(),
            level: 0,
        }
    }

    /// Count values generalized to `level` of the hierarchy passed to
    /// [`DistributionComputer::compute_frequency_distribution`]. Values the
    /// hierarchy does not know are counted as they are.
    pub fn at_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }

    fn check(&self) -> Result<(), StatisticsError> {
        if self.tracker.is_interrupted() {
            Err(StatisticsError::Interrupted)
        } else {
            Ok(())
        }
    }
}

impl Interruptible for InterruptibleStatistics {
    fn progress(&self) -> u8 {
        self.tracker.progress()
    }

    fn interrupt(&self) {
        self.tracker.interrupt();
    }
}

impl DistributionComputer for InterruptibleStatistics {
    fn compute_frequency_distribution(
        &self,
        column: usize,
        hierarchy: Option<&Hierarchy>,
    ) -> Result<FrequencyDistribution, StatisticsError> {
        let columns = self.handle.num_columns();
        if column >= columns {
            return Err(StatisticsError::ColumnOutOfRange { column, columns });
        }
        self.tracker.set(0);

        let rows = self.handle.num_rows();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for row in 0..rows {
            self.check()?;
            if let Some(value) = self.handle.value(row, column) {
                let value = match hierarchy {
                    Some(hierarchy) if self.level > 0 => {
                        hierarchy.generalize(value, self.level).unwrap_or(value)
                    }
                    _ => value,
                };
                *counts.entry(value).or_default() += 1;
            }
            self.tracker.report((row + 1) * COUNTING_SHARE, rows * 100);
        }
        self.check()?;

        let mut entries: Vec<(&str, usize)> = counts.into_iter().collect();
        match hierarchy {
            Some(hierarchy) => sort_by_hierarchy(&mut entries, hierarchy),
            None => sort_naturally(&mut entries),
        }
        self.check()?;

        let distribution = FrequencyDistribution::from_counts(
            entries
                .into_iter()
                .map(|(value, count)| (value.to_string(), count))
                .collect(),
        )?;
        self.tracker.set(100);
        tracing::debug!(
            column,
            values = distribution.len(),
            records = distribution.count(),
            "Computed frequency distribution"
        );
        Ok(distribution)
    }
}

/// Rank values by hierarchy order; unknown values follow, sorted naturally.
fn sort_by_hierarchy(entries: &mut [(&str, usize)], hierarchy: &Hierarchy) {
    let order = hierarchy.value_order();
    entries.sort_by(|(a, _), (b, _)| match (order.get(a), order.get(b)) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => natural_cmp(a, b, false),
    });
}

/// Numeric order when every unsuppressed value parses, otherwise lexicographic.
/// The suppression marker always sorts last.
fn sort_naturally(entries: &mut [(&str, usize)]) {
    let numeric = entries
        .iter()
        .filter(|(value, _)| !is_suppressed(value))
        .all(|(value, _)| parse_number(value).is_some());
    entries.sort_by(|(a, _), (b, _)| natural_cmp(a, b, numeric));
}

fn natural_cmp(a: &str, b: &str, numeric: bool) -> Ordering {
    match (is_suppressed(a), is_suppressed(b)) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    if numeric && let (Some(x), Some(y)) = (parse_number(a), parse_number(b)) {
        return x.cmp(&y).then_with(|| a.cmp(b));
    }
    a.cmp(b)
}

fn parse_number(value: &str) -> Option<OrderedFloat<f64>> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| !number.is_nan())
        .map(OrderedFloat)
}
