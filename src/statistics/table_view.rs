use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, info};

use super::builder::{DistributionComputer, InterruptibleStatistics, StatisticsError};
use super::distribution::FrequencyDistribution;
use super::suppression::hide_suppressed;
use crate::analysis::{AnalysisError, AnalysisManager, AnalysisTask};
use crate::config::AnalysisSettings;
use crate::data::{DataHandle, Hierarchy};

/// What the table currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TableStatus {
    Empty,
    Working,
    Done,
}

/// One rendered line of the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionRow {
    pub value: String,
    /// Relative frequency formatted with two decimals, e.g. `"12.50%"`.
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSnapshot {
    pub status: TableStatus,
    pub rows: Vec<DistributionRow>,
    /// Records summarized by the displayed distribution.
    pub records: usize,
}

impl TableSnapshot {
    fn empty() -> Self {
        Self {
            status: TableStatus::Empty,
            rows: Vec::new(),
            records: 0,
        }
    }

    fn working() -> Self {
        Self {
            status: TableStatus::Working,
            ..Self::empty()
        }
    }

    fn done(distribution: &FrequencyDistribution) -> Self {
        Self {
            status: TableStatus::Done,
            rows: distribution
                .iter()
                .map(|(value, frequency)| DistributionRow {
                    value: value.to_string(),
                    percentage: format_percentage(frequency),
                })
                .collect(),
            records: distribution.count(),
        }
    }
}

pub fn format_percentage(frequency: f64) -> String {
    format!("{:.2}%", frequency * 100.0)
}

/// Frequency table of one attribute, recomputed in the background.
///
/// Each `update` replaces the running computation. Results are published only
/// while the view is enabled and only for the most recent request. An
/// interrupted computation leaves the table `Working`, since it is only
/// delivered while a replacement is still expected; `reset` and disabling
/// clear the table and discard whatever the running computation delivers.
pub struct DistributionTableView {
    manager: AnalysisManager,
    settings: AnalysisSettings,
    enabled: Arc<AtomicBool>,
    /// Bumped by every `update` and `reset`; outcomes of older requests are stale.
    request: Arc<AtomicU64>,
    hide_suppressed: Arc<AtomicBool>,
    snapshot: Arc<Mutex<TableSnapshot>>,
}

impl DistributionTableView {
    pub fn new(settings: AnalysisSettings) -> Self {
        let hide = settings.hide_suppressed;
        Self {
            manager: AnalysisManager::new(),
            settings,
            enabled: Arc::new(AtomicBool::new(true)),
            request: Arc::new(AtomicU64::new(0)),
            hide_suppressed: Arc::new(AtomicBool::new(hide)),
            snapshot: Arc::new(Mutex::new(TableSnapshot::empty())),
        }
    }

    /// Recompute the table for `attribute` of `handle`.
    ///
    /// Blocks until any previous computation has settled, then returns while
    /// the new one runs in the background. A disabled view ignores updates.
    pub fn update(
        &mut self,
        handle: Arc<dyn DataHandle>,
        attribute: &str,
        hierarchy: Option<Hierarchy>,
    ) -> Result<(), AnalysisError> {
        let Some(column) = handle.column_index_of(attribute) else {
            self.reset();
            return Err(StatisticsError::UnknownAttribute(attribute.to_string()).into());
        };
        if !self.is_enabled() {
            debug!(attribute, "Distribution view disabled; skipping update");
            return Ok(());
        }

        // The previous worker must be gone before `Working` is published, or
        // its late delivery could overwrite it.
        self.manager.stop();
        self.manager.wait();

        let computer = Arc::new(InterruptibleStatistics::new(handle));
        let task = self
            .distribution_task(computer, column, hierarchy)
            .with_settings(&self.settings);
        self.publish(TableSnapshot::working());
        info!(attribute, column, "Computing frequency distribution");
        let result = self.manager.start(task);
        self.started(result)
    }

    fn started(&self, result: Result<(), AnalysisError>) -> Result<(), AnalysisError> {
        if result.is_err() {
            self.publish(TableSnapshot::empty());
        }
        result
    }

    fn distribution_task<C: DistributionComputer + 'static>(
        &self,
        computer: Arc<C>,
        column: usize,
        hierarchy: Option<Hierarchy>,
    ) -> AnalysisTask<FrequencyDistribution> {
        let worker = Arc::clone(&computer);
        let (finished, failed, interrupted) = (
            Arc::clone(&self.snapshot),
            Arc::clone(&self.snapshot),
            Arc::clone(&self.snapshot),
        );
        let hide = Arc::clone(&self.hide_suppressed);
        let enabled = Arc::clone(&self.enabled);
        let request = Arc::clone(&self.request);
        let ticket = request.fetch_add(1, Ordering::AcqRel) + 1;
        AnalysisTask::new("distribution", computer, move |ctx| {
            ctx.checkpoint()?;
            Ok(worker.compute_frequency_distribution(column, hierarchy.as_ref())?)
        })
        .on_finish(move |distribution| {
            let visible = hide_suppressed(distribution, hide.load(Ordering::Acquire));
            store(&finished, TableSnapshot::done(&visible));
        })
        .on_error(move |_| store(&failed, TableSnapshot::empty()))
        .on_interrupt(move || store(&interrupted, TableSnapshot::working()))
        .live_while(move || {
            enabled.load(Ordering::Acquire) && request.load(Ordering::Acquire) == ticket
        })
    }

    /// Stop any computation and clear the table.
    pub fn reset(&mut self) {
        self.request.fetch_add(1, Ordering::AcqRel);
        self.manager.stop();
        self.publish(TableSnapshot::empty());
    }

    /// Enable or disable the view. Disabling stops the running computation
    /// and discards any outcome it would still deliver.
    pub fn set_enabled(&mut self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::AcqRel);
        if was && !enabled {
            self.reset();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Applies to results delivered after this call.
    pub fn set_hide_suppressed(&mut self, hide: bool) {
        self.hide_suppressed.store(hide, Ordering::Release);
        self.settings.hide_suppressed = hide;
    }

    pub fn hides_suppressed(&self) -> bool {
        self.hide_suppressed.load(Ordering::Acquire)
    }

    pub fn progress(&self) -> u8 {
        self.manager.progress()
    }

    pub fn is_running(&self) -> bool {
        self.manager.is_running()
    }

    /// Block until the current computation's worker has exited.
    pub fn wait(&mut self) {
        self.manager.wait();
    }

    pub fn snapshot(&self) -> TableSnapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, snapshot: TableSnapshot) {
        store(&self.snapshot, snapshot);
    }
}

fn store(target: &Mutex<TableSnapshot>, snapshot: TableSnapshot) {
    *target.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Interruptible, ProgressTracker, TaskState};
    use std::thread::sleep;
    use std::time::Duration;

    /// Computation that only ends when interrupted.
    struct UntilInterrupted(ProgressTracker);

    impl Interruptible for UntilInterrupted {
        fn progress(&self) -> u8 {
            self.0.progress()
        }

        fn interrupt(&self) {
            self.0.interrupt();
        }
    }

    impl DistributionComputer for UntilInterrupted {
        fn compute_frequency_distribution(
            &self,
            _column: usize,
            _hierarchy: Option<&Hierarchy>,
        ) -> Result<FrequencyDistribution, StatisticsError> {
            while !self.0.is_interrupted() {
                sleep(Duration::from_millis(1));
            }
            Err(StatisticsError::Interrupted)
        }
    }

    fn start_blocking(view: &mut DistributionTableView) {
        let task = view
            .distribution_task(Arc::new(UntilInterrupted(ProgressTracker::new())), 0, None)
            .min_working_time(Duration::ZERO);
        view.manager.start(task).unwrap();
    }

    #[test]
    fn percentages_use_two_decimals() {
        assert_eq!(format_percentage(0.125), "12.50%");
        assert_eq!(format_percentage(1.0), "100.00%");
        assert_eq!(format_percentage(0.0), "0.00%");
    }

    #[test]
    fn done_snapshot_lists_rows_in_order() {
        let dist = FrequencyDistribution::from_counts(vec![("a".into(), 1), ("b".into(), 3)])
            .unwrap();
        let snapshot = TableSnapshot::done(&dist);
        assert_eq!(snapshot.status, TableStatus::Done);
        assert_eq!(snapshot.records, 4);
        assert_eq!(
            snapshot.rows,
            vec![
                DistributionRow {
                    value: "a".into(),
                    percentage: "25.00%".into()
                },
                DistributionRow {
                    value: "b".into(),
                    percentage: "75.00%".into()
                },
            ]
        );
    }

    #[test]
    fn interrupted_computation_leaves_table_working() {
        let mut view = DistributionTableView::new(AnalysisSettings::default());
        view.publish(TableSnapshot::empty());
        start_blocking(&mut view);
        view.manager.stop();
        view.manager.wait();

        assert_eq!(view.manager.state(), Some(TaskState::Interrupted));
        assert_eq!(view.snapshot(), TableSnapshot::working());
    }

    #[test]
    fn reset_discards_the_interrupt_and_clears() {
        let mut view = DistributionTableView::new(AnalysisSettings::default());
        start_blocking(&mut view);
        view.reset();
        view.wait();

        assert_eq!(view.manager.state(), Some(TaskState::Interrupted));
        assert_eq!(view.snapshot(), TableSnapshot::empty());
    }

    #[test]
    fn failed_start_clears_the_working_table() {
        let view = DistributionTableView::new(AnalysisSettings::default());
        view.publish(TableSnapshot::working());

        let result = view.started(Err(AnalysisError::Spawn("no threads left".into())));
        assert!(result.is_err());
        assert_eq!(view.snapshot(), TableSnapshot::empty());
    }
}
