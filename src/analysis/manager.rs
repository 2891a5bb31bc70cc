use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use super::errors::AnalysisError;
use super::task::{AnalysisTask, Generation, TaskHandle, TaskState};

struct ActiveTask {
    label: String,
    handle: TaskHandle,
    worker: Option<JoinHandle<()>>,
}

/// Runs at most one [`AnalysisTask`] at a time on behalf of a single owner.
///
/// `start` stops the previous task and joins its worker before the next one
/// begins, so two tasks of the same owner never overlap and a superseded
/// task's handlers never interleave with its successor. A plain `stop` keeps
/// the task current, so it still delivers exactly one outcome; once `stop`
/// returns that outcome is either decided as an interrupt or already
/// delivered. Cancellation is
/// cooperative: a job that never checks its context keeps `start`, `wait`
/// and `Drop` blocked until it returns on its own.
pub struct AnalysisManager {
    generation: Arc<Generation>,
    delivery: Arc<Mutex<()>>,
    current: Option<ActiveTask>,
}

impl AnalysisManager {
    pub fn new() -> Self {
        Self {
            generation: Arc::new(Generation::default()),
            delivery: Arc::new(Mutex::new(())),
            current: None,
        }
    }

    /// Replace the current task with `task` and run it on a fresh worker.
    ///
    /// Blocks until the previous task has settled. Returns an error, without
    /// invoking any handler, if the worker thread cannot be spawned.
    pub fn start<T: Send + 'static>(&mut self, task: AnalysisTask<T>) -> Result<(), AnalysisError> {
        let generation = self.supersede();
        self.halt_current();

        let label = task.label().to_string();
        let handle = task.handle();
        task.begin();
        let tracker = Arc::clone(&self.generation);
        let gate = Arc::clone(&self.delivery);
        let worker = thread::Builder::new()
            .name(format!("analysis-{label}"))
            .spawn(move || {
                task.execute(&gate, || tracker.current() == generation);
            })
            .map_err(|err| AnalysisError::Spawn(err.to_string()))?;

        debug!(task = %label, generation, "Analysis started");
        self.current = Some(ActiveTask {
            label,
            handle,
            worker: Some(worker),
        });
        Ok(())
    }

    /// Stop the current task without starting a replacement; a no-op when
    /// idle. Does not wait for the job, only for a handler that is already
    /// being delivered.
    pub fn stop(&mut self) {
        let Some(active) = self.current.as_ref() else {
            return;
        };
        let _delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        if active.handle.is_running() {
            debug!(task = %active.label, "Stopping analysis");
        }
        active.handle.stop();
    }

    /// Block until the current task's worker has exited.
    pub fn wait(&mut self) {
        if let Some(active) = self.current.as_mut() {
            join_worker(active);
        }
    }

    /// Progress of the running task, or `0` when nothing runs.
    pub fn progress(&self) -> u8 {
        self.current
            .as_ref()
            .filter(|active| active.handle.is_running())
            .map(|active| active.handle.progress())
            .unwrap_or(0)
    }

    pub fn is_running(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|active| active.handle.is_running())
    }

    /// State of the most recently started task, if any.
    pub fn state(&self) -> Option<TaskState> {
        self.current.as_ref().map(|active| active.handle.state())
    }

    fn supersede(&self) -> u64 {
        let _delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        self.generation.advance()
    }

    fn halt_current(&mut self) {
        if let Some(mut active) = self.current.take() {
            active.handle.stop();
            join_worker(&mut active);
        }
    }
}

impl Default for AnalysisManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AnalysisManager {
    fn drop(&mut self) {
        self.supersede();
        self.halt_current();
    }
}

fn join_worker(active: &mut ActiveTask) {
    if let Some(worker) = active.worker.take()
        && worker.join().is_err()
    {
        warn!(task = %active.label, "Analysis worker panicked outside its job");
    }
}
