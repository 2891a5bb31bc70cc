use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::sleep;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::errors::{AnalysisError, panic_message};
use super::progress::Interruptible;
use crate::config::AnalysisSettings;

/// Default floor on how long a task appears to run.
pub const MINIMAL_WORKING_TIME: Duration = Duration::from_millis(300);
/// Default sleep increment between cancellation checks while lingering.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Lifecycle of an [`AnalysisTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TaskState {
    Idle = 0,
    Running = 1,
    /// Running, but `stop` has been requested.
    Stopping = 2,
    Finished = 3,
    Errored = 4,
    Interrupted = 5,
}

impl TaskState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Stopping,
            3 => Self::Finished,
            4 => Self::Errored,
            5 => Self::Interrupted,
            _ => Self::Idle,
        }
    }

    pub fn is_running(self) -> bool {
        matches!(self, Self::Running | Self::Stopping)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Errored | Self::Interrupted)
    }
}

/// State shared between a task's owner and its worker.
#[derive(Debug)]
pub(super) struct TaskShared {
    state: AtomicU8,
    stopped: AtomicBool,
}

impl TaskShared {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(TaskState::Idle as u8),
            stopped: AtomicBool::new(false),
        }
    }

    fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: TaskState, to: TaskState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Latch the cancellation flag; returns `false` if it was already set.
    fn request_stop(&self) -> bool {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.transition(TaskState::Running, TaskState::Stopping);
        true
    }

    pub(super) fn begin(&self) {
        if self.transition(TaskState::Idle, TaskState::Running) && self.is_stopped() {
            self.transition(TaskState::Running, TaskState::Stopping);
        }
    }

    /// Commit a terminal state with a single write. A stop that landed before
    /// the commit turns any outcome into `Interrupted`.
    fn settle(&self, outcome: TaskState) -> TaskState {
        let state = if self.is_stopped() {
            TaskState::Interrupted
        } else {
            outcome
        };
        self.state.store(state as u8, Ordering::Release);
        state
    }
}

/// Cloneable owner-side view of a task: state, progress and stop.
#[derive(Clone)]
pub struct TaskHandle {
    shared: Arc<TaskShared>,
    source: Arc<dyn Interruptible>,
}

impl TaskHandle {
    pub fn state(&self) -> TaskState {
        self.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.is_stopped()
    }

    /// Progress of the underlying computation, `0` before it reports any.
    pub fn progress(&self) -> u8 {
        self.source.progress().min(100)
    }

    /// Set the cancellation flag and interrupt the computation. Idempotent and
    /// non-blocking; the task settles once its worker notices.
    pub fn stop(&self) {
        if self.shared.request_stop() {
            debug!("Analysis stop requested");
            self.source.interrupt();
        }
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("state", &self.state())
            .field("stopped", &self.is_stopped())
            .field("progress", &self.progress())
            .finish()
    }
}

/// Cancellation view handed to a running job.
pub struct TaskContext {
    shared: Arc<TaskShared>,
    started: Instant,
}

impl TaskContext {
    pub fn is_cancelled(&self) -> bool {
        self.shared.is_stopped()
    }

    /// `Err(Interrupted)` once the task has been stopped; call between units of work.
    pub fn checkpoint(&self) -> Result<(), AnalysisError> {
        if self.is_cancelled() {
            Err(AnalysisError::Interrupted)
        } else {
            Ok(())
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Sleep until `minimum` has elapsed since start, checking for
    /// cancellation every `step`.
    fn linger(&self, minimum: Duration, step: Duration) {
        let step = step.max(Duration::from_millis(1));
        while !self.is_cancelled() {
            let Some(remaining) = minimum.checked_sub(self.elapsed()) else {
                break;
            };
            if remaining.is_zero() {
                break;
            }
            sleep(remaining.min(step));
        }
    }
}

type Job<T> = Box<dyn FnOnce(&TaskContext) -> Result<T, AnalysisError> + Send>;
type FinishHandler<T> = Box<dyn FnOnce(T) + Send>;
type ErrorHandler = Box<dyn FnOnce(AnalysisError) + Send>;
type InterruptHandler = Box<dyn FnOnce() + Send>;
type Liveness = Arc<dyn Fn() -> bool + Send + Sync>;

/// A cancellable unit of background work with exactly one terminal outcome.
///
/// The job runs on a worker thread owned by an [`super::AnalysisManager`].
/// Handlers run on that worker after the outcome is committed, and only if
/// the liveness predicate still holds and the task was not superseded.
pub struct AnalysisTask<T> {
    label: String,
    shared: Arc<TaskShared>,
    source: Arc<dyn Interruptible>,
    job: Job<T>,
    on_finish: Option<FinishHandler<T>>,
    on_error: Option<ErrorHandler>,
    on_interrupt: Option<InterruptHandler>,
    is_live: Option<Liveness>,
    min_working_time: Duration,
    poll_interval: Duration,
}

impl<T: Send + 'static> AnalysisTask<T> {
    /// Wrap `job`, whose progress and interruption are exposed by `source`.
    pub fn new<F>(label: impl Into<String>, source: Arc<dyn Interruptible>, job: F) -> Self
    where
        F: FnOnce(&TaskContext) -> Result<T, AnalysisError> + Send + 'static,
    {
        Self {
            label: label.into(),
            shared: Arc::new(TaskShared::new()),
            source,
            job: Box::new(job),
            on_finish: None,
            on_error: None,
            on_interrupt: None,
            is_live: None,
            min_working_time: MINIMAL_WORKING_TIME,
            poll_interval: CANCEL_POLL_INTERVAL,
        }
    }

    pub fn on_finish(mut self, handler: impl FnOnce(T) + Send + 'static) -> Self {
        self.on_finish = Some(Box::new(handler));
        self
    }

    pub fn on_error(mut self, handler: impl FnOnce(AnalysisError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(handler));
        self
    }

    pub fn on_interrupt(mut self, handler: impl FnOnce() + Send + 'static) -> Self {
        self.on_interrupt = Some(Box::new(handler));
        self
    }

    /// Handlers are dropped unless `predicate` holds when the outcome is delivered.
    pub fn live_while(mut self, predicate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.is_live = Some(Arc::new(predicate));
        self
    }

    pub fn min_working_time(mut self, minimum: Duration) -> Self {
        self.min_working_time = minimum;
        self
    }

    pub fn poll_interval(mut self, step: Duration) -> Self {
        self.poll_interval = step;
        self
    }

    /// Apply timing from persisted settings.
    pub fn with_settings(self, settings: &AnalysisSettings) -> Self {
        self.min_working_time(settings.min_working_time())
            .poll_interval(settings.poll_interval())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn handle(&self) -> TaskHandle {
        TaskHandle {
            shared: Arc::clone(&self.shared),
            source: Arc::clone(&self.source),
        }
    }

    pub fn progress(&self) -> u8 {
        self.handle().progress()
    }

    pub fn stop(&self) {
        self.handle().stop();
    }

    pub(super) fn begin(&self) {
        self.shared.begin();
    }

    /// Execute the job, linger, commit the outcome and deliver it.
    ///
    /// `gate` is held from the commit until the handler returns, so an owner
    /// that takes it either stops the task before its outcome is decided or
    /// observes the delivery as complete. `is_current` and the liveness
    /// predicate are checked under it.
    pub(super) fn execute(self, gate: &Mutex<()>, is_current: impl Fn() -> bool) -> TaskState {
        let Self {
            label,
            shared,
            job,
            on_finish,
            on_error,
            on_interrupt,
            is_live,
            min_working_time,
            poll_interval,
            ..
        } = self;
        let context = TaskContext {
            shared: Arc::clone(&shared),
            started: Instant::now(),
        };

        let result = catch_unwind(AssertUnwindSafe(|| job(&context)))
            .unwrap_or_else(|payload| Err(AnalysisError::Panicked(panic_message(payload))));
        if result.is_ok() {
            context.linger(min_working_time, poll_interval);
        }

        let (outcome, value, error) = match result {
            Ok(value) => (TaskState::Finished, Some(value), None),
            Err(AnalysisError::Interrupted) => (TaskState::Interrupted, None, None),
            Err(_) if context.is_cancelled() => (TaskState::Interrupted, None, None),
            Err(err) => (TaskState::Errored, None, Some(err)),
        };
        let _delivery = gate.lock().unwrap_or_else(PoisonError::into_inner);
        let state = shared.settle(outcome);
        debug!(task = %label, ?state, elapsed_ms = context.elapsed().as_millis() as u64, "Analysis settled");

        let deliverable = is_current() && is_live.as_ref().is_none_or(|live| live());
        if !deliverable {
            debug!(task = %label, ?state, "Dropping stale analysis outcome");
            return state;
        }
        match state {
            TaskState::Finished => {
                if let (Some(handler), Some(value)) = (on_finish, value) {
                    handler(value);
                }
            }
            TaskState::Errored => {
                let err = error.unwrap_or_else(|| AnalysisError::failed("unknown failure"));
                warn!(task = %label, error = %err, "Analysis failed");
                if let Some(handler) = on_error {
                    handler(err);
                }
            }
            _ => {
                if let Some(handler) = on_interrupt {
                    handler();
                }
            }
        }
        state
    }
}

impl<T> fmt::Debug for AnalysisTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisTask")
            .field("label", &self.label)
            .field("state", &self.shared.state())
            .field("min_working_time", &self.min_working_time)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

/// Generation counter used to tell the current task from superseded ones.
#[derive(Debug, Default)]
pub(super) struct Generation(AtomicU64);

impl Generation {
    pub(super) fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(super) fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::progress::ProgressTracker;
    use std::sync::Mutex;

    fn quick<T: Send + 'static>(
        job: impl FnOnce(&TaskContext) -> Result<T, AnalysisError> + Send + 'static,
    ) -> AnalysisTask<T> {
        AnalysisTask::new("test", Arc::new(ProgressTracker::new()), job)
            .min_working_time(Duration::ZERO)
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Clone) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        (log, move |entry: &str| sink.lock().unwrap().push(entry.to_string()))
    }

    #[test]
    fn finished_job_delivers_value_once() {
        let (log, record) = recorder();
        let (r1, r2, r3) = (record.clone(), record.clone(), record);
        let task = quick(|_| Ok(7))
            .on_finish(move |value| r1(&format!("finish {value}")))
            .on_error(move |_| r2("error"))
            .on_interrupt(move || r3("interrupt"));
        let handle = task.handle();
        handle.shared.begin();

        assert_eq!(task.execute(&Mutex::new(()), || true), TaskState::Finished);
        assert_eq!(*log.lock().unwrap(), vec!["finish 7"]);
        assert_eq!(handle.state(), TaskState::Finished);
    }

    #[test]
    fn failure_routes_to_error_handler() {
        let (log, record) = recorder();
        let task = quick::<()>(|_| Err(AnalysisError::failed("bad hierarchy")))
            .on_error(move |err| record(&err.to_string()));
        task.handle().shared.begin();

        assert_eq!(task.execute(&Mutex::new(()), || true), TaskState::Errored);
        assert_eq!(*log.lock().unwrap(), vec!["Analysis failed: bad hierarchy"]);
    }

    #[test]
    fn panic_is_reported_as_error() {
        let (log, record) = recorder();
        let task = quick::<()>(|_| panic!("boom")).on_error(move |err| record(&err.to_string()));
        task.handle().shared.begin();

        assert_eq!(task.execute(&Mutex::new(()), || true), TaskState::Errored);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["Analysis worker panicked: boom"]
        );
    }

    #[test]
    fn stop_before_commit_turns_result_into_interrupt() {
        let (log, record) = recorder();
        let (r1, r2) = (record.clone(), record);
        let task = quick(|ctx: &TaskContext| {
            assert!(ctx.is_cancelled());
            Ok(1)
        })
        .on_finish(move |_| r1("finish"))
        .on_interrupt(move || r2("interrupt"));
        let handle = task.handle();
        handle.shared.begin();
        handle.stop();
        assert_eq!(handle.state(), TaskState::Stopping);

        assert_eq!(task.execute(&Mutex::new(()), || true), TaskState::Interrupted);
        assert_eq!(*log.lock().unwrap(), vec!["interrupt"]);
    }

    #[test]
    fn failure_after_stop_is_an_interrupt() {
        let (log, record) = recorder();
        let (r1, r2) = (record.clone(), record);
        let task = quick::<()>(|_| Err(AnalysisError::failed("computation aborted")))
            .on_error(move |_| r1("error"))
            .on_interrupt(move || r2("interrupt"));
        task.handle().shared.begin();
        task.stop();

        assert_eq!(task.execute(&Mutex::new(()), || true), TaskState::Interrupted);
        assert_eq!(*log.lock().unwrap(), vec!["interrupt"]);
    }

    #[test]
    fn stop_after_commit_keeps_the_outcome() {
        let (log, record) = recorder();
        let task = quick(|_| Ok(())).on_finish(move |_| record("finish"));
        let handle = task.handle();
        handle.shared.begin();

        assert_eq!(task.execute(&Mutex::new(()), || true), TaskState::Finished);
        handle.stop();
        assert_eq!(handle.state(), TaskState::Finished);
        assert_eq!(*log.lock().unwrap(), vec!["finish"]);
    }

    #[test]
    fn stale_outcome_is_dropped_silently() {
        let (log, record) = recorder();
        let (r1, r2) = (record.clone(), record);
        let task = quick(|_| Ok(()))
            .on_finish(move |_| r1("finish"))
            .live_while(|| false)
            .on_interrupt(move || r2("interrupt"));
        task.handle().shared.begin();

        assert_eq!(task.execute(&Mutex::new(()), || true), TaskState::Finished);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn superseded_outcome_is_dropped() {
        let (log, record) = recorder();
        let task = quick(|_| Ok(())).on_finish(move |_| record("finish"));
        task.handle().shared.begin();

        task.execute(&Mutex::new(()), || false);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn linger_honours_minimum_and_cancellation() {
        let task = AnalysisTask::new("linger", Arc::new(ProgressTracker::new()), |_| Ok(()))
            .min_working_time(Duration::from_millis(80));
        task.handle().shared.begin();
        let started = Instant::now();
        assert_eq!(task.execute(&Mutex::new(()), || true), TaskState::Finished);
        assert!(started.elapsed() >= Duration::from_millis(80));

        let task = AnalysisTask::new("linger", Arc::new(ProgressTracker::new()), |_| Ok(()))
            .min_working_time(Duration::from_secs(30));
        task.handle().shared.begin();
        task.stop();
        let started = Instant::now();
        assert_eq!(task.execute(&Mutex::new(()), || true), TaskState::Interrupted);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn stop_is_idempotent_and_forwards_interrupt_once() {
        let tracker = Arc::new(ProgressTracker::new());
        let task = AnalysisTask::new("stop", tracker.clone(), |_| Ok(()));
        task.stop();
        task.stop();
        assert!(tracker.is_interrupted());
        assert!(task.handle().is_stopped());
        assert_eq!(task.handle().state(), TaskState::Idle);
        task.handle().shared.begin();
        assert_eq!(task.handle().state(), TaskState::Stopping);
    }
}
