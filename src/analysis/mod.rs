//! Cancellable background analyses with single-flight ownership.
//!
//! An owner (typically one statistics view) keeps an [`AnalysisManager`] and
//! hands it [`AnalysisTask`]s. Each task runs on its own worker thread, polls
//! its cancellation flag through a [`TaskContext`], lingers for a minimum
//! visible duration, and reports exactly one outcome: finished, errored or
//! interrupted.

mod errors;
mod manager;
mod progress;
mod task;

pub use errors::AnalysisError;
pub use manager::AnalysisManager;
pub use progress::{Interruptible, ProgressTracker};
pub use task::{
    AnalysisTask, CANCEL_POLL_INTERVAL, MINIMAL_WORKING_TIME, TaskContext, TaskHandle, TaskState,
};
