use thiserror::Error;

/// Failures surfaced by background analysis tasks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// The task observed its cancellation flag. Never passed to `on_error`.
    #[error("Analysis interrupted")]
    Interrupted,
    /// The computation itself failed.
    #[error("Analysis failed: {0}")]
    Failed(String),
    /// The computation panicked on the worker thread.
    #[error("Analysis worker panicked: {0}")]
    Panicked(String),
    /// The worker thread could not be started.
    #[error("Failed to spawn analysis worker: {0}")]
    Spawn(String),
}

impl AnalysisError {
    pub fn failed(err: impl std::fmt::Display) -> Self {
        Self::Failed(err.to_string())
    }
}

pub(super) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
