use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Progress and interruption facility of a long-running computation.
///
/// The owner polls `progress` and calls `interrupt` from its own thread while
/// the computation runs on a worker, so both must be non-blocking.
pub trait Interruptible: Send + Sync {
    /// Last reported progress in `0..=100`.
    fn progress(&self) -> u8;

    /// Ask the computation to give up as soon as it next checks.
    fn interrupt(&self);
}

/// Lock-free progress counter plus interrupt flag for computations to embed.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    progress: AtomicU8,
    interrupted: AtomicBool,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a percentage, clamped to 100.
    pub fn set(&self, percent: u8) {
        self.progress.store(percent.min(100), Ordering::Relaxed);
    }

    /// Store `done / total` as a percentage; an empty workload counts as complete.
    pub fn report(&self, done: usize, total: usize) {
        let percent = if total == 0 {
            100
        } else {
            (done.min(total) as u128 * 100 / total as u128) as u8
        };
        self.set(percent);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }
}

impl Interruptible for ProgressTracker {
    fn progress(&self) -> u8 {
        self.progress.load(Ordering::Relaxed)
    }

    fn interrupt(&self) {
        self.interrupted.store(true, Ordering::Release);
    }
}
