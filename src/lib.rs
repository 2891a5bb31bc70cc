//! Background statistics and classification for anonymized tables.
/// Cancellable single-flight background tasks.
pub mod analysis;
/// Application directory resolution.
pub mod app_dirs;
/// Row classifiers and the train-and-score job.
pub mod classification;
/// Persisted settings.
pub mod config;
/// Table and hierarchy access.
pub mod data;
/// Tracing subscriber setup.
pub mod logging;
/// Vector classifier backends and metrics.
pub mod ml;
/// Frequency distributions and their table view.
pub mod statistics;
