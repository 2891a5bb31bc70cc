//! Tracing setup for hosts embedding the analysis framework.
//!
//! One global subscriber writes to stdout and to a per-launch log file under
//! the application logs directory. Log files are timestamped and pruned to a
//! bounded count.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs;

/// Maximum number of log files kept by default.
pub const MAX_LOG_FILES: usize = 10;
const LOG_FILE_PREFIX: &str = "anonstat";
const LOG_EXTENSION: &str = "log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Errors that may occur while initializing logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The application logs directory could not be resolved or created.
    #[error("Log directory unavailable: {0}")]
    Directory(#[from] app_dirs::AppDirError),
    /// Failed to enumerate existing log files for pruning.
    #[error("Failed to read log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to remove an obsolete log file.
    #[error("Failed to remove old log file {path}: {source}")]
    RemoveFile {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to create the log file for this launch.
    #[error("Failed to create log file at {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to format a timestamp for the log filename.
    #[error("Failed to format log filename time: {0}")]
    FormatTime(time::error::Format),
    /// Another global subscriber is already installed.
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
}

/// Knobs for [`init_with`].
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Directory for log files; `None` uses the application logs directory.
    pub directory: Option<PathBuf>,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
    /// Number of log files to keep after pruning.
    pub max_files: usize,
    /// Mirror events to stdout.
    pub stdout: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            directory: None,
            default_filter: "info".to_string(),
            max_files: MAX_LOG_FILES,
            stdout: true,
        }
    }
}

/// Initialize logging with default options.
pub fn init() -> Result<Option<PathBuf>, LoggingError> {
    init_with(LogOptions::default())
}

/// Initialize logging, returning the path of this launch's log file.
///
/// Only the first successful call installs a subscriber; later calls return
/// `Ok(None)`. Errors are returned so hosts can continue without logs.
pub fn init_with(options: LogOptions) -> Result<Option<PathBuf>, LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(None);
    }

    let log_dir = match options.directory {
        Some(dir) => dir,
        None => app_dirs::logs_dir()?,
    };
    let file_name = log_file_name(now_local_or_utc())?;
    let log_path = log_dir.join(&file_name);
    touch(&log_path)?;
    prune_old_logs(&log_dir, options.max_files.max(1))?;

    let (file_writer, guard) = tracing_appender::non_blocking(rolling::never(&log_dir, file_name));
    let timer = local_timer();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.default_filter.as_str()));
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_timer(timer.clone())
        .with_writer(file_writer);
    let stdout_layer = options.stdout.then(|| {
        fmt::layer()
            .with_timer(timer)
            .with_writer(std::io::stdout)
    });

    let subscriber = Registry::default()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
    let _ = LOG_GUARD.set(guard);

    tracing::info!(path = %log_path.display(), "Logging initialized");
    Ok(Some(log_path))
}

fn touch(path: &Path) -> Result<(), LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|source| LoggingError::CreateLogFile {
            path: path.to_path_buf(),
            source,
        })
}

fn prune_old_logs(dir: &Path, keep: usize) -> Result<(), LoggingError> {
    let mut logs: Vec<(SystemTime, PathBuf)> = fs::read_dir(dir)
        .map_err(|source| LoggingError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some(LOG_EXTENSION))
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .collect();

    if logs.len() <= keep {
        return Ok(());
    }
    logs.sort_by_key(|(modified, _)| *modified);
    let excess = logs.len() - keep;
    for (_, path) in logs.into_iter().take(excess) {
        fs::remove_file(&path).map_err(|source| LoggingError::RemoveFile { path, source })?;
    }
    Ok(())
}

fn log_file_name(now: OffsetDateTime) -> Result<String, LoggingError> {
    const NAME_FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let stamp = now.format(NAME_FORMAT).map_err(LoggingError::FormatTime)?;
    Ok(format!("{LOG_FILE_PREFIX}_{stamp}.{LOG_EXTENSION}"))
}

fn local_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};
    use tempfile::tempdir;

    fn count_logs(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.path().extension().and_then(|ext| ext.to_str()) == Some(LOG_EXTENSION)
            })
            .count()
    }

    #[test]
    fn log_file_name_has_prefix_and_timestamp() {
        let fixed = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(
            log_file_name(fixed).unwrap(),
            "anonstat_2023-11-14_22-13-20.log"
        );
    }

    #[test]
    fn prune_keeps_newest_files() {
        let dir = tempdir().unwrap();
        for idx in 0..5 {
            touch(&dir.path().join(format!("anonstat_{idx}.log"))).unwrap();
            thread::sleep(Duration::from_millis(10));
        }
        touch(&dir.path().join("notes.txt")).unwrap();

        prune_old_logs(dir.path(), 3).unwrap();

        assert_eq!(count_logs(dir.path()), 3);
        assert!(!dir.path().join("anonstat_0.log").exists());
        assert!(dir.path().join("anonstat_4.log").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn prune_is_noop_below_limit() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("anonstat_a.log")).unwrap();
        prune_old_logs(dir.path(), MAX_LOG_FILES).unwrap();
        assert_eq!(count_logs(dir.path()), 1);
    }
}
