use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::defaults::{
    MIN_VECTOR_LENGTH, clamp_min_working_time_ms, clamp_non_negative, clamp_poll_interval_ms,
    clamp_positive, default_alpha, default_decay_exponent, default_epochs, default_false,
    default_lambda, default_learning_rate, default_min_working_time_ms, default_poll_interval_ms,
    default_seed, default_step_offset, default_vector_length,
};
use crate::classification::TrainingMode;
use crate::ml::logreg::{LogRegOptions, PriorFunction};

/// Errors that may occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The application directory could not be resolved.
    #[error("No usable config directory: {0}")]
    AppDir(#[from] crate::app_dirs::AppDirError),
    /// Failed to create the config directory.
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        /// Directory path that failed to create.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to read the settings file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to write the settings file.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Path that failed to write.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to parse TOML settings.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML parse error.
        source: toml::de::Error,
    },
    /// Failed to serialize settings to TOML.
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML serialization error.
        source: toml::ser::Error,
    },
}

/// Settings persisted in `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub classification: ClassificationSettings,
}

impl AppSettings {
    pub(crate) fn normalized(self) -> Self {
        Self {
            analysis: self.analysis.normalized(),
            classification: self.classification.normalized(),
        }
    }
}

/// Background analysis preferences.
///
/// Config keys: `min_working_time_ms`, `poll_interval_ms`, `hide_suppressed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Minimum time a task appears to run before its result is delivered.
    #[serde(default = "default_min_working_time_ms")]
    pub min_working_time_ms: u64,
    /// Sleep increment between cancellation checks while lingering.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Hide suppressed (`*`) values in distribution tables.
    #[serde(default = "default_false")]
    pub hide_suppressed: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            min_working_time_ms: default_min_working_time_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            hide_suppressed: default_false(),
        }
    }
}

impl AnalysisSettings {
    fn normalized(self) -> Self {
        Self {
            min_working_time_ms: clamp_min_working_time_ms(self.min_working_time_ms),
            poll_interval_ms: clamp_poll_interval_ms(self.poll_interval_ms),
            hide_suppressed: self.hide_suppressed,
        }
    }

    pub fn min_working_time(&self) -> Duration {
        Duration::from_millis(self.min_working_time_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(clamp_poll_interval_ms(self.poll_interval_ms))
    }
}

/// Logistic-regression classifier preferences.
///
/// Config keys: `prior`, `learning_rate`, `alpha`, `lambda`, `step_offset`,
/// `decay_exponent`, `vector_length`, `training_mode`, `epochs`, `seed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSettings {
    #[serde(default)]
    pub prior: PriorFunction,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Per-step multiplicative decay of the learning rate.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Regularization strength applied through the prior.
    #[serde(default = "default_lambda")]
    pub lambda: f64,
    #[serde(default = "default_step_offset")]
    pub step_offset: u32,
    #[serde(default = "default_decay_exponent")]
    pub decay_exponent: f64,
    /// Length of the hashed feature vector.
    #[serde(default = "default_vector_length")]
    pub vector_length: usize,
    #[serde(default)]
    pub training_mode: TrainingMode,
    /// Passes over the buffered examples in offline mode.
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    /// Shuffle seed for offline batch training.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for ClassificationSettings {
    fn default() -> Self {
        Self {
            prior: PriorFunction::default(),
            learning_rate: default_learning_rate(),
            alpha: default_alpha(),
            lambda: default_lambda(),
            step_offset: default_step_offset(),
            decay_exponent: default_decay_exponent(),
            vector_length: default_vector_length(),
            training_mode: TrainingMode::default(),
            epochs: default_epochs(),
            seed: default_seed(),
        }
    }
}

impl ClassificationSettings {
    fn normalized(self) -> Self {
        Self {
            learning_rate: clamp_positive(self.learning_rate, default_learning_rate()),
            alpha: clamp_positive(self.alpha, default_alpha()).min(1.0),
            lambda: clamp_non_negative(self.lambda, default_lambda()),
            decay_exponent: clamp_non_negative(self.decay_exponent, default_decay_exponent()),
            vector_length: self.vector_length.max(MIN_VECTOR_LENGTH),
            epochs: self.epochs.max(1),
            ..self
        }
    }

    /// Backend options derived from these settings.
    pub fn logreg_options(&self) -> LogRegOptions {
        LogRegOptions {
            prior: self.prior,
            learning_rate: self.learning_rate,
            alpha: self.alpha,
            lambda: self.lambda,
            step_offset: self.step_offset,
            decay_exponent: self.decay_exponent,
        }
    }
}
