//! TOML settings for analysis and classification.

mod defaults;
mod types;

use std::path::{Path, PathBuf};

pub use types::{AnalysisSettings, AppSettings, ClassificationSettings, ConfigError};

use crate::app_dirs;

/// Default filename used to store the settings.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolve the settings file path inside the application root.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

/// Load settings from the application root, returning defaults if missing.
pub fn load_or_default() -> Result<AppSettings, ConfigError> {
    load_from(&config_path()?)
}

/// Persist settings to the application root.
pub fn save(settings: &AppSettings) -> Result<(), ConfigError> {
    save_to_path(settings, &config_path()?)
}

/// Load settings from `path`, returning defaults if the file does not exist.
pub fn load_from(path: &Path) -> Result<AppSettings, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No settings file; using defaults");
        return Ok(AppSettings::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<AppSettings>(&text)
        .map(AppSettings::normalized)
        .map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
}

/// Save settings to `path`, creating parent directories as needed.
pub fn save_to_path(settings: &AppSettings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(settings).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, data).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
