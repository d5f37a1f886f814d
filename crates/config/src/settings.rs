// Run settings
// Loaded from ~/.config/pudl/settings.toml (or $PUDL_SETTINGS)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an alternate settings file.
pub const SETTINGS_ENV: &str = "PUDL_SETTINGS";
/// Environment variable naming the store, overriding `store.path`.
pub const STORE_ENV: &str = "PUDL_STORE";

const DEFAULT_STORE_FILE: &str = "pudl.sqlite";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// SQLite file the pipeline loads into
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    /// Mapping config (`*.mapping.toml`)
    pub mapping: Option<PathBuf>,
    /// Cross-reference workbook or CSV directory
    pub crossref: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub input: InputSettings,
    pub log: LogSettings,
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        settings_env(|key| std::env::var_os(key).map(PathBuf::from)).unwrap_or_else(default_config_path)
    }

    /// Load settings from the default location, falling back to defaults
    /// when no file exists. A file named by `PUDL_SETTINGS` must exist.
    /// `PUDL_STORE` is applied on top.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_with(|key| std::env::var_os(key).map(PathBuf::from))
    }

    fn load_with(lookup: impl Fn(&str) -> Option<PathBuf>) -> Result<Self, SettingsError> {
        let mut settings = match settings_env(&lookup) {
            Some(path) => Self::load_from(&path)?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::load_from(&path)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env(lookup);
        Ok(settings)
    }

    /// Parse one settings file. Relative paths are resolved against the
    /// file's directory.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings: Settings = toml::from_str(&contents).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if let Some(base) = path.parent() {
            for slot in [
                &mut settings.store.path,
                &mut settings.input.mapping,
                &mut settings.input.crossref,
            ] {
                if let Some(p) = slot.as_mut() {
                    if p.is_relative() {
                        *p = base.join(&*p);
                    }
                }
            }
        }
        Ok(settings)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<PathBuf>) {
        if let Some(store) = lookup(STORE_ENV).filter(|p| !p.as_os_str().is_empty()) {
            self.store.path = Some(store);
        }
    }

    /// Store location: `store.path`, else `pudl.sqlite` in the user data
    /// directory.
    pub fn store_path(&self) -> PathBuf {
        self.store.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("pudl")
                .join(DEFAULT_STORE_FILE)
        })
    }

    /// Get the config file path for display
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

fn settings_env(lookup: impl Fn(&str) -> Option<PathBuf>) -> Option<PathBuf> {
    lookup(SETTINGS_ENV).filter(|p| !p.as_os_str().is_empty())
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pudl")
        .join("settings.toml")
}
