//! Launcher settings.
//!
//! Precedence, highest first:
//! 1. CLI arguments (applied by the binary)
//! 2. Environment variables (`PROCGEN_OUTPUT_DIR`, `SM_MODEL_DIR`, `PROCGEN_LOG_LEVEL`)
//! 3. `./procgen-launch.toml`
//! 4. Defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SETTINGS_FILE: &str = "procgen-launch.toml";

const DEFAULT_OUTPUT_DIR: &str = "procgen-results";

/// Training backend selected by the settings file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherSettings {
    /// Root directory for job artifacts.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub backend: BackendKind,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings file not found: {0}")]
    NotFound(String),

    #[error("Failed to read settings file: {0}")]
    ReadError(String),

    #[error("Failed to parse settings file: {0}")]
    ParseError(String),
}

pub type SettingsResult<T> = std::result::Result<T, SettingsError>;

impl LauncherSettings {
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        if !path.exists() {
            return Err(SettingsError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::ReadError(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&content).map_err(|e| SettingsError::ParseError(format!("{}: {}", path.display(), e)))
    }

    /// Load `procgen-launch.toml` from `dir` if present, then apply
    /// environment overrides.
    ///
    /// A missing file yields defaults; an unreadable or malformed one is an
    /// error.
    pub fn discover_and_load(dir: &Path) -> SettingsResult<Self> {
        let settings = match Self::load_from_file(&dir.join(SETTINGS_FILE)) {
            Ok(settings) => settings,
            Err(SettingsError::NotFound(_)) => Self::default(),
            Err(e) => return Err(e),
        };
        Ok(settings.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply environment overrides read through `var`.
    ///
    /// `PROCGEN_OUTPUT_DIR` wins over `SM_MODEL_DIR`.
    #[must_use]
    pub fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| var(key).filter(|v| !v.is_empty());
        if let Some(dir) = non_empty("PROCGEN_OUTPUT_DIR").or_else(|| non_empty("SM_MODEL_DIR")) {
            self.output_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = non_empty("PROCGEN_LOG_LEVEL") {
            self.log_level = Some(level);
        }
        self
    }

    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    #[must_use]
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}
