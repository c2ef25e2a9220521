//! User settings loaded from `config.toml` in the formulary home.
//!
//! Every field is optional; command-line flags and environment variables
//! override whatever is read here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The settings file exists but could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path of the settings file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for [`Settings`].
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// Path of the settings file.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
}

/// Persistent settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding manifests.
    pub formula_dir: Option<PathBuf>,
    /// Install prefix, when not the formulary home.
    pub prefix: Option<PathBuf>,
    /// Extra attempts after a failed download.
    pub download_retries: u32,
    /// Seconds a single smoke-test command may run.
    pub test_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            formula_dir: None,
            prefix: None,
            download_retries: 3,
            test_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Load settings from `path`; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings from the default location (`~/.formulary/config.toml`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_default() -> Result<Self, ConfigError> {
        match crate::paths::config_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Smoke-test timeout as a [`Duration`].
    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.test_timeout_secs)
    }
}
