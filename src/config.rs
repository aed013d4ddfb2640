//! Conversion configuration.
//!
//! Settings come from an optional JSON file (`--config`); command-line flags
//! override individual values. Every field has a default, so an empty object
//! (or no file at all) is a valid configuration.
//!
//! ```json
//! {
//!   "project_name": "crawlee",
//!   "python": "/usr/bin/python3",
//!   "type_parser_timeout_secs": 60,
//!   "module_shortcuts": {
//!     "crawlee.storages._dataset.Dataset": "crawlee.storages.Dataset"
//!   },
//!   "repo_root_placeholder": "REPO_ROOT_PLACEHOLDER"
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use docspec_core::error::DocgenError;
use docspec_python::transform::{
    TransformOptions, DEFAULT_PROJECT_NAME, DEFAULT_REPO_ROOT_PLACEHOLDER,
};
use docspec_python::worker::DEFAULT_TIMEOUT_SECS;

// ============================================================================
// Error Types
// ============================================================================

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not a valid configuration object.
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A value is out of range.
    #[error("invalid config value `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl From<ConfigError> for DocgenError {
    fn from(err: ConfigError) -> Self {
        match &err {
            ConfigError::Read { path, source } => DocgenError::io(path.display(), source),
            ConfigError::Parse { .. } | ConfigError::InvalidValue { .. } => {
                DocgenError::invalid_args(err.to_string())
            }
        }
    }
}

// ============================================================================
// Config
// ============================================================================

/// Settings of one conversion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Name of the project root declaration.
    pub project_name: String,
    /// Interpreter for the type parser. Discovered when unset.
    pub python: Option<PathBuf>,
    /// Seconds the type parser may run.
    pub type_parser_timeout_secs: u64,
    /// `module.symbol` to its re-exported dotted path.
    pub module_shortcuts: HashMap<String, String>,
    /// Prefix stripped from source file names.
    pub repo_root_placeholder: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            project_name: DEFAULT_PROJECT_NAME.to_string(),
            python: None,
            type_parser_timeout_secs: DEFAULT_TIMEOUT_SECS,
            module_shortcuts: HashMap::new(),
            repo_root_placeholder: DEFAULT_REPO_ROOT_PLACEHOLDER.to_string(),
        }
    }
}

impl Config {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => Config::load(path),
            None => Ok(Config::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.type_parser_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "type_parser_timeout_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.project_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "project_name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Apply command-line overrides. `None` keeps the file value.
    pub fn with_overrides(mut self, python: Option<PathBuf>, project_name: Option<String>) -> Self {
        if let Some(python) = python {
            self.python = Some(python);
        }
        if let Some(project_name) = project_name {
            self.project_name = project_name;
        }
        self
    }

    pub fn type_parser_timeout(&self) -> Duration {
        Duration::from_secs(self.type_parser_timeout_secs)
    }

    /// Transformer settings derived from this configuration.
    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            project_name: self.project_name.clone(),
            module_shortcuts: self.module_shortcuts.clone(),
            repo_root_placeholder: self.repo_root_placeholder.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
