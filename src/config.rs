//! Interpreter limits, loadable from YAML.
//!
//! ```yaml
//! max_depth: 20000
//! max_macro_expansions: 1000
//! stack_size: 536870912
//! ```
//!
//! Missing keys take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::{ErrorKind, LustError};
use crate::macros::DEFAULT_MAX_MACRO_EXPANSIONS;

pub const DEFAULT_MAX_DEPTH: usize = 20_000;
pub const DEFAULT_STACK_SIZE: usize = 512 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Nested (non-tail) evaluations allowed before `RecursionLimit`.
    pub max_depth: usize,
    /// Rewrites of one form, and nesting of expansions, before a
    /// `MacroExpansion` error.
    pub max_macro_expansions: usize,
    /// Native stack, in bytes, of the evaluation thread.
    pub stack_size: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_macro_expansions: DEFAULT_MAX_MACRO_EXPANSIONS,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl InterpreterConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }
}

impl From<ConfigError> for LustError {
    fn from(error: ConfigError) -> Self {
        let path = match &error {
            ConfigError::Read { path, .. } => path.clone(),
            ConfigError::Parse(_) => "config".to_string(),
        };
        LustError::new(ErrorKind::Io {
            path,
            message: error.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let config = InterpreterConfig::from_yaml_str("max_depth: 50\n").unwrap();
        assert_eq!(config.max_depth, 50);
        assert_eq!(config.max_macro_expansions, DEFAULT_MAX_MACRO_EXPANSIONS);
        assert_eq!(config.stack_size, DEFAULT_STACK_SIZE);
    }

    #[test]
    fn empty_text_is_the_default_config() {
        assert_eq!(
            InterpreterConfig::from_yaml_str("").unwrap(),
            InterpreterConfig::default()
        );
    }

    #[test]
    fn bad_yaml_becomes_an_io_error() {
        let err = InterpreterConfig::from_yaml_str("max_depth: [").unwrap_err();
        let err: LustError = err.into();
        assert_eq!(err.code(), "lust::host::io");
    }
}
