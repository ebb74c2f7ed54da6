//! Shim configuration

use crate::error::{Result, ShimError};
use crate::tokenizer::MAX_ARGS;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Shim configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ShimConfig {
    /// Flashing tool executable. When unset, the first token of the command
    /// line names the program.
    #[serde(default)]
    pub program: Option<PathBuf>,

    /// Working directory for the tool
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Maximum number of arguments accepted by the dispatcher
    #[serde(default = "default_max_args")]
    pub max_args: usize,

    /// Log level used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ShimConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ShimConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_args == 0 {
            return Err(ShimError::InvalidConfig(
                "max_args must be at least 1".to_string(),
            ));
        }
        if let Some(program) = &self.program {
            if program.as_os_str().is_empty() {
                return Err(ShimError::InvalidConfig(
                    "program must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn default_max_args() -> usize {
    MAX_ARGS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            program: None,
            working_dir: None,
            max_args: default_max_args(),
            log_level: default_log_level(),
        }
    }
}
