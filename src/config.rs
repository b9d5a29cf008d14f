// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Command-line front-end configuration.
//!
//! Settings come from an optional TOML file; command-line flags override
//! them. Every field has a default, so an empty file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Front-end settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Directory recovered files are written to.
    pub output_dir: PathBuf,
    /// Try Brotli compression when encoding.
    pub compress: bool,
    /// `tracing` filter directive, e.g. `info` or `duck_core=debug`.
    pub log_filter: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            compress: true,
            log_filter: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load and validate a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(e.to_string()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: CliConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyOutputDir);
        }
        tracing_subscriber::EnvFilter::try_new(&self.log_filter)
            .map_err(|e| ConfigError::InvalidLogFilter(e.to_string()))?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("output directory must not be empty")]
    EmptyOutputDir,
    #[error("invalid log filter: {0}")]
    InvalidLogFilter(String),
    #[error("failed to read config file: {0}")]
    FileRead(String),
    #[error("failed to parse config file: {0}")]
    Parse(String),
}
