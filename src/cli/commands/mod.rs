//! CLI command implementations.

pub mod check_sta;
pub mod optimize;
pub mod validate_config;

use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::{LogConfig, LoggerImpl};

/// Load the configuration from `path`, or from the default locations.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Install the global logger from the loaded configuration.
///
/// The returned guard must live until the command finishes so buffered file
/// output is flushed.
pub fn init_logging(config: &Config, level_override: Option<&str>) -> Result<LoggerImpl> {
    let mut log_config = LogConfig::try_from(&config.logging)?;
    if let Some(level) = level_override {
        log_config.level = level.to_string();
    }
    LoggerImpl::init(&log_config).context("Failed to initialize logging")
}
