//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::BrokerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse configuration from TOML text without validating it.
pub fn parse_config(content: &str) -> Result<BrokerConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load configuration from a TOML file. Validation is left to the caller
/// so command-line overrides can be applied first.
pub fn load_config(path: &Path) -> Result<BrokerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load and validate configuration from a TOML file.
pub fn load_validated(path: &Path) -> Result<BrokerConfig, ConfigError> {
    let config = load_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
