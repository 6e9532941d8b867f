//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::ExporterConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
}

/// Load and validate the check document from a YAML file.
pub fn load_config(path: &Path) -> Result<ExporterConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate a check document held in memory.
pub fn parse_config(content: &str) -> Result<ExporterConfig, ConfigError> {
    // An empty file is a valid document with no checks.
    let config: ExporterConfig = if content.trim().is_empty() {
        ExporterConfig::default()
    } else {
        serde_yaml::from_str(content)?
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
