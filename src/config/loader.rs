//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding the listening port.
pub const ENV_PORT: &str = "PORT";
/// Environment variable overriding the directory base URL.
pub const ENV_DIRECTORY_URL: &str = "DIRECTORY_URL";
/// Environment variable overriding the per-request deadline.
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {name}: {value:?}")]
    Env { name: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, then apply environment
/// overrides. Validation is left to [`finalize`] so callers can layer CLI
/// flags on top first.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    Ok(config)
}

/// Apply environment-style overrides using the given lookup.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_PORT) {
        config.listener.port = value.trim().parse().map_err(|_| ConfigError::Env {
            name: ENV_PORT,
            value: value.clone(),
        })?;
    }
    if let Some(value) = lookup(ENV_DIRECTORY_URL) {
        config.directory.base_url = value;
    }
    if let Some(value) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
        config.timeouts.request_secs = value.trim().parse().map_err(|_| ConfigError::Env {
            name: ENV_REQUEST_TIMEOUT_SECS,
            value: value.clone(),
        })?;
    }
    Ok(())
}

/// Validate the fully layered configuration.
pub fn finalize(config: GatewayConfig) -> Result<GatewayConfig, ConfigError> {
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
