//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check that the forwarding deadline fits inside the request deadline
//! - Check that the directory base URL is usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::Method;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// Human readable description.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.request_secs", timeouts.request_secs),
        ("timeouts.forward_secs", timeouts.forward_secs),
        ("timeouts.connect_secs", timeouts.connect_secs),
        ("timeouts.shutdown_grace_secs", timeouts.shutdown_grace_secs),
        ("directory.timeout_secs", config.directory.timeout_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    if timeouts.forward_secs >= timeouts.request_secs {
        errors.push(ValidationError::new(
            "timeouts.forward_secs",
            format!(
                "must be shorter than timeouts.request_secs ({} >= {})",
                timeouts.forward_secs, timeouts.request_secs
            ),
        ));
    }

    match url::Url::parse(&config.directory.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        Ok(url) => errors.push(ValidationError::new(
            "directory.base_url",
            format!("unsupported url {}", url),
        )),
        Err(e) => errors.push(ValidationError::new(
            "directory.base_url",
            format!("invalid url {:?}: {}", config.directory.base_url, e),
        )),
    }

    if config.inspection.peek_limit == 0 {
        errors.push(ValidationError::new("inspection.peek_limit", "must be greater than 0"));
    }
    if config.inspection.forward_queue_chunks == 0 {
        errors.push(ValidationError::new(
            "inspection.forward_queue_chunks",
            "must be greater than 0",
        ));
    }
    for method in &config.inspection.methods {
        if method.parse::<Method>().is_err() {
            errors.push(ValidationError::new(
                "inspection.methods",
                format!("invalid HTTP method {:?}", method),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
