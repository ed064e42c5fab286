//! Configuration validation.
//!
//! Serde handles syntax; this checks value ranges and addresses. All errors
//! are returned, not just the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{GuardConfig, PLACEHOLDER_API_KEY};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
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

pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("server.bind_address", "not a socket address"));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be > 0"));
    }
    if config.server.max_body_bytes == 0 {
        errors.push(ValidationError::new("server.max_body_bytes", "must be > 0"));
    }

    if config.storage.persistent_path.trim().is_empty() {
        errors.push(ValidationError::new("storage.persistent_path", "must not be empty"));
    }

    if config.gate.max_attempts == 0 {
        errors.push(ValidationError::new("gate.max_attempts", "must be > 0"));
    }
    if config.gate.window_secs == 0 {
        errors.push(ValidationError::new("gate.window_secs", "must be > 0"));
    }

    if config.audit.capacity == 0 {
        errors.push(ValidationError::new("audit.capacity", "must be > 0"));
    }

    if config.monitor.viewport_interval_ms == 0 {
        errors.push(ValidationError::new("monitor.viewport_interval_ms", "must be > 0"));
    }
    if config.monitor.storage_interval_secs == 0 {
        errors.push(ValidationError::new("monitor.storage_interval_secs", "must be > 0"));
    }
    if config.monitor.event_buffer == 0 {
        errors.push(ValidationError::new("monitor.event_buffer", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }

    if config.admin.enabled {
        if config.admin.api_key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::new("admin.api_key", "still set to the placeholder key"));
        } else if config.admin.api_key.len() < 16 {
            errors.push(ValidationError::new("admin.api_key", "must be at least 16 characters"));
        }
        if !config.admin.viewer_key.is_empty() && config.admin.viewer_key == config.admin.api_key {
            errors.push(ValidationError::new("admin.viewer_key", "must differ from admin.api_key"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
