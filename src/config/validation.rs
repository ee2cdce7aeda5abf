//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (pool sizes and timeouts > 0)
//! - Check the text encoding is one we can produce
//! - Check backend addresses and name uniqueness
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::http::charset::Charset;
use crate::load_balancer::backend::parse_base_url;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if Charset::from_label(&config.encoding).is_none() {
        errors.push(ValidationError::new(
            "encoding",
            format!("unsupported encoding '{}'", config.encoding),
        ));
    }

    if config.max_conn == 0 {
        errors.push(ValidationError::new("max_conn", "must be greater than 0"));
    }
    if config.max_conn_per_route == 0 {
        errors.push(ValidationError::new("max_conn_per_route", "must be greater than 0"));
    }
    if config.conn_ttl_ms == 0 {
        errors.push(ValidationError::new("conn_ttl_ms", "must be greater than 0"));
    }

    let timeouts = [
        ("timeout.default_ms", Some(config.timeout.default_ms)),
        ("timeout.request_ms", config.timeout.request_ms),
        ("timeout.conn_ms", config.timeout.conn_ms),
        ("timeout.socket_ms", config.timeout.socket_ms),
    ];
    for (field, value) in timeouts {
        if value == Some(0) {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    let mut names = HashSet::new();
    for (i, backend) in config.backends.iter().enumerate() {
        let field = format!("backends[{i}]");
        if backend.name.is_empty() {
            errors.push(ValidationError::new(&field, "name must not be empty"));
        } else if !names.insert(backend.name.as_str()) {
            errors.push(ValidationError::new(
                &field,
                format!("duplicate backend name '{}'", backend.name),
            ));
        }
        if backend.group.is_empty() {
            errors.push(ValidationError::new(&field, "group must not be empty"));
        }
        if let Err(reason) = parse_base_url(&backend.address) {
            errors.push(ValidationError::new(&field, reason));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
