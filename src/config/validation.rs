//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and socket addresses
//! - Reject an enabled admin endpoint without a key
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure function: &BrokerConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::BrokerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("admin.api_key must be set when admin is enabled")]
    MissingAdminKey,

    #[error("log level {0:?} is not one of trace, debug, info, warn, error")]
    LogLevel(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &BrokerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.http_address", &config.listener.http_address);
    if let Some(tls) = &config.listener.tls {
        check_address(&mut errors, "listener.tls.bind_address", &tls.bind_address);
    }

    let rendezvous = &config.rendezvous;
    if rendezvous.max_slot_key_len == 0 {
        errors.push(ValidationError::Zero {
            field: "rendezvous.max_slot_key_len",
        });
    }
    if rendezvous.max_body_bytes == 0 {
        errors.push(ValidationError::Zero {
            field: "rendezvous.max_body_bytes",
        });
    }
    if rendezvous.idle_timeout_secs == Some(0) {
        errors.push(ValidationError::Zero {
            field: "rendezvous.idle_timeout_secs",
        });
    }

    let observability = &config.observability;
    if !matches!(
        observability.log_level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push(ValidationError::LogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &observability.metrics_address,
        );
    }

    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::MissingAdminKey);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
