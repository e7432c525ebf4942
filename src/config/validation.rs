//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals and deadlines > 0)
//! - Reject unusable manager option names and metrics addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SupervisorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::SupervisorConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("manager option names must not be empty")]
    EmptyOptionName,

    #[error("manager option '{0}' contains whitespace")]
    InvalidOptionName(String),

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),
}

/// Check every semantic constraint, collecting all failures.
pub fn validate_config(config: &SupervisorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let durations = [
        ("device.poll_interval_ms", config.device.poll_interval_ms),
        ("driver.activation_timeout_ms", config.driver.activation_timeout_ms),
        ("driver.removal_timeout_ms", config.driver.removal_timeout_ms),
        ("shutdown.grace_period_ms", config.shutdown.grace_period_ms),
    ];
    for (field, value) in durations {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration { field });
        }
    }

    for name in config.manager.options.keys() {
        if name.is_empty() {
            errors.push(ValidationError::EmptyOptionName);
        } else if name.chars().any(char::is_whitespace) {
            errors.push(ValidationError::InvalidOptionName(name.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
