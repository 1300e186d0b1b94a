//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds positive, rate within (0, 1])
//! - Detect duplicate operation overrides
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before a config is accepted into the gateway, never mid-traffic

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{CircuitConfig, GatewayConfig, OperationConfig};

/// A single configuration violation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{scope}: minimum_volume must be at least 1")]
    MinimumVolumeZero { scope: String },

    #[error("{scope}: error_rate_threshold must be within (0, 1], got {value}")]
    ErrorRateOutOfRange { scope: String, value: f64 },

    #[error("{scope}: cool_down_ms must be positive")]
    CoolDownZero { scope: String },

    #[error("{scope}: window_capacity must be at least 1")]
    WindowCapacityZero { scope: String },

    #[error("{scope}: window_max_age_ms must be positive")]
    WindowMaxAgeZero { scope: String },

    #[error("{scope}: call_timeout_ms must be positive when set")]
    CallTimeoutZero { scope: String },

    #[error("operation override with empty name")]
    EmptyOperationName,

    #[error("duplicate override for operation '{name}'")]
    DuplicateOperation { name: String },

    #[error("events.subscriber_buffer must be at least 1")]
    SubscriberBufferZero,
}

/// Validate a configuration, reporting every violation.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_defaults(&config.circuit, &mut errors);

    let mut seen = HashSet::new();
    for operation in &config.operations {
        if operation.name.is_empty() {
            errors.push(ValidationError::EmptyOperationName);
            continue;
        }
        if !seen.insert(operation.name.as_str()) {
            errors.push(ValidationError::DuplicateOperation {
                name: operation.name.clone(),
            });
        }
        check_override(operation, &mut errors);
    }

    if config.events.subscriber_buffer == 0 {
        errors.push(ValidationError::SubscriberBufferZero);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_defaults(circuit: &CircuitConfig, errors: &mut Vec<ValidationError>) {
    let scope = "circuit".to_string();
    if circuit.minimum_volume == 0 {
        errors.push(ValidationError::MinimumVolumeZero {
            scope: scope.clone(),
        });
    }
    if !(circuit.error_rate_threshold > 0.0 && circuit.error_rate_threshold <= 1.0) {
        errors.push(ValidationError::ErrorRateOutOfRange {
            scope: scope.clone(),
            value: circuit.error_rate_threshold,
        });
    }
    if circuit.cool_down_ms == 0 {
        errors.push(ValidationError::CoolDownZero {
            scope: scope.clone(),
        });
    }
    if circuit.window_capacity == 0 {
        errors.push(ValidationError::WindowCapacityZero {
            scope: scope.clone(),
        });
    }
    if circuit.window_max_age_ms == 0 {
        errors.push(ValidationError::WindowMaxAgeZero {
            scope: scope.clone(),
        });
    }
    if circuit.call_timeout_ms == Some(0) {
        errors.push(ValidationError::CallTimeoutZero { scope });
    }
}

fn check_override(operation: &OperationConfig, errors: &mut Vec<ValidationError>) {
    let scope = format!("operations.{}", operation.name);
    if operation.minimum_volume == Some(0) {
        errors.push(ValidationError::MinimumVolumeZero {
            scope: scope.clone(),
        });
    }
    if let Some(value) = operation.error_rate_threshold {
        if !(value > 0.0 && value <= 1.0) {
            errors.push(ValidationError::ErrorRateOutOfRange {
                scope: scope.clone(),
                value,
            });
        }
    }
    if operation.cool_down_ms == Some(0) {
        errors.push(ValidationError::CoolDownZero {
            scope: scope.clone(),
        });
    }
    if operation.window_capacity == Some(0) {
        errors.push(ValidationError::WindowCapacityZero {
            scope: scope.clone(),
        });
    }
    if operation.window_max_age_ms == Some(0) {
        errors.push(ValidationError::WindowMaxAgeZero {
            scope: scope.clone(),
        });
    }
    if operation.call_timeout_ms == Some(0) {
        errors.push(ValidationError::CallTimeoutZero { scope });
    }
}
