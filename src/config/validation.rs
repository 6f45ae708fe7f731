//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field
//! rules. Every violation is collected so operators see them all at once.

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::{ManagerConfig, RetryConfig, ServiceDescriptor, ServiceKind};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("pool.max_connections must be greater than zero")]
    ZeroPoolCapacity,

    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: String },

    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("duplicate service name: {0}")]
    DuplicateService(String),

    #[error("{service}: failure_threshold must be at least 1")]
    ZeroFailureThreshold { service: String },

    #[error("{service}: recovery_timeout_secs must be greater than zero")]
    ZeroRecoveryTimeout { service: String },

    #[error("{scope}: {message}")]
    InvalidRetry { scope: String, message: String },

    #[error("{service}: enabled http service requires an endpoint")]
    MissingEndpoint { service: String },

    #[error("{service}: invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        service: String,
        endpoint: String,
        reason: String,
    },
}

/// Validate a parsed configuration, returning every error found.
pub fn validate_config(config: &ManagerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.pool.max_connections == 0 {
        errors.push(ValidationError::ZeroPoolCapacity);
    }
    if config.pool.connect_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "pool.connect_timeout_secs".into(),
        });
    }
    if config.pool.read_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "pool.read_timeout_secs".into(),
        });
    }

    validate_retry("retry", &config.retry, &mut errors);

    let mut seen = HashSet::new();
    for service in &config.services {
        if service.name.trim().is_empty() {
            errors.push(ValidationError::EmptyServiceName);
            continue;
        }
        if !seen.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }
        validate_service(service, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_service(service: &ServiceDescriptor, errors: &mut Vec<ValidationError>) {
    let name = &service.name;

    if service.failure_threshold == 0 {
        errors.push(ValidationError::ZeroFailureThreshold {
            service: name.clone(),
        });
    }
    if service.recovery_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRecoveryTimeout {
            service: name.clone(),
        });
    }
    if let Some(retry) = &service.retry {
        validate_retry(&format!("{name}.retry"), retry, errors);
    }
    for (field, value) in [
        ("connect_timeout_secs", service.connect_timeout_secs),
        ("read_timeout_secs", service.read_timeout_secs),
    ] {
        if value == Some(0) {
            errors.push(ValidationError::ZeroTimeout {
                field: format!("{name}.{field}"),
            });
        }
    }

    if service.enabled && service.kind == ServiceKind::Http {
        match &service.endpoint {
            None => errors.push(ValidationError::MissingEndpoint {
                service: name.clone(),
            }),
            Some(endpoint) => {
                if let Err(e) = url::Url::parse(endpoint) {
                    errors.push(ValidationError::InvalidEndpoint {
                        service: name.clone(),
                        endpoint: endpoint.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
}

fn validate_retry(scope: &str, retry: &RetryConfig, errors: &mut Vec<ValidationError>) {
    let mut invalid = |message: &str| {
        errors.push(ValidationError::InvalidRetry {
            scope: scope.to_string(),
            message: message.to_string(),
        })
    };

    if retry.max_retries == 0 {
        invalid("max_retries must be at least 1");
    }
    if retry.base_delay_ms == 0 {
        invalid("base_delay_ms must be greater than zero");
    }
    if !(retry.backoff_factor > 1.0) {
        invalid("backoff_factor must be greater than 1");
    }
}
