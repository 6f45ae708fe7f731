//! Error taxonomy for client construction and invocation.
//!
//! # Classes
//! - Disabled: expected when a service is switched off, never logged as an error
//! - Backpressure: circuit open or pool exhausted, surfaced immediately
//! - Transient: network failures and timeouts, retried with backoff
//! - Permanent: configuration or validation faults, never retried
//!
//! Only transient failures count against a service's circuit breaker. A
//! permanent error points at a bug on our side, not at the remote service.

use std::time::Duration;
use thiserror::Error;

/// Errors produced by the client manager and its resilience components.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// No descriptor is registered under this name.
    #[error("unknown service: {0}")]
    UnknownService(String),

    /// The service is administratively disabled.
    #[error("service {0} is disabled")]
    Disabled(String),

    /// The service's circuit breaker is rejecting calls.
    #[error("circuit open for {service}, next probe in {retry_in:?}")]
    CircuitOpen { service: String, retry_in: Duration },

    /// The global connection pool is at capacity.
    #[error("connection pool exhausted ({active}/{max} in use)")]
    PoolExhausted { active: usize, max: usize },

    /// An attempt exceeded its connect + read deadline.
    #[error("{service} timed out after {after:?}")]
    Timeout { service: String, after: Duration },

    /// Network or remote-side failure that may succeed on retry.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Failure that will not go away by retrying (bad config, rejected credentials).
    #[error("permanent failure: {0}")]
    Permanent(String),

    /// Caller passed arguments the component cannot work with.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ClientError {
    /// Whether the retry policy may attempt the operation again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Timeout { .. } | ClientError::Transient(_))
    }

    /// Whether the failure reflects remote unhealthiness and should be
    /// recorded against the service's circuit breaker.
    pub fn counts_as_service_failure(&self) -> bool {
        self.is_retryable()
    }

    /// Whether this is a load-shedding signal rather than a fault.
    pub fn is_backpressure(&self) -> bool {
        matches!(
            self,
            ClientError::CircuitOpen { .. } | ClientError::PoolExhausted { .. }
        )
    }

    /// Short stable label used for metrics and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::UnknownService(_) => "unknown_service",
            ClientError::Disabled(_) => "disabled",
            ClientError::CircuitOpen { .. } => "circuit_open",
            ClientError::PoolExhausted { .. } => "pool_exhausted",
            ClientError::Timeout { .. } => "timeout",
            ClientError::Transient(_) => "transient",
            ClientError::Permanent(_) => "permanent",
            ClientError::InvalidArgument(_) => "invalid_argument",
        }
    }
}

/// Result type for client manager operations.
pub type ClientResult<T> = Result<T, ClientError>;
