//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an external service:
//!     → circuit_breaker.rs (reject fast if the service is known to be down)
//!     → retries.rs (re-run transient failures with backoff.rs delays)
//!     → timeouts.rs (bound every attempt by connect + read timeout)
//!     → outcome fed back to circuit_breaker.rs
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Only transient errors are retried; validation errors fail fast
//! - Circuit breaker is per service, never global
//! - Components are plain structs composed by the client manager

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{Admission, BreakerPermit, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use retries::RetryPolicy;
pub use timeouts::{with_deadline, Timeouts};
