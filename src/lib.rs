//! Resilient external-service client manager.
//!
//! Creates, pools, monitors, and protects clients for independent external
//! services. Every client construction (and optionally every invocation)
//! runs behind a per-service circuit breaker, a process-wide connection
//! pool guard, and a retry policy with exponential backoff; outcomes feed a
//! per-service health monitor that aggregates into snapshots.

pub mod admin;
pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod pool;
pub mod resilience;

pub use client::{ClientHandle, ClientManager};
pub use config::ManagerConfig;
pub use error::{ClientError, ClientResult};
pub use lifecycle::Shutdown;
