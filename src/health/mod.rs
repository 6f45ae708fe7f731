//! Service health tracking.
//!
//! # Data Flow
//! ```text
//! Call outcome (manager)
//!     → monitor.rs (per-service record, own lock)
//!     → record.rs (counters, derived status)
//!
//! Periodic reporter (reporter.rs):
//!     Timer
//!     → Snapshot every service
//!     → Log summary, publish gauges
//! ```
//!
//! # Design Decisions
//! - Status is derived on read from counters, never stored
//! - Records are created on first outcome; untracked services read as unknown
//! - The reporter observes only; it never drives breaker transitions

pub mod monitor;
pub mod record;
pub mod reporter;

pub use monitor::HealthMonitor;
pub use record::{HealthRecord, HealthReport, HealthStatus};
pub use reporter::HealthReporter;
