//! Client construction and orchestration.
//!
//! # Data Flow
//! ```text
//! ClientManager::get_client(name)
//!     → manager.rs (registry, cache, breaker + pool + retry composition)
//!     → connector.rs (one construction attempt per call)
//!         → http.rs for kind = "http"
//!         → application connectors for kind = "custom"
//!     → handle.rs (opaque, shareable client)
//!
//! Reporting:
//!     manager.rs → report.rs (health snapshot, performance report)
//! ```

pub mod connector;
pub mod handle;
pub mod http;
pub mod manager;
pub mod report;

pub use connector::{connector_fn, ConnectContext, FnConnector, ServiceConnector};
pub use handle::ClientHandle;
pub use http::{HttpConnector, HttpServiceClient};
pub use manager::{ClientManager, ClientManagerBuilder};
pub use report::{
    ClientStatus, HealthSnapshot, HealthSummary, PerformanceReport, PoolMetrics,
    ServiceHealthDetail, ServiceReport,
};
