//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ManagerConfig (validated, immutable)
//!     → ServiceDescriptors handed to the ClientManager registry
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    default_catalog, AdminConfig, ManagerConfig, ObservabilityConfig, PoolConfig, ReporterConfig,
    RetryConfig, ServiceDescriptor, ServiceKind,
};
pub use validation::{validate_config, ValidationError};
