//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client
//! manager. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Root configuration for the client manager.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Default region for services that do not set their own.
    pub region: String,

    /// Global connection pool settings.
    pub pool: PoolConfig,

    /// Default retry policy, overridable per service.
    pub retry: RetryConfig,

    /// Periodic health reporter.
    pub reporter: ReporterConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Operator control plane.
    pub admin: AdminConfig,

    /// Registered external services.
    pub services: Vec<ServiceDescriptor>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            pool: PoolConfig::default(),
            retry: RetryConfig::default(),
            reporter: ReporterConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
            services: default_catalog(),
        }
    }
}

fn default_region() -> String {
    "ap-south-1".to_string()
}

/// Connection pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum concurrent in-flight acquisitions across all services.
    pub max_connections: usize,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Read timeout in seconds.
    pub read_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 50,
            connect_timeout_secs: 10,
            read_timeout_secs: 30,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds.
    pub base_delay_ms: u64,

    /// Multiplier applied to the delay after each retry.
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    fn with_base_delay(base_delay_ms: u64) -> Self {
        Self {
            base_delay_ms,
            ..Self::default()
        }
    }
}

/// Periodic health reporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// Enable the background reporter.
    pub enabled: bool,

    /// Reporting interval in seconds.
    pub interval_secs: u64,

    /// Construct enabled but uncached clients on each tick.
    pub warm_up: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            warm_up: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Operator control plane configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the control plane.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Control plane bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// How a service's client is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Built-in HTTP connector, validated with a GET against the health path.
    #[default]
    Http,
    /// Connector registered programmatically by the embedding application.
    Custom,
}

/// Static description of one external service. Immutable after load.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceDescriptor {
    /// Unique service identifier.
    pub name: String,

    /// Administrative switch; disabled services are never contacted.
    #[serde(default)]
    pub enabled: bool,

    /// Connector used to build the client.
    #[serde(default)]
    pub kind: ServiceKind,

    /// Region override; falls back to the root region.
    #[serde(default)]
    pub region: Option<String>,

    /// Base URL of the service.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Path probed to validate a freshly built HTTP client.
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Consecutive failures before the breaker opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds the breaker stays open before admitting a probe.
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,

    /// Retry override for this service.
    #[serde(default)]
    pub retry: Option<RetryConfig>,

    /// Connect timeout override in seconds.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,

    /// Read timeout override in seconds.
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,

    /// Free-form constructor parameters (model id, table names, sender id...).
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

fn default_health_path() -> String {
    "/".to_string()
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout_secs() -> u64 {
    60
}

impl ServiceDescriptor {
    /// Create a disabled descriptor with default thresholds.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
            kind: ServiceKind::default(),
            region: None,
            endpoint: None,
            health_path: default_health_path(),
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
            retry: None,
            connect_timeout_secs: None,
            read_timeout_secs: None,
            params: BTreeMap::new(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn kind(mut self, kind: ServiceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn thresholds(mut self, failure_threshold: u32, recovery_timeout_secs: u64) -> Self {
        self.failure_threshold = failure_threshold;
        self.recovery_timeout_secs = recovery_timeout_secs;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn timeouts(mut self, connect_secs: u64, read_secs: u64) -> Self {
        self.connect_timeout_secs = Some(connect_secs);
        self.read_timeout_secs = Some(read_secs);
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }

    /// Region for this service, falling back to `default`.
    pub fn region_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.region.as_deref().unwrap_or(default)
    }
}

/// The standard service catalog, all disabled until configured.
///
/// Thresholds reflect each service class: storage, identity and encryption
/// fail over quickly, ML inference is given two minutes to recover.
pub fn default_catalog() -> Vec<ServiceDescriptor> {
    let entry = |name: &str, threshold: u32, recovery: u64, base_delay_ms: u64| {
        ServiceDescriptor::new(name)
            .thresholds(threshold, recovery)
            .retry(RetryConfig::with_base_delay(base_delay_ms))
    };

    vec![
        entry("inference", 5, 60, 1000),
        entry("structured-storage", 3, 30, 500),
        entry("document-extraction", 5, 60, 1000),
        entry("identity", 3, 30, 500),
        entry("email", 5, 60, 1000),
        entry("sms", 5, 60, 1000),
        entry("ml-inference", 3, 120, 2000),
        entry("text-analysis", 5, 60, 1000),
        entry("encryption", 3, 30, 500),
        entry("speech-to-text", 5, 60, 1000),
        entry("text-to-speech", 5, 60, 1000),
        entry("workflow", 3, 90, 1000),
        entry("object-store", 3, 30, 500),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 13);
        assert!(catalog.iter().all(|s| !s.enabled));

        let ml = catalog.iter().find(|s| s.name == "ml-inference").unwrap();
        assert_eq!(ml.failure_threshold, 3);
        assert_eq!(ml.recovery_timeout(), Duration::from_secs(120));
        assert_eq!(ml.retry.as_ref().unwrap().base_delay_ms, 2000);
    }

    #[test]
    fn test_minimal_service_table() {
        let config: ManagerConfig = toml::from_str(
            r#"
            [[services]]
            name = "inference"
            enabled = true
            endpoint = "http://127.0.0.1:9000"
            "#,
        )
        .unwrap();

        assert_eq!(config.services.len(), 1);
        let svc = &config.services[0];
        assert_eq!(svc.kind, ServiceKind::Http);
        assert_eq!(svc.failure_threshold, 5);
        assert_eq!(svc.health_path, "/");
        assert_eq!(svc.region_or(&config.region), "ap-south-1");
        assert_eq!(config.pool.max_connections, 50);
    }
}
