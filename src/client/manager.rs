//! Client manager: the orchestrator.
//!
//! # Call Path
//! ```text
//! try_get_client(name)
//!     → descriptor enabled?          no  → Disabled (no state touched)
//!     → handle cached?               yes → return it
//!     → circuit_breaker.admit()      open → CircuitOpen
//!     → pool.acquire()               full → PoolExhausted
//!     → retry(deadline(connector))
//!     → record outcome in monitor + breaker, cache on success
//!     → release pool permit
//! ```
//!
//! # Design Decisions
//! - Explicitly constructed and shared by `Arc`; no global instance
//! - One registry entry per service with its own breaker and cache slot
//! - Retries happen only inside the retry policy; repeated failures
//!   escalate to the breaker instead of being retried here
//! - Permanent errors are recorded as health failures but never count
//!   toward the breaker threshold

use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::Instrument;
use uuid::Uuid;

use crate::client::connector::{ConnectContext, ServiceConnector};
use crate::client::handle::ClientHandle;
use crate::client::http::HttpConnector;
use crate::client::report::{
    overall_status, ClientStatus, HealthSnapshot, HealthSummary, PerformanceReport, PoolMetrics,
    ServiceHealthDetail, ServiceReport,
};
use crate::config::{validate_config, ManagerConfig, ServiceDescriptor, ServiceKind};
use crate::error::{ClientError, ClientResult};
use crate::health::{HealthMonitor, HealthReport, HealthStatus};
use crate::observability::metrics;
use crate::pool::{ConnectionPool, PoolPermit};
use crate::resilience::{
    with_deadline, BreakerPermit, BreakerSnapshot, CircuitBreaker, CircuitState, RetryPolicy, Timeouts,
};

/// Registry entry for one service.
struct ServiceEntry {
    descriptor: Arc<ServiceDescriptor>,
    region: String,
    timeouts: Timeouts,
    retry: RetryPolicy,
    connector: Option<Arc<dyn ServiceConnector>>,
    breaker: CircuitBreaker,
    cached: RwLock<Option<ClientHandle>>,
}

impl ServiceEntry {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn cached(&self) -> Option<ClientHandle> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_cached(&self) -> bool {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Cache `handle` unless a concurrent caller already cached one; the
    /// first stored handle wins.
    fn store(&self, handle: ClientHandle) -> ClientHandle {
        let mut slot = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(existing) => existing.clone(),
            None => {
                *slot = Some(handle.clone());
                handle
            }
        }
    }

    fn evict(&self) -> bool {
        self.cached
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    fn context(&self) -> ConnectContext {
        ConnectContext {
            descriptor: self.descriptor.clone(),
            region: self.region.clone(),
            timeouts: self.timeouts,
        }
    }
}

/// Builder for [`ClientManager`].
pub struct ClientManagerBuilder {
    config: ManagerConfig,
    connectors: HashMap<String, Arc<dyn ServiceConnector>>,
    http: Arc<dyn ServiceConnector>,
}

impl ClientManagerBuilder {
    /// Register the connector for one service, replacing the default.
    pub fn connector(mut self, service: impl Into<String>, connector: Arc<dyn ServiceConnector>) -> Self {
        self.connectors.insert(service.into(), connector);
        self
    }

    /// Replace the connector used for `kind = "http"` services.
    pub fn http_connector(mut self, connector: Arc<dyn ServiceConnector>) -> Self {
        self.http = connector;
        self
    }

    /// Validate the configuration and assemble the manager.
    pub fn build(mut self) -> ClientResult<ClientManager> {
        validate_config(&self.config).map_err(|errors| {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            ClientError::InvalidArgument(format!("invalid configuration: {joined}"))
        })?;

        let mut entries = Vec::with_capacity(self.config.services.len());
        let mut index = HashMap::new();

        for descriptor in std::mem::take(&mut self.config.services) {
            if index.contains_key(&descriptor.name) {
                return Err(ClientError::InvalidArgument(format!(
                    "duplicate service: {}",
                    descriptor.name
                )));
            }

            let retry = RetryPolicy::from_config(descriptor.retry.as_ref().unwrap_or(&self.config.retry))
                .map_err(|e| ClientError::InvalidArgument(format!("{}: {e}", descriptor.name)))?;

            let connector = match self.connectors.remove(&descriptor.name) {
                Some(c) => Some(c),
                None if descriptor.kind == ServiceKind::Http => Some(self.http.clone()),
                None => None,
            };
            if descriptor.enabled && connector.is_none() {
                return Err(ClientError::InvalidArgument(format!(
                    "{}: enabled custom service has no registered connector",
                    descriptor.name
                )));
            }

            let entry = ServiceEntry {
                region: descriptor.region_or(&self.config.region).to_string(),
                timeouts: Timeouts::for_service(&self.config.pool, &descriptor),
                retry,
                connector,
                breaker: CircuitBreaker::new(
                    descriptor.name.clone(),
                    descriptor.failure_threshold,
                    descriptor.recovery_timeout(),
                ),
                cached: RwLock::new(None),
                descriptor: Arc::new(descriptor),
            };

            index.insert(entry.name().to_string(), entries.len());
            entries.push(entry);
        }

        if let Some(unused) = self.connectors.keys().next() {
            return Err(ClientError::UnknownService(unused.clone()));
        }

        let pool = ConnectionPool::from_config(&self.config.pool);
        tracing::info!(
            region = %self.config.region,
            services = entries.len(),
            enabled = entries.iter().filter(|e| e.descriptor.enabled).count(),
            max_connections = pool.max_connections(),
            "Client manager initialized"
        );

        Ok(ClientManager {
            region: self.config.region,
            entries,
            index,
            pool,
            monitor: HealthMonitor::new(),
        })
    }
}

/// Creates, caches, protects, and monitors clients for external services.
pub struct ClientManager {
    region: String,
    entries: Vec<ServiceEntry>,
    index: HashMap<String, usize>,
    pool: ConnectionPool,
    monitor: HealthMonitor,
}

impl ClientManager {
    pub fn builder(config: ManagerConfig) -> ClientManagerBuilder {
        ClientManagerBuilder {
            config,
            connectors: HashMap::new(),
            http: Arc::new(HttpConnector::new()),
        }
    }

    /// Manager using the built-in HTTP connector for every `http` service.
    pub fn new(config: ManagerConfig) -> ClientResult<Self> {
        Self::builder(config).build()
    }

    fn entry(&self, name: &str) -> ClientResult<&ServiceEntry> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| ClientError::UnknownService(name.to_string()))
    }

    /// Client for `name`, or `None` when the service is currently unavailable.
    ///
    /// Never fails loudly: callers treat `None` as "use the fallback path".
    pub async fn get_client(&self, name: &str) -> Option<ClientHandle> {
        self.try_get_client(name).await.ok()
    }

    /// Client for `name`, with the reason when it is unavailable.
    pub async fn try_get_client(&self, name: &str) -> ClientResult<ClientHandle> {
        let entry = self.entry(name).inspect_err(|_| {
            tracing::warn!(service = %name, "Requested client for unknown service");
        })?;

        if !entry.descriptor.enabled {
            tracing::debug!(service = %name, "Service is disabled in configuration");
            return Err(ClientError::Disabled(name.to_string()));
        }

        if let Some(handle) = entry.cached() {
            return Ok(handle);
        }

        let admission = self.admit(entry)?;
        let permit = self.acquire_permit(entry)?;

        let connector = match &entry.connector {
            Some(c) => c.clone(),
            None => {
                drop(permit);
                return Err(ClientError::Permanent(format!("{name}: no connector registered")));
            }
        };

        let span = tracing::info_span!(
            "construct_client",
            service = %name,
            attempt_id = %Uuid::new_v4(),
            probe = admission.is_probe(),
        );
        let result = entry
            .retry
            .run(name, || {
                with_deadline(name, entry.timeouts, connector.connect(entry.context()))
            })
            .instrument(span)
            .await;

        let result = result.map(|handle| entry.store(handle));
        self.record_outcome(entry, admission, &result);
        metrics::record_construction(name, outcome_label(&result));

        match &result {
            Ok(_) => tracing::info!(service = %name, region = %entry.region, "Client initialized"),
            Err(e) => tracing::warn!(service = %name, error = %e, "Could not initialize client"),
        }

        self.pool.release(permit);
        result
    }

    /// Run `op` against the service's client under breaker, pool, retry and
    /// deadline protection, recording the outcome.
    pub async fn call<T, F, Fut>(&self, name: &str, mut op: F) -> ClientResult<T>
    where
        F: FnMut(ClientHandle) -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let handle = self.try_get_client(name).await?;
        let entry = self.entry(name)?;

        let admission = self.admit(entry)?;
        let permit = self.acquire_permit(entry)?;

        let result = entry
            .retry
            .run(name, || with_deadline(name, entry.timeouts, op(handle.clone())))
            .await;

        self.record_outcome(entry, admission, &result);
        metrics::record_call(name, outcome_label(&result));
        self.pool.release(permit);
        result
    }

    fn admit<'a>(&self, entry: &'a ServiceEntry) -> ClientResult<BreakerPermit<'a>> {
        entry.breaker.admit().inspect_err(|e| {
            tracing::warn!(service = %entry.name(), error = %e, "Circuit breaker open, using fallback");
            metrics::record_rejection(entry.name(), e.kind());
        })
    }

    fn acquire_permit(&self, entry: &ServiceEntry) -> ClientResult<PoolPermit> {
        self.pool.acquire().inspect_err(|e| {
            tracing::warn!(service = %entry.name(), error = %e, "Connection pool exhausted");
            metrics::record_rejection(entry.name(), e.kind());
        })
    }

    fn record_outcome<T>(&self, entry: &ServiceEntry, admission: BreakerPermit<'_>, result: &ClientResult<T>) {
        let name = entry.name();
        match result {
            Ok(_) => {
                self.monitor.record_success(name);
                admission.success();
            }
            Err(e) if e.counts_as_service_failure() => {
                self.monitor.record_failure(name, e);
                admission.failure();
            }
            Err(e) => {
                tracing::error!(service = %name, error = %e, "Non-retryable failure");
                self.monitor.record_failure(name, e);
                drop(admission);
            }
        }
    }

    /// Availability of one client, constructing it on demand.
    pub async fn client_status(&self, name: &str) -> ClientResult<ClientStatus> {
        let region = self.entry(name)?.region.clone();
        let outcome = self.try_get_client(name).await;
        Ok(ClientStatus {
            service: name.to_string(),
            available: outcome.is_ok(),
            client_initialized: self.is_cached(name),
            region,
            reason: outcome.err().map(|e| e.to_string()),
        })
    }

    /// Evict one cached client and reset its breaker.
    ///
    /// Returns whether a client was cached.
    pub fn force_refresh(&self, name: &str) -> ClientResult<bool> {
        let entry = self.entry(name)?;
        let evicted = entry.evict();
        entry.breaker.reset();
        tracing::info!(service = %name, evicted, "Client cache cleared");
        Ok(evicted)
    }

    /// Evict every cached client, e.g. after credential rotation.
    ///
    /// Returns the number of evicted clients.
    pub fn refresh_all(&self) -> usize {
        let evicted = self.entries.iter().filter(|e| e.evict()).count();
        tracing::info!(evicted, "Client cache cleared, clients rebuild on next access");
        evicted
    }

    pub fn reset_circuit_breaker(&self, name: &str) -> ClientResult<()> {
        self.entry(name)
            .inspect_err(|_| tracing::warn!(service = %name, "No circuit breaker for service"))?
            .breaker
            .reset();
        Ok(())
    }

    pub fn reset_all_circuit_breakers(&self) {
        for entry in &self.entries {
            entry.breaker.reset();
        }
        tracing::info!("All circuit breakers reset");
    }

    /// Health of every configured service plus a process-wide summary.
    pub fn health_snapshot(&self) -> HealthSnapshot {
        let mut services = BTreeMap::new();
        let mut enabled_services = Vec::new();
        let mut healthy = 0;
        let mut critical = 0;

        for entry in &self.entries {
            let report = ServiceReport::new(
                entry.descriptor.enabled,
                entry.is_cached(),
                entry.region.clone(),
                self.monitor.report(entry.name()),
                entry.breaker.snapshot(),
            );

            if entry.descriptor.enabled {
                enabled_services.push(entry.name().to_string());
                match report.status {
                    HealthStatus::Healthy => healthy += 1,
                    HealthStatus::Critical => critical += 1,
                    _ => {}
                }
            }
            services.insert(entry.name().to_string(), report);
        }

        let summary = HealthSummary {
            healthy_count: healthy,
            critical_count: critical,
            enabled_count: enabled_services.len(),
            total_count: self.entries.len(),
            pool_utilization: self.pool.utilization(),
            overall_status: overall_status(enabled_services.len(), healthy, critical),
            enabled_services,
            region: self.region.clone(),
            timestamp: Utc::now(),
        };

        HealthSnapshot {
            services,
            summary,
            pool: self.pool.snapshot(),
        }
    }

    /// Pool, breaker and health detail for every service.
    pub fn performance_metrics(&self) -> PerformanceReport {
        let pool = self.pool.snapshot();
        let utilization_percentage = pool.utilization * 100.0;

        PerformanceReport {
            connection_pool: PoolMetrics {
                pool,
                utilization_percentage,
            },
            circuit_breakers: self
                .entries
                .iter()
                .map(|e| (e.name().to_string(), e.breaker.snapshot()))
                .collect(),
            service_health: self
                .entries
                .iter()
                .map(|e| {
                    let detail = ServiceHealthDetail {
                        health: self.monitor.report(e.name()),
                        enabled: e.descriptor.enabled,
                        client_initialized: e.is_cached(),
                    };
                    (e.name().to_string(), detail)
                })
                .collect(),
            timestamp: Utc::now(),
        }
    }

    pub fn get_health(&self, name: &str) -> HealthReport {
        self.monitor.report(name)
    }

    pub fn circuit_state(&self, name: &str) -> ClientResult<CircuitState> {
        Ok(self.entry(name)?.breaker.state())
    }

    pub fn breaker_snapshot(&self, name: &str) -> ClientResult<BreakerSnapshot> {
        Ok(self.entry(name)?.breaker.snapshot())
    }

    pub fn descriptor(&self, name: &str) -> ClientResult<&ServiceDescriptor> {
        self.entry(name).map(|e| e.descriptor.as_ref())
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.entry(name).map(|e| e.descriptor.enabled).unwrap_or(false)
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.entry(name).map(ServiceEntry::is_cached).unwrap_or(false)
    }

    /// Service names in configuration order.
    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(ServiceEntry::name)
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }
}

fn outcome_label<T>(result: &ClientResult<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::connector::connector_fn;

    fn config(services: Vec<ServiceDescriptor>) -> ManagerConfig {
        ManagerConfig {
            services,
            ..ManagerConfig::default()
        }
    }

    #[test]
    fn test_enabled_custom_service_needs_connector() {
        let cfg = config(vec![ServiceDescriptor::new("encryption")
            .enabled(true)
            .kind(ServiceKind::Custom)]);
        assert!(matches!(
            ClientManager::new(cfg),
            Err(ClientError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_build_validates_config() {
        let mut cfg = config(vec![ServiceDescriptor::new("sms").thresholds(0, 0)]);
        cfg.pool.max_connections = 0;

        let err = ClientManager::new(cfg).err().unwrap();
        let message = err.to_string();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
        assert!(message.contains("pool.max_connections"));
        assert!(message.contains("sms: failure_threshold"));
        assert!(message.contains("sms: recovery_timeout_secs"));
    }

    #[test]
    fn test_connector_for_unknown_service_rejected() {
        let cfg = config(vec![ServiceDescriptor::new("sms")]);
        let result = ClientManager::builder(cfg)
            .connector(
                "fax",
                connector_fn(|ctx| async move {
                    Ok::<_, ClientError>(ClientHandle::new(&ctx.descriptor.name, ()))
                }),
            )
            .build();
        assert!(matches!(result, Err(ClientError::UnknownService(name)) if name == "fax"));
    }

    #[test]
    fn test_region_fallback() {
        let mut sms = ServiceDescriptor::new("sms");
        sms.region = Some("us-east-1".into());
        let manager = ClientManager::new(config(vec![sms, ServiceDescriptor::new("email")])).unwrap();

        let snapshot = manager.health_snapshot();
        assert_eq!(snapshot.service("sms").unwrap().region, "us-east-1");
        assert_eq!(snapshot.service("email").unwrap().region, "ap-south-1");
        assert_eq!(snapshot.summary.total_count, 2);
        assert_eq!(snapshot.summary.enabled_count, 0);
        assert_eq!(snapshot.summary.overall_status, HealthStatus::Unknown);
    }

    #[tokio::test]
    async fn test_unknown_service() {
        let manager = ClientManager::new(config(vec![])).unwrap();
        assert!(manager.get_client("nope").await.is_none());
        assert_eq!(
            manager.try_get_client("nope").await.unwrap_err(),
            ClientError::UnknownService("nope".into())
        );
        assert!(manager.force_refresh("nope").is_err());
        assert!(manager.reset_circuit_breaker("nope").is_err());
    }
}
