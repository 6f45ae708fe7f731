//! Aggregated health and performance reports.
//!
//! Everything here is plain serializable data; a dashboard or health
//! endpoint can serve these structs as JSON unchanged.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::health::{HealthReport, HealthStatus};
use crate::pool::PoolSnapshot;
use crate::resilience::{BreakerSnapshot, CircuitState};

/// Per-service entry of a [`HealthSnapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct ServiceReport {
    pub enabled: bool,
    pub cached: bool,
    pub region: String,
    pub status: HealthStatus,
    pub success_rate: Option<f64>,
    pub total_calls: u64,
    pub consecutive_failures: u64,
    pub last_success_time: Option<DateTime<Utc>>,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub circuit_state: CircuitState,
    pub circuit: BreakerSnapshot,
}

impl ServiceReport {
    pub(crate) fn new(
        enabled: bool,
        cached: bool,
        region: String,
        health: HealthReport,
        circuit: BreakerSnapshot,
    ) -> Self {
        Self {
            enabled,
            cached,
            region,
            status: health.status,
            success_rate: health.success_rate,
            total_calls: health.total_calls,
            consecutive_failures: health.record.consecutive_failures,
            last_success_time: health.record.last_success_time,
            last_failure_time: health.record.last_failure_time,
            last_error: health.record.last_error,
            circuit_state: circuit.state,
            circuit,
        }
    }
}

/// Process-wide summary of a [`HealthSnapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct HealthSummary {
    pub healthy_count: usize,
    pub critical_count: usize,
    pub enabled_count: usize,
    pub total_count: usize,
    /// Fraction of pool capacity in use, 0.0 to 1.0.
    pub pool_utilization: f64,
    pub overall_status: HealthStatus,
    pub enabled_services: Vec<String>,
    pub region: String,
    pub timestamp: DateTime<Utc>,
}

/// Health of every configured service plus a summary.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub services: BTreeMap<String, ServiceReport>,
    pub summary: HealthSummary,
    pub pool: PoolSnapshot,
}

impl HealthSnapshot {
    pub fn service(&self, name: &str) -> Option<&ServiceReport> {
        self.services.get(name)
    }
}

/// Roll enabled-service statuses into one.
///
/// Unknown when nothing is enabled; critical if any enabled service is
/// critical; degraded when under 80% are healthy; healthy when all are.
pub fn overall_status(enabled: usize, healthy: usize, critical: usize) -> HealthStatus {
    if enabled == 0 {
        HealthStatus::Unknown
    } else if critical > 0 {
        HealthStatus::Critical
    } else if (healthy as f64) < enabled as f64 * 0.8 {
        HealthStatus::Degraded
    } else if healthy == enabled {
        HealthStatus::Healthy
    } else {
        HealthStatus::Warning
    }
}

/// Pool figures with utilization as a percentage.
#[derive(Debug, Clone, Serialize)]
pub struct PoolMetrics {
    #[serde(flatten)]
    pub pool: PoolSnapshot,
    pub utilization_percentage: f64,
}

/// Health detail for one service in a [`PerformanceReport`].
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealthDetail {
    #[serde(flatten)]
    pub health: HealthReport,
    pub enabled: bool,
    pub client_initialized: bool,
}

/// Pool, breaker and health detail for every service.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub connection_pool: PoolMetrics,
    pub circuit_breakers: BTreeMap<String, BreakerSnapshot>,
    pub service_health: BTreeMap<String, ServiceHealthDetail>,
    pub timestamp: DateTime<Utc>,
}

/// Availability of one service's client.
#[derive(Debug, Clone, Serialize)]
pub struct ClientStatus {
    pub service: String,
    pub available: bool,
    pub client_initialized: bool,
    pub region: String,
    /// Why the client is unavailable, if it is.
    pub reason: Option<String>,
}
