//! Metrics collection and exposition.
//!
//! # Metrics
//! - `client_manager_constructions_total` (counter): construction outcomes by service
//! - `client_manager_calls_total` (counter): protected call outcomes by service
//! - `client_manager_rejections_total` (counter): breaker/pool rejections by reason
//! - `client_manager_retries_total` (counter): retry sleeps by service
//! - `client_manager_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `client_manager_pool_active` (gauge): in-flight connection work
//! - `client_manager_service_health` (gauge): 0=unknown .. 4=critical
//!
//! Recording is a no-op until a recorder is installed, so library users
//! and tests pay nothing for it.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::health::HealthStatus;
use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics recorder"),
    }
}

pub fn record_retry(service: &str) {
    counter!("client_manager_retries_total", "service" => service.to_string()).increment(1);
}

pub fn record_construction(service: &str, outcome: &'static str) {
    counter!(
        "client_manager_constructions_total",
        "service" => service.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_call(service: &str, outcome: &'static str) {
    counter!(
        "client_manager_calls_total",
        "service" => service.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_rejection(service: &str, reason: &'static str) {
    counter!(
        "client_manager_rejections_total",
        "service" => service.to_string(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_breaker_state(service: &str, state: CircuitState) {
    gauge!("client_manager_breaker_state", "service" => service.to_string()).set(state.as_gauge());
}

pub fn record_pool_active(active: usize) {
    gauge!("client_manager_pool_active").set(active as f64);
}

pub fn record_service_health(service: &str, status: HealthStatus) {
    let level = match status {
        HealthStatus::Unknown => 0.0,
        HealthStatus::Healthy => 1.0,
        HealthStatus::Warning => 2.0,
        HealthStatus::Degraded => 3.0,
        HealthStatus::Critical => 4.0,
    };
    gauge!("client_manager_service_health", "service" => service.to_string()).set(level);
}
