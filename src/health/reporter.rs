//! Periodic health reporting.
//!
//! # Responsibilities
//! - Log the health summary on a fixed interval
//! - Refresh pool and breaker gauges
//! - Optionally warm up enabled clients that are not cached yet
//!
//! Warm-up goes through the normal admission path, so an open breaker
//! rejects it like any other caller.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::client::ClientManager;
use crate::config::ReporterConfig;
use crate::health::HealthStatus;
use crate::observability::metrics;

pub struct HealthReporter {
    manager: Arc<ClientManager>,
    config: ReporterConfig,
}

impl HealthReporter {
    pub fn new(manager: Arc<ClientManager>, config: ReporterConfig) -> Self {
        Self { manager, config }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Health reporter disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            warm_up = self.config.warm_up,
            "Health reporter starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health reporter received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One reporting pass.
    pub async fn tick(&self) {
        if self.config.warm_up {
            self.warm_up().await;
        }

        let snapshot = self.manager.health_snapshot();
        let summary = &snapshot.summary;

        match summary.overall_status {
            HealthStatus::Critical | HealthStatus::Degraded => tracing::warn!(
                status = %summary.overall_status,
                healthy = summary.healthy_count,
                critical = summary.critical_count,
                enabled = summary.enabled_count,
                pool_utilization = summary.pool_utilization,
                "Service health summary"
            ),
            _ => tracing::info!(
                status = %summary.overall_status,
                healthy = summary.healthy_count,
                enabled = summary.enabled_count,
                pool_utilization = summary.pool_utilization,
                "Service health summary"
            ),
        }

        metrics::record_pool_active(snapshot.pool.active_connections);
        for (name, report) in &snapshot.services {
            metrics::record_breaker_state(name, report.circuit_state);
            if report.enabled && report.status == HealthStatus::Critical {
                tracing::warn!(
                    service = %name,
                    consecutive_failures = report.consecutive_failures,
                    circuit = %report.circuit_state,
                    last_error = report.last_error.as_deref().unwrap_or(""),
                    "Service is critical"
                );
            }
        }
    }

    async fn warm_up(&self) {
        let pending: Vec<String> = self
            .manager
            .service_names()
            .filter(|name| self.manager.is_enabled(name) && !self.manager.is_cached(name))
            .map(str::to_string)
            .collect();

        for name in pending {
            if let Err(e) = self.manager.try_get_client(&name).await {
                tracing::debug!(service = %name, error = %e, "Warm-up skipped");
            }
        }
    }
}
