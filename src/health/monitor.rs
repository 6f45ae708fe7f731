//! Service health monitor.
//!
//! Records created lazily per service name. The map is only write-locked to
//! insert a new service; counter updates take that service's own mutex, so
//! recording for one service never blocks reads of another.

use dashmap::DashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::health::record::{HealthRecord, HealthReport, HealthStatus};
use crate::observability::metrics;

/// Tracks call outcomes for every service.
#[derive(Debug, Default)]
pub struct HealthMonitor {
    records: DashMap<String, Arc<Mutex<HealthRecord>>>,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, service: &str) -> Arc<Mutex<HealthRecord>> {
        if let Some(existing) = self.records.get(service) {
            return existing.value().clone();
        }
        self.records
            .entry(service.to_string())
            .or_default()
            .value()
            .clone()
    }

    fn update<R>(&self, service: &str, f: impl FnOnce(&mut HealthRecord) -> R) -> R {
        let record = self.record(service);
        let mut guard = record.lock().unwrap_or_else(PoisonError::into_inner);
        let out = f(&mut guard);
        metrics::record_service_health(service, guard.status());
        out
    }

    pub fn record_success(&self, service: &str) {
        self.update(service, HealthRecord::record_success);
    }

    pub fn record_failure(&self, service: &str, error: impl std::fmt::Display) {
        self.update(service, |r| r.record_failure(error));
    }

    /// Current counters for `service`; a default record if never seen.
    pub fn get_health(&self, service: &str) -> HealthRecord {
        match self.records.get(service) {
            Some(entry) => entry
                .value()
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            None => HealthRecord::default(),
        }
    }

    /// Counters with derived status, computed now.
    pub fn report(&self, service: &str) -> HealthReport {
        self.get_health(service).report()
    }

    pub fn status(&self, service: &str) -> HealthStatus {
        self.get_health(service).status()
    }

    /// Names of every service with at least one recorded outcome.
    pub fn tracked_services(&self) -> Vec<String> {
        self.records.iter().map(|e| e.key().clone()).collect()
    }
}
