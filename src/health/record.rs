//! Per-service health counters and status classification.
//!
//! # Status
//! ```text
//! no calls                    → unknown
//! consecutive_failures >= 5   → critical
//! consecutive_failures >= 3   → degraded
//! success_rate < 0.8          → warning
//! otherwise                   → healthy
//! ```
//!
//! Status is derived on every read and never stored, so it cannot go stale
//! relative to the counters.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Consecutive failures at which a service is critical.
pub const CRITICAL_CONSECUTIVE_FAILURES: u64 = 5;
/// Consecutive failures at which a service is degraded.
pub const DEGRADED_CONSECUTIVE_FAILURES: u64 = 3;
/// Success rate below which a service is flagged.
pub const WARNING_SUCCESS_RATE: f64 = 0.8;

/// Health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Unknown,
    Healthy,
    Warning,
    Degraded,
    Critical,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Unknown => "unknown",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Critical => "critical",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw counters for one service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthRecord {
    pub success_count: u64,
    pub failure_count: u64,
    pub last_success_time: Option<DateTime<Utc>>,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub consecutive_failures: u64,
    pub last_error: Option<String>,
}

impl HealthRecord {
    pub fn record_success(&mut self) {
        self.success_count += 1;
        self.consecutive_failures = 0;
        self.last_success_time = Some(Utc::now());
    }

    pub fn record_failure(&mut self, error: impl std::fmt::Display) {
        self.failure_count += 1;
        self.consecutive_failures += 1;
        self.last_failure_time = Some(Utc::now());
        self.last_error = Some(error.to_string());
    }

    pub fn total_calls(&self) -> u64 {
        self.success_count + self.failure_count
    }

    /// Success ratio, `None` before the first call.
    pub fn success_rate(&self) -> Option<f64> {
        match self.total_calls() {
            0 => None,
            total => Some(self.success_count as f64 / total as f64),
        }
    }

    pub fn status(&self) -> HealthStatus {
        let Some(rate) = self.success_rate() else {
            return HealthStatus::Unknown;
        };

        if self.consecutive_failures >= CRITICAL_CONSECUTIVE_FAILURES {
            HealthStatus::Critical
        } else if self.consecutive_failures >= DEGRADED_CONSECUTIVE_FAILURES {
            HealthStatus::Degraded
        } else if rate < WARNING_SUCCESS_RATE {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        }
    }

    /// Counters plus derived fields, ready to serialize.
    pub fn report(&self) -> HealthReport {
        HealthReport {
            status: self.status(),
            success_rate: self.success_rate(),
            total_calls: self.total_calls(),
            record: self.clone(),
        }
    }
}

/// A health record with its derived classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub success_rate: Option<f64>,
    pub total_calls: u64,
    #[serde(flatten)]
    pub record: HealthRecord,
}

impl HealthReport {
    /// Report for a service with no recorded calls.
    pub fn unknown() -> Self {
        HealthRecord::default().report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_ladder() {
        let mut r = HealthRecord::default();
        assert_eq!(r.status(), HealthStatus::Unknown);

        r.record_success();
        assert_eq!(r.status(), HealthStatus::Healthy);

        r.record_failure("boom");
        // 1/2 succeeded
        assert_eq!(r.status(), HealthStatus::Warning);

        r.record_failure("boom");
        r.record_failure("boom");
        assert_eq!(r.status(), HealthStatus::Degraded);

        r.record_failure("boom");
        r.record_failure("boom");
        assert_eq!(r.status(), HealthStatus::Critical);
        assert_eq!(r.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_success_clears_streak_only() {
        let mut r = HealthRecord::default();
        for _ in 0..4 {
            r.record_failure("timeout");
        }
        r.record_success();
        assert_eq!(r.consecutive_failures, 0);
        assert_eq!(r.failure_count, 4);
        assert_eq!(r.success_count, 1);
        assert_eq!(r.success_rate(), Some(0.2));
        assert_eq!(r.status(), HealthStatus::Warning);
    }

    #[test]
    fn test_blip_stays_healthy() {
        let mut r = HealthRecord::default();
        for _ in 0..9 {
            r.record_success();
        }
        r.record_failure("reset");
        assert_eq!(r.success_rate(), Some(0.9));
        assert_eq!(r.status(), HealthStatus::Healthy);
    }
}
