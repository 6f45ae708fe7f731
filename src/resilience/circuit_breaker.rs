//! Circuit breaker for service protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: service assumed down, calls fail fast
//! - Half-Open: a single probe call tests whether the service recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold after a recorded failure
//! Open → Half-Open: on the next check once recovery_timeout has elapsed
//! Half-Open → Closed: probe succeeds (failure_count reset)
//! Half-Open → Open: probe fails (last_failure re-armed)
//! ```
//!
//! There is no timer: the Open → Half-Open transition is evaluated lazily
//! from elapsed time whenever a caller checks the breaker. Each breaker owns
//! its own lock, so traffic to one service never contends with another.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{ClientError, ClientResult};
use crate::observability::metrics;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }

    /// Gauge encoding: 0 closed, 1 half-open, 2 open.
    pub fn as_gauge(&self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a call was let through the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Breaker closed, normal call.
    Normal,
    /// Breaker half-open, this caller holds the single probe slot.
    Probe,
}

/// Point-in-time view of a breaker for reports.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub failure_threshold: u32,
    pub recovery_timeout_secs: u64,
    pub last_failure_time: Option<DateTime<Utc>>,
    /// Time left before an open breaker admits a probe.
    pub retry_in_secs: Option<f64>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    last_failure_at: Option<DateTime<Utc>>,
    probe_in_flight: bool,
}

impl BreakerInner {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure: None,
            last_failure_at: None,
            probe_in_flight: false,
        }
    }
}

/// Per-service circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    service: String,
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(service: impl Into<String>, failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            service: service.into(),
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
            inner: Mutex::new(BreakerInner::closed()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn recovery_timeout(&self) -> Duration {
        self.recovery_timeout
    }

    /// Stored state. An open breaker whose timeout elapsed still reads as
    /// Open until the next [`check`](Self::check).
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    /// Decide whether a call may proceed.
    ///
    /// Performs the lazy Open → Half-Open transition. While a probe is in
    /// flight further callers are rejected as if the breaker were open.
    pub fn check(&self) -> ClientResult<Admission> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(Admission::Normal),
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure
                    .map(|t| t.elapsed())
                    .unwrap_or(self.recovery_timeout);

                if elapsed >= self.recovery_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    tracing::info!(service = %self.service, "Circuit breaker moved to half-open");
                    metrics::record_breaker_state(&self.service, CircuitState::HalfOpen);
                    Ok(Admission::Probe)
                } else {
                    Err(self.open_error(self.recovery_timeout - elapsed))
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(self.open_error(Duration::ZERO))
                } else {
                    inner.probe_in_flight = true;
                    Ok(Admission::Probe)
                }
            }
        }
    }

    /// [`check`](Self::check) wrapped in a guard that owns the outcome.
    ///
    /// Dropping the guard without recording an outcome gives a probe slot
    /// back, so a cancelled or panicking trial call cannot leave the breaker
    /// stuck in Half-Open.
    pub fn admit(&self) -> ClientResult<BreakerPermit<'_>> {
        let admission = self.check()?;
        Ok(BreakerPermit {
            breaker: self,
            admission,
            settled: false,
        })
    }

    fn open_error(&self, retry_in: Duration) -> ClientError {
        ClientError::CircuitOpen {
            service: self.service.clone(),
            retry_in,
        }
    }

    /// Record a successful call: closes the breaker and clears failures.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        let previous = inner.state;
        inner.failure_count = 0;
        inner.state = CircuitState::Closed;
        inner.probe_in_flight = false;

        if previous != CircuitState::Closed {
            tracing::info!(service = %self.service, from = %previous, "Circuit breaker closed");
            metrics::record_breaker_state(&self.service, CircuitState::Closed);
        }
    }

    /// Record a failed call; may open the breaker.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure = Some(Instant::now());
        inner.last_failure_at = Some(Utc::now());
        inner.probe_in_flight = false;

        let reopen = inner.state == CircuitState::HalfOpen;
        if reopen || inner.failure_count >= self.failure_threshold {
            if inner.state != CircuitState::Open {
                tracing::warn!(
                    service = %self.service,
                    failures = inner.failure_count,
                    threshold = self.failure_threshold,
                    "Circuit breaker opened"
                );
                metrics::record_breaker_state(&self.service, CircuitState::Open);
            }
            inner.state = CircuitState::Open;
        }
    }

    /// Give back a probe slot that was never used (e.g. the pool was full).
    pub fn abandon_probe(&self) {
        self.lock().probe_in_flight = false;
    }

    /// Force the breaker closed with zero failures.
    pub fn reset(&self) {
        *self.lock() = BreakerInner::closed();
        tracing::info!(service = %self.service, "Circuit breaker reset");
        metrics::record_breaker_state(&self.service, CircuitState::Closed);
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        let retry_in_secs = match (inner.state, inner.last_failure) {
            (CircuitState::Open, Some(t)) => Some(
                self.recovery_timeout
                    .saturating_sub(t.elapsed())
                    .as_secs_f64(),
            ),
            _ => None,
        };

        BreakerSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            failure_threshold: self.failure_threshold,
            recovery_timeout_secs: self.recovery_timeout.as_secs(),
            last_failure_time: inner.last_failure_at,
            retry_in_secs,
        }
    }

    /// Monotonic time of the last recorded failure.
    pub fn last_failure(&self) -> Option<Instant> {
        self.lock().last_failure
    }
}

/// A call admitted by [`CircuitBreaker::admit`].
///
/// Consumed by [`success`](Self::success) or [`failure`](Self::failure).
/// Dropped unsettled, a probe admission releases its slot.
#[derive(Debug)]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    admission: Admission,
    settled: bool,
}

impl BreakerPermit<'_> {
    pub fn admission(&self) -> Admission {
        self.admission
    }

    pub fn is_probe(&self) -> bool {
        self.admission == Admission::Probe
    }

    pub fn success(mut self) {
        self.settled = true;
        self.breaker.record_success();
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.record_failure();
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.admission == Admission::Probe {
            tracing::debug!(service = %self.breaker.service, "Probe ended without an outcome");
            self.breaker.abandon_probe();
        }
    }
}
