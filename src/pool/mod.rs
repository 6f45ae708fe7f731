//! Connection pool guard.
//!
//! # Responsibilities
//! - Bound concurrent in-flight connection work across all services
//! - Fail fast at capacity instead of queueing (backpressure)
//! - Release slots on every exit path via an RAII permit
//!
//! # Design Decisions
//! - One process-wide counter, not partitioned per service
//! - The lock is held only for a compare-and-increment, never across I/O

pub mod permit;

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::config::PoolConfig;
use crate::error::{ClientError, ClientResult};
use crate::observability::metrics;

pub use permit::PoolPermit;

#[derive(Debug)]
struct PoolState {
    active: Mutex<usize>,
    max_connections: usize,
}

impl PoolState {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        let mut active = self.lock();
        *active = active.saturating_sub(1);
        metrics::record_pool_active(*active);
    }
}

/// Pool usage for reports.
#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    pub active_connections: usize,
    pub max_connections: usize,
    /// Fraction of capacity in use, 0.0 to 1.0.
    pub utilization: f64,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

/// Global bounded connection counter.
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    state: Arc<PoolState>,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl ConnectionPool {
    pub fn new(max_connections: usize, connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            state: Arc::new(PoolState {
                active: Mutex::new(0),
                max_connections,
            }),
            connect_timeout,
            read_timeout,
        }
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(
            config.max_connections,
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.read_timeout_secs),
        )
    }

    /// Take a slot, or fail immediately if the pool is at capacity.
    pub fn acquire(&self) -> ClientResult<PoolPermit> {
        let mut active = self.state.lock();
        if *active >= self.state.max_connections {
            return Err(ClientError::PoolExhausted {
                active: *active,
                max: self.state.max_connections,
            });
        }
        *active += 1;
        metrics::record_pool_active(*active);
        drop(active);

        Ok(PoolPermit::new(self.state.clone()))
    }

    /// Give a slot back. Dropping the permit does the same.
    pub fn release(&self, permit: PoolPermit) {
        permit.release();
    }

    pub fn active_connections(&self) -> usize {
        *self.state.lock()
    }

    pub fn max_connections(&self) -> usize {
        self.state.max_connections
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn utilization(&self) -> f64 {
        if self.state.max_connections == 0 {
            return 0.0;
        }
        self.active_connections() as f64 / self.state.max_connections as f64
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            active_connections: self.active_connections(),
            max_connections: self.max_connections(),
            utilization: self.utilization(),
            connect_timeout_secs: self.connect_timeout.as_secs(),
            read_timeout_secs: self.read_timeout.as_secs(),
        }
    }
}
