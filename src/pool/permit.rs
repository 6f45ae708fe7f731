//! RAII pool permit.

use std::sync::Arc;

use super::PoolState;

/// A held pool slot. The slot is returned when the permit is dropped, so
/// early returns and panics cannot leak capacity.
#[derive(Debug)]
pub struct PoolPermit {
    state: Arc<PoolState>,
}

impl PoolPermit {
    pub(super) fn new(state: Arc<PoolState>) -> Self {
        Self { state }
    }

    /// Return the slot explicitly.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for PoolPermit {
    fn drop(&mut self) {
        self.state.release();
    }
}
