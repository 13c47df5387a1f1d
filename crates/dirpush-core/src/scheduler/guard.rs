//! RAII guard that releases a concurrency slot when dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OwnedSemaphorePermit;

/// Held for the whole life of one task body. Dropping it (normal return,
/// error, or unwinding panic) returns the permit and decrements `running`.
pub(super) struct SlotGuard {
    _permit: OwnedSemaphorePermit,
    running: Arc<AtomicUsize>,
}

impl SlotGuard {
    pub(super) fn new(permit: OwnedSemaphorePermit, running: Arc<AtomicUsize>) -> Self {
        running.fetch_add(1, Ordering::AcqRel);
        Self {
            _permit: permit,
            running,
        }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.running.fetch_sub(1, Ordering::AcqRel);
    }
}
