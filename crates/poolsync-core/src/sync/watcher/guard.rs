//! Single-slot "reconciliation in progress" flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Holds the slot until dropped, even if the holder panics or is cancelled.
pub(crate) struct ReconcileGuard {
    in_flight: Arc<AtomicBool>,
}

impl ReconcileGuard {
    /// `None` when another holder has the slot.
    pub(crate) fn try_acquire(in_flight: &Arc<AtomicBool>) -> Option<Self> {
        in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { in_flight: Arc::clone(in_flight) })
    }
}

impl Drop for ReconcileGuard {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }
}
