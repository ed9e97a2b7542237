//! Single-permit gate guarding the bounded decode job.

use std::sync::atomic::{AtomicBool, Ordering};

/// At most one holder at a time. Acquisition never blocks: a caller that
/// loses the race simply learns the gate is busy.
#[derive(Debug, Default)]
pub struct BusyGate {
    busy: AtomicBool,
}

impl BusyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate. `false` if someone already holds it.
    pub fn try_acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}
