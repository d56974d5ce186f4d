use std::sync::atomic::{AtomicBool, Ordering};

/// Boolean re-entrancy guard: at most one holder at a time, later attempts are
/// refused instead of queued.
#[derive(Debug, Default)]
pub(crate) struct SingleFlight {
    busy: AtomicBool,
}

impl SingleFlight {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claim the flag without a guard. The caller must call [`SingleFlight::release`].
    pub(crate) fn try_begin(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }

    /// Claim the flag for the lifetime of the returned guard.
    pub(crate) fn try_acquire(&self) -> Option<FlightGuard<'_>> {
        self.try_begin().then(|| FlightGuard { flight: self })
    }
}

/// Releases the flag on drop, so a future dropped mid-await never wedges it.
pub(crate) struct FlightGuard<'a> {
    flight: &'a SingleFlight,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flight.release();
    }
}
