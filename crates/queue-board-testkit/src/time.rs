//! Manually advanced clock for deterministic tests.

use parking_lot::Mutex;
use queue_board_core::PhysicalClock;
use std::sync::Arc;
use std::time::Duration;

/// Millisecond clock that only moves when told to. Clones share the same
/// time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<Mutex<u64>>,
}

impl ManualClock {
    /// Create a clock starting at `initial_ms`.
    pub fn new(initial_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(Mutex::new(initial_ms)),
        }
    }

    /// Advance by `by`.
    pub fn advance(&self, by: Duration) {
        let by_ms = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.advance_ms(by_ms);
    }

    /// Advance by `by_ms` milliseconds.
    pub fn advance_ms(&self, by_ms: u64) {
        let mut now = self.now_ms.lock();
        *now = now.saturating_add(by_ms);
    }

    /// Set absolute time.
    pub fn set_ms(&self, now_ms: u64) {
        *self.now_ms.lock() = now_ms;
    }

    /// Current time in milliseconds.
    pub fn now(&self) -> u64 {
        *self.now_ms.lock()
    }
}

impl PhysicalClock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now()
    }
}
