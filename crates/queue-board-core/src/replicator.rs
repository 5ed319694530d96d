//! Debounced single-writer replication.
//!
//! Mutations do not broadcast on their own. They mark the replicator dirty,
//! which arms a delivery deadline one debounce window out unless a deadline is
//! already armed. Further mutations inside the window join the same batch; the
//! deadline is not pushed back. On the first tick at or after the deadline the
//! writer bumps the revision and emits one payload for the whole batch.
//!
//! Only the writer reaches [`Replicator::mark_dirty`] (through
//! [`crate::handlers::Writer`]) and the board only flushes while it holds the
//! writer role, so no other participant ever bumps the revision.

use crate::state::{ReplicatedState, Revision};
use crate::wire::ReplicationPayload;
use std::time::Duration;

/// Reference debounce window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Batching state for outgoing broadcasts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replicator {
    debounce_ms: u64,
    dirty: bool,
    deadline_ms: Option<u64>,
    flushes: u64,
}

impl Default for Replicator {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Replicator {
    /// Create a replicator with the given debounce window.
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce_ms: u64::try_from(debounce.as_millis()).unwrap_or(u64::MAX),
            dirty: false,
            deadline_ms: None,
            flushes: 0,
        }
    }

    /// Debounce window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Whether unbroadcast mutations are queued.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Armed delivery deadline, in clock milliseconds.
    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    /// Number of broadcasts produced so far.
    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    pub(crate) fn mark_dirty(&mut self, now_ms: u64) {
        self.dirty = true;
        if self.deadline_ms.is_none() {
            self.deadline_ms = Some(now_ms.saturating_add(self.debounce_ms));
        }
    }

    /// Produce the batched payload if the deadline has passed.
    ///
    /// Bumps the state's revision exactly once per batch.
    pub(crate) fn poll_flush(
        &mut self,
        now_ms: u64,
        state: &mut ReplicatedState,
    ) -> Option<ReplicationPayload> {
        if !self.dirty {
            return None;
        }
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {}
            _ => return None,
        }

        let revision: Revision = state.bump_revision();
        self.dirty = false;
        self.deadline_ms = None;
        self.flushes += 1;
        tracing::debug!(%revision, flushes = self.flushes, "Flushing batched mutations");
        Some(state.to_payload())
    }

    /// Forget queued work, e.g. when the writer role is (re)granted.
    pub(crate) fn reset(&mut self) {
        self.dirty = false;
        self.deadline_ms = None;
    }
}
