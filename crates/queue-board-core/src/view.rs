//! Observer-side view of the replicated state.
//!
//! Every participant renders from a [`ViewBuffer`]. An incoming payload is
//! applied only when its revision is not older than the last one applied, so a
//! view never moves backwards. Equal revisions re-apply, which makes
//! redelivery harmless.

use crate::codec::{ParticipantId, Slot};
use crate::state::{self, Revision};
use crate::wire::ReplicationPayload;
use parking_lot::Mutex;
use std::sync::Arc;

/// Result of offering a payload to a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// The payload replaced the view contents.
    Applied,
    /// The payload was older than the applied revision and was dropped.
    Stale {
        /// Revision already applied
        applied: Revision,
        /// Revision that was offered
        offered: Revision,
    },
    /// The payload never reached the view because this participant is the
    /// writer and renders from its authoritative copy.
    Ignored,
}

impl Acceptance {
    /// True when the payload was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, Acceptance::Applied)
    }
}

/// Read-only snapshot an observer renders from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewBuffer {
    slots: Vec<Slot>,
    revision: Revision,
}

impl ViewBuffer {
    /// Empty view with `capacity` slots at the initial revision.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Slot::Empty; capacity],
            revision: Revision::INITIAL,
        }
    }

    /// Offer a payload. Older revisions are dropped without touching the view.
    pub fn accept(&mut self, payload: &ReplicationPayload) -> Acceptance {
        if payload.revision < self.revision {
            tracing::trace!(
                applied = %self.revision,
                offered = %payload.revision,
                "Dropping stale replicated state"
            );
            return Acceptance::Stale {
                applied: self.revision,
                offered: payload.revision,
            };
        }
        self.slots = payload.decode_slots();
        self.revision = payload.revision;
        Acceptance::Applied
    }

    /// Last applied revision.
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Slots as last applied.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Slot at `index`, if in bounds.
    pub fn slot(&self, index: usize) -> Option<Slot> {
        self.slots.get(index).copied()
    }

    /// Highest used index, `None` when empty.
    pub fn last_occupied_index(&self) -> Option<usize> {
        state::last_occupied_index(&self.slots)
    }

    /// Index held by `participant`; left markers do not count.
    pub fn find_by_participant(&self, participant: ParticipantId) -> Option<usize> {
        state::find_participant(&self.slots, participant)
    }

    /// Whether `participant` currently holds an occupied slot.
    pub fn is_joined(&self, participant: ParticipantId) -> bool {
        self.find_by_participant(participant).is_some()
    }

    /// 1-based queue position of `participant`.
    pub fn rank_of(&self, participant: ParticipantId) -> Option<usize> {
        self.find_by_participant(participant).map(|index| index + 1)
    }
}

/// Latest replicated state known to a participant, shared with whatever
/// receives it.
///
/// A transport can deposit payloads here from any thread; only the highest
/// revision offered is retained. The board drains it on each tick through the
/// same revision gate as push delivery, so running both paths is safe.
#[derive(Debug, Clone, Default)]
pub struct ReplicaMailbox {
    latest: Arc<Mutex<Option<ReplicationPayload>>>,
}

impl ReplicaMailbox {
    /// Create an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deposit a payload, keeping whichever of it and the held one is newer.
    pub fn offer(&self, payload: ReplicationPayload) {
        let mut latest = self.latest.lock();
        let newer = latest
            .as_ref()
            .map_or(true, |held| payload.revision >= held.revision);
        if newer {
            *latest = Some(payload);
        }
    }

    /// Revision of the held payload.
    pub fn latest_revision(&self) -> Option<Revision> {
        self.latest.lock().as_ref().map(|held| held.revision)
    }

    /// Remove and return the held payload.
    pub fn take(&self) -> Option<ReplicationPayload> {
        self.latest.lock().take()
    }
}
