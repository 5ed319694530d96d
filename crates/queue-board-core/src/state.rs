//! Replicated queue state.
//!
//! [`ReplicatedState`] is the authoritative slot array plus its revision. Only
//! the participant holding the writer role mutates it, and only through
//! [`crate::handlers::Writer`]. Occupied and left slots always form a prefix of
//! the array: appends go right after the last used slot and departures never
//! shift anything.

use crate::codec::{ParticipantId, Slot};
use crate::errors::Rejection;
use crate::wire::ReplicationPayload;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonic version counter of the replicated state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Revision(pub u64);

impl Revision {
    /// Revision of a freshly created board.
    pub const INITIAL: Revision = Revision(0);

    /// Wrap a raw revision number.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw revision number.
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The following revision.
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Highest index whose slot is not empty, scanning from the end.
pub fn last_occupied_index(slots: &[Slot]) -> Option<usize> {
    slots.iter().rposition(|slot| !slot.is_empty())
}

/// Index of the slot held by `participant`, compared after masking.
/// Left markers never match.
pub fn find_participant(slots: &[Slot], participant: ParticipantId) -> Option<usize> {
    slots.iter().position(|slot| slot.is_held_by(participant))
}

/// Whether every non-empty slot precedes every empty one.
pub fn is_prefix_contiguous(slots: &[Slot]) -> bool {
    match last_occupied_index(slots) {
        Some(last) => slots[..=last].iter().all(|slot| !slot.is_empty()),
        None => true,
    }
}

/// The authoritative slot array and its revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicatedState {
    slots: Vec<Slot>,
    revision: Revision,
}

impl ReplicatedState {
    /// Empty state with `capacity` slots at the initial revision.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![Slot::Empty; capacity],
            revision: Revision::INITIAL,
        }
    }

    /// State adopted from existing slots, e.g. the view held at role handoff.
    pub fn from_parts(slots: Vec<Slot>, revision: Revision) -> Self {
        Self { slots, revision }
    }

    /// Number of addressable slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// All slots in queue order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Slot at `index`, if in bounds.
    pub fn slot(&self, index: usize) -> Option<Slot> {
        self.slots.get(index).copied()
    }

    /// Current revision.
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Highest used index, `None` when the queue is empty.
    pub fn last_occupied_index(&self) -> Option<usize> {
        last_occupied_index(&self.slots)
    }

    /// Index held by `participant`, `None` if absent or left.
    pub fn find_by_participant(&self, participant: ParticipantId) -> Option<usize> {
        find_participant(&self.slots, participant)
    }

    /// Index the next join would occupy.
    pub fn append_row(&self) -> Result<usize, Rejection> {
        let next = self.last_occupied_index().map_or(0, |last| last + 1);
        if next < self.slots.len() {
            Ok(next)
        } else {
            Err(Rejection::CapacityExceeded)
        }
    }

    /// Whether every slot is used.
    pub fn is_full(&self) -> bool {
        self.append_row().is_err()
    }

    /// Atomic `{slots, revision}` payload for broadcast or local echo.
    pub fn to_payload(&self) -> ReplicationPayload {
        ReplicationPayload::from_slots(&self.slots, self.revision)
    }

    pub(crate) fn set_slot(&mut self, index: usize, slot: Slot) {
        self.slots[index] = slot;
    }

    pub(crate) fn adopt(&mut self, payload: &ReplicationPayload) {
        self.slots = payload.decode_slots();
        self.revision = payload.revision;
    }

    pub(crate) fn fast_forward(&mut self, revision: Revision) {
        self.revision = self.revision.max(revision);
    }

    pub(crate) fn bump_revision(&mut self) -> Revision {
        self.revision = self.revision.next();
        self.revision
    }
}
