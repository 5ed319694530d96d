//! Slot encoding.
//!
//! A queue slot is one of three states: empty, occupied by a participant, or
//! marked as left by a participant who has since departed. On the wire each
//! slot packs into a `u16`: the low 15 bits carry the participant identifier
//! and the high bit carries the done flag. Identifier 0 is the empty slot and
//! the all-ones identifier is the left marker.
//!
//! Participant identifiers wider than 15 bits are masked. Two participants
//! whose identifiers share the low 15 bits alias to the same slot identity;
//! this is a known limitation of the packed form and is not corrected here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the participant identifier inside a packed slot.
pub const ID_BITS: u32 = 15;

/// Mask selecting the identifier bits of a packed slot.
pub const ID_MASK: u16 = (1 << ID_BITS) - 1;

/// Mask selecting the done bit of a packed slot.
pub const DONE_MASK: u16 = 1 << ID_BITS;

/// Reserved identifier marking a slot whose participant has left.
pub const LEFT_SENTINEL: u16 = ID_MASK;

/// Identifier of a participant as reported by the identity source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u32);

impl ParticipantId {
    /// Wrap a raw identifier.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw identifier value.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The identifier as stored in a slot.
    pub const fn masked(self) -> Self {
        Self(self.0 & ID_MASK as u32)
    }

    /// Whether this identifier survives masking as a distinct occupant.
    ///
    /// Identifiers that mask to 0 would read back as an empty slot and those
    /// that mask to [`LEFT_SENTINEL`] would read back as a left marker.
    pub const fn is_representable(self) -> bool {
        let masked = self.0 & ID_MASK as u32;
        masked != 0 && masked != LEFT_SENTINEL as u32
    }

    /// Whether two identifiers occupy the same slot identity after masking.
    pub const fn aliases(self, other: ParticipantId) -> bool {
        self.masked().0 == other.masked().0
    }
}

impl From<u32> for ParticipantId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One queue position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Slot {
    /// Unused position.
    #[default]
    Empty,
    /// Position held by a present participant.
    Occupied {
        /// Masked participant identifier.
        participant: ParticipantId,
        /// Whether the entry is checked off.
        done: bool,
    },
    /// Position held by a participant who has left. The done flag is the
    /// value it had at the moment of departure.
    Left {
        /// Whether the entry was checked off.
        done: bool,
    },
}

impl Slot {
    /// Occupied slot for `participant`, storing its masked identifier.
    pub const fn occupied(participant: ParticipantId, done: bool) -> Self {
        Slot::Occupied {
            participant: participant.masked(),
            done,
        }
    }

    /// True for [`Slot::Empty`].
    pub const fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    /// True for [`Slot::Occupied`].
    pub const fn is_occupied(&self) -> bool {
        matches!(self, Slot::Occupied { .. })
    }

    /// True for [`Slot::Left`].
    pub const fn is_left(&self) -> bool {
        matches!(self, Slot::Left { .. })
    }

    /// Done flag; always false for an empty slot.
    pub const fn done(&self) -> bool {
        match *self {
            Slot::Empty => false,
            Slot::Occupied { done, .. } | Slot::Left { done } => done,
        }
    }

    /// Occupant, if the slot is occupied by a present participant.
    pub const fn participant(&self) -> Option<ParticipantId> {
        match *self {
            Slot::Occupied { participant, .. } => Some(participant),
            _ => None,
        }
    }

    /// Whether this slot is held by `participant` (compared after masking).
    pub const fn is_held_by(&self, participant: ParticipantId) -> bool {
        match *self {
            Slot::Occupied { participant: p, .. } => p.aliases(participant),
            _ => false,
        }
    }

    /// Flip the done flag. Left markers keep toggling; empty slots do not.
    pub const fn toggled(self) -> Self {
        match self {
            Slot::Empty => Slot::Empty,
            Slot::Occupied { participant, done } => Slot::Occupied {
                participant,
                done: !done,
            },
            Slot::Left { done } => Slot::Left { done: !done },
        }
    }

    /// The slot after its occupant departs: a left marker with the same done
    /// flag. Empty slots and existing left markers are returned unchanged.
    pub const fn departed(self) -> Self {
        match self {
            Slot::Occupied { done, .. } => Slot::Left { done },
            other => other,
        }
    }

    /// Pack into the wire form.
    pub fn encode(self) -> PackedSlot {
        match self {
            Slot::Empty => PackedSlot::EMPTY,
            Slot::Occupied { participant, done } => encode(participant, done),
            Slot::Left { done } => PackedSlot(LEFT_SENTINEL | done_bit(done)),
        }
    }
}

/// Packed wire form of a [`Slot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackedSlot(pub u16);

impl PackedSlot {
    /// The empty slot.
    pub const EMPTY: PackedSlot = PackedSlot(0);

    /// Raw packed value.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Unpack into a [`Slot`].
    pub fn decode(self) -> Slot {
        decode(self)
    }
}

const fn done_bit(done: bool) -> u16 {
    if done {
        DONE_MASK
    } else {
        0
    }
}

/// Pack an occupied slot.
///
/// `participant` is masked to [`ID_BITS`]. An identifier that masks to 0
/// packs to the empty slot; callers check
/// [`ParticipantId::is_representable`] before placing a participant.
pub fn encode(participant: ParticipantId, done: bool) -> PackedSlot {
    let id = (participant.0 & ID_MASK as u32) as u16;
    if id == 0 {
        return PackedSlot::EMPTY;
    }
    PackedSlot(id | done_bit(done))
}

/// Unpack a slot. A zero identifier reads as empty regardless of the done bit.
pub fn decode(packed: PackedSlot) -> Slot {
    let id = packed.0 & ID_MASK;
    let done = packed.0 & DONE_MASK != 0;
    match id {
        0 => Slot::Empty,
        LEFT_SENTINEL => Slot::Left { done },
        id => Slot::Occupied {
            participant: ParticipantId(u32::from(id)),
            done,
        },
    }
}
