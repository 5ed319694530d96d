//! Property test strategies for queue board types.

use proptest::prelude::*;

// Re-export proptest for convenience
pub use proptest;

use queue_board_core::codec::LEFT_SENTINEL;
use queue_board_core::{BoardCommand, ParticipantId, ReplicationPayload, Revision, Slot};

/// Participant ids that survive masking, `#1..#32766`.
pub fn arb_participant_id() -> impl Strategy<Value = ParticipantId> {
    (1u32..u32::from(LEFT_SENTINEL)).prop_map(ParticipantId::new)
}

/// Participant ids from a small pool, so collisions and rejoins happen.
pub fn arb_pooled_participant(pool: u32) -> impl Strategy<Value = ParticipantId> {
    (1u32..=pool.max(1)).prop_map(ParticipantId::new)
}

/// Any slot value.
pub fn arb_slot() -> impl Strategy<Value = Slot> {
    prop_oneof![
        Just(Slot::Empty),
        (arb_participant_id(), any::<bool>())
            .prop_map(|(participant, done)| Slot::occupied(participant, done)),
        any::<bool>().prop_map(|done| Slot::Left { done }),
    ]
}

/// A replication payload of `capacity` slots, used slots forming a prefix.
pub fn arb_payload(capacity: usize, max_revision: u64) -> impl Strategy<Value = ReplicationPayload> {
    (
        prop::collection::vec(arb_slot(), capacity),
        0..=max_revision,
    )
        .prop_map(|(mut slots, revision)| {
            slots.sort_by_key(Slot::is_empty);
            ReplicationPayload::from_slots(&slots, Revision::new(revision))
        })
}

/// A command against a board of `capacity` slots, sometimes out of bounds.
pub fn arb_command(capacity: usize) -> impl Strategy<Value = BoardCommand> {
    prop_oneof![
        3 => Just(BoardCommand::Join),
        1 => Just(BoardCommand::Leave),
        2 => (0..capacity + 2).prop_map(|index| BoardCommand::Toggle { index }),
    ]
}

/// A `(caller, command)` workload from a pool of participants.
pub fn arb_workload(
    pool: u32,
    capacity: usize,
    max_len: usize,
) -> impl Strategy<Value = Vec<(ParticipantId, BoardCommand)>> {
    prop::collection::vec(
        (arb_pooled_participant(pool), arb_command(capacity)),
        0..max_len,
    )
}
