//! Queue board prelude.
//!
//! Curated re-exports for embedding a board.

pub use crate::{
    Acceptance, Board, BoardCommand, BoardConfig, BoardEffects, BoardError, BoardSnapshot,
    CommandOutcome, CommandTransport, IdentitySource, ParticipantId, PhysicalClock, Rejection,
    ReplicationPayload, ReplicationTransport, RequestOutcome, Revision, RoleOracle, Slot,
};
