//! Board wire format helpers.

use crate::codec::{PackedSlot, ParticipantId, Slot};
use crate::errors::{BoardError, Result};
use crate::handlers::BoardCommand;
use crate::state::Revision;
use serde::{Deserialize, Serialize};

pub const BOARD_WIRE_SCHEMA_VERSION: u16 = 1;

/// Replicated state as broadcast by the writer.
///
/// Slots and revision always travel together; a receiver never sees one
/// without the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationPayload {
    /// Revision of the state these slots belong to
    pub revision: Revision,
    /// Packed slots in queue order
    pub slots: Vec<PackedSlot>,
}

impl ReplicationPayload {
    /// Pack `slots` at `revision`.
    pub fn from_slots(slots: &[Slot], revision: Revision) -> Self {
        Self {
            revision,
            slots: slots.iter().map(|slot| slot.encode()).collect(),
        }
    }

    /// Unpack the slots.
    pub fn decode_slots(&self) -> Vec<Slot> {
        self.slots.iter().map(|packed| packed.decode()).collect()
    }
}

/// A command addressed to the writer, tagged with the caller the transport
/// observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Participant that issued the command
    pub caller: ParticipantId,
    /// The command itself
    pub command: BoardCommand,
}

impl CommandEnvelope {
    /// Create a new envelope.
    pub fn new(caller: ParticipantId, command: BoardCommand) -> Self {
        Self { caller, command }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WirePayload {
    /// Writer broadcast of the replicated state
    State(ReplicationPayload),
    /// Observer request for the writer
    Command(CommandEnvelope),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub schema_version: u16,
    pub payload: WirePayload,
}

impl WireMessage {
    /// Create a state broadcast message.
    pub fn state(payload: ReplicationPayload) -> Self {
        Self {
            schema_version: BOARD_WIRE_SCHEMA_VERSION,
            payload: WirePayload::State(payload),
        }
    }

    /// Create a command message.
    pub fn command(envelope: CommandEnvelope) -> Self {
        Self {
            schema_version: BOARD_WIRE_SCHEMA_VERSION,
            payload: WirePayload::Command(envelope),
        }
    }

    /// Extract the replicated state if this is a state message.
    pub fn replication(&self) -> Option<&ReplicationPayload> {
        match &self.payload {
            WirePayload::State(state) => Some(state),
            WirePayload::Command(_) => None,
        }
    }

    /// Extract the command if this is a command message.
    pub fn envelope(&self) -> Option<&CommandEnvelope> {
        match &self.payload {
            WirePayload::Command(envelope) => Some(envelope),
            WirePayload::State(_) => None,
        }
    }
}

pub fn encode_message(msg: &WireMessage) -> Result<Vec<u8>> {
    bincode::serialize(msg).map_err(|e| BoardError::serialization(e.to_string()))
}

pub fn decode_message(bytes: &[u8]) -> Result<WireMessage> {
    let msg: WireMessage =
        bincode::deserialize(bytes).map_err(|e| BoardError::serialization(e.to_string()))?;
    if msg.schema_version != BOARD_WIRE_SCHEMA_VERSION {
        return Err(BoardError::UnsupportedSchema {
            found: msg.schema_version,
            expected: BOARD_WIRE_SCHEMA_VERSION,
        });
    }
    Ok(msg)
}
