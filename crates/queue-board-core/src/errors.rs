//! Error and rejection types.
//!
//! [`BoardError`] covers genuine faults at the edges (transport, wire decoding,
//! configuration). Everything a command handler refuses is a [`Rejection`]:
//! an expected no-op that is logged and never surfaced to observers.

use serde::{Deserialize, Serialize};

/// Faults raised at the edges of the board.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// The replication or command transport failed to hand off a message.
    #[error("Transport error: {message}")]
    Transport {
        /// Error message describing the transport failure
        message: String,
    },

    /// Wire encoding or decoding failed.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Configuration values are out of range.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message describing the invalid field
        message: String,
    },

    /// A wire message carried a schema version this build does not read.
    #[error("Unsupported wire schema {found} (expected {expected})")]
    UnsupportedSchema {
        /// Version found on the wire
        found: u16,
        /// Version this build reads
        expected: u16,
    },
}

impl BoardError {
    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Standard result type for board operations
pub type Result<T> = std::result::Result<T, BoardError>;

/// Why a command or local action changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum Rejection {
    /// Invoked on a participant that does not hold the writer role.
    #[error("not the writer")]
    NotWriter,
    /// Join for a participant already in the queue.
    #[error("participant already present")]
    AlreadyPresent,
    /// Join with every slot already used.
    #[error("queue capacity exceeded")]
    CapacityExceeded,
    /// Leave for a participant not in the queue.
    #[error("participant not in queue")]
    UnknownParticipant,
    /// Toggle past the end of the slot array.
    #[error("slot index out of bounds")]
    OutOfBounds,
    /// Toggle on an empty slot.
    #[error("slot is empty")]
    EmptySlot,
    /// Participant identifier collides with a reserved slot value once masked.
    #[error("participant identifier not representable in a slot")]
    Unrepresentable,
    /// A join or leave from this observer is still awaiting confirmation.
    #[error("a join or leave is already pending")]
    PendingAction,
    /// The identity source has no local participant.
    #[error("no local participant")]
    NoLocalParticipant,
}
