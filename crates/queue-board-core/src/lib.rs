#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
#![allow(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
//! # Queue Board Core - single-writer replicated queue
//!
//! A fixed-capacity, ordered queue of participants shared by everyone in a
//! session. Exactly one participant at a time holds the writer role and
//! mutates the queue; everyone else renders a read-only view and sends
//! commands to the writer.
//!
//! ## Design Principles
//!
//! - **Single writer**: mutation requires a [`Writer`], which the board only
//!   hands out while the role oracle says so
//! - **Revision gate**: views never move to an older revision, so reordered or
//!   duplicated broadcasts are harmless
//! - **Debounced replication**: bursts of mutations go out as one broadcast
//!   and one revision bump
//! - **Prefix layout**: used slots form a prefix; departures leave a marker
//!   in place and never shift the queue
//! - **Effects at the edge**: role, transport, identity and time come from
//!   [`BoardEffects`]

pub mod board;
pub mod codec;
pub mod config;
pub mod effects;
pub mod errors;
pub mod handlers;
pub mod pager;
pub mod pending;
pub mod prelude;
pub mod presentation;
pub mod replicator;
pub mod state;
pub mod view;
pub mod wire;

pub use board::{Board, Delivery, RequestOutcome};
pub use codec::{PackedSlot, ParticipantId, Slot};
pub use config::{BoardConfig, MAX_CAPACITY};
pub use effects::{
    BoardEffects, CommandTransport, IdentitySource, PhysicalClock, ReplicationTransport,
    RoleOracle, SystemClock,
};
pub use errors::{BoardError, Rejection, Result};
pub use handlers::{BoardCommand, CommandOutcome, Writer};
pub use pager::{PageInfo, Pager};
pub use pending::{PendingAction, PendingKind};
pub use presentation::{truncate_label, BoardSnapshot, Controls, RowView};
pub use replicator::Replicator;
pub use state::{ReplicatedState, Revision};
pub use view::{Acceptance, ReplicaMailbox, ViewBuffer};
pub use wire::{
    CommandEnvelope, ReplicationPayload, WireMessage, WirePayload, BOARD_WIRE_SCHEMA_VERSION,
};
