//! Environment seams the board depends on.
//!
//! # Effect Classification
//!
//! - **Role**: who holds the writer role ([`RoleOracle`]). Election is the
//!   environment's business; the board only asks.
//! - **Transport**: best-effort state broadcast ([`ReplicationTransport`]) and
//!   directed command delivery to the writer ([`CommandTransport`]).
//! - **Identity**: the local participant and display names
//!   ([`IdentitySource`]).
//! - **Time**: a millisecond clock ([`PhysicalClock`]).
//!
//! Inbound notifications (state received, role granted, participant departed,
//! command delivered) are not traits: the environment calls the matching
//! `on_*` method of [`crate::Board`].

use crate::codec::ParticipantId;
use crate::errors::Result;
use crate::handlers::BoardCommand;
use crate::wire::ReplicationPayload;
use std::time::Instant;

/// Reports whether this participant currently holds the writer role.
pub trait RoleOracle {
    fn is_writer(&self) -> bool;
}

/// Fire-and-forget broadcast of replicated state to every observer.
pub trait ReplicationTransport {
    /// Hand the payload to the transport. Delivery is best effort.
    fn broadcast(&self, payload: &ReplicationPayload) -> Result<()>;
}

/// Directed delivery of a command to whichever participant holds the writer
/// role. The transport attaches the caller identity on the receiving side.
pub trait CommandTransport {
    fn send_to_writer(&self, command: BoardCommand) -> Result<()>;
}

/// Identity of the local participant and display names of others.
pub trait IdentitySource {
    /// The local participant, if one is resolved yet.
    fn local_participant(&self) -> Option<ParticipantId>;

    /// Human-readable name for `participant`.
    fn display_name(&self, _participant: ParticipantId) -> Option<String> {
        None
    }
}

/// Monotonic millisecond clock.
pub trait PhysicalClock {
    fn now_ms(&self) -> u64;
}

/// Everything a [`crate::Board`] needs from its environment.
pub trait BoardEffects:
    RoleOracle + ReplicationTransport + CommandTransport + IdentitySource + PhysicalClock
{
}

/// Automatic implementation for types that satisfy the required bounds
impl<T> BoardEffects for T where
    T: RoleOracle + ReplicationTransport + CommandTransport + IdentitySource + PhysicalClock
{
}

/// Wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicalClock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
