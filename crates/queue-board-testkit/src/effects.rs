//! Board effects backed by the in-memory network and manual clock.

use crate::time::ManualClock;
use crate::transport::MemoryNetwork;
use queue_board_core::wire::{self, CommandEnvelope, WireMessage};
use queue_board_core::{
    BoardCommand, CommandTransport, IdentitySource, ParticipantId, PhysicalClock,
    ReplicationPayload, ReplicationTransport, Result, RoleOracle,
};

/// Effects for one participant of a [`crate::Cluster`].
#[derive(Clone)]
pub struct NodeEffects {
    id: ParticipantId,
    network: MemoryNetwork,
    clock: ManualClock,
}

impl NodeEffects {
    pub fn new(id: ParticipantId, network: MemoryNetwork, clock: ManualClock) -> Self {
        Self { id, network, clock }
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    pub fn network(&self) -> &MemoryNetwork {
        &self.network
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }
}

impl RoleOracle for NodeEffects {
    fn is_writer(&self) -> bool {
        self.network.writer() == Some(self.id)
    }
}

impl ReplicationTransport for NodeEffects {
    fn broadcast(&self, payload: &ReplicationPayload) -> Result<()> {
        let bytes = wire::encode_message(&WireMessage::state(payload.clone()))?;
        self.network.broadcast(self.id, &bytes)
    }
}

impl CommandTransport for NodeEffects {
    fn send_to_writer(&self, command: BoardCommand) -> Result<()> {
        let envelope = CommandEnvelope::new(self.id, command);
        let bytes = wire::encode_message(&WireMessage::command(envelope))?;
        self.network.send_to_writer(self.id, &bytes)
    }
}

impl IdentitySource for NodeEffects {
    fn local_participant(&self) -> Option<ParticipantId> {
        Some(self.id)
    }

    fn display_name(&self, participant: ParticipantId) -> Option<String> {
        self.network.display_name(participant)
    }
}

impl PhysicalClock for NodeEffects {
    fn now_ms(&self) -> u64 {
        self.clock.now()
    }
}
