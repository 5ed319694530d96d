//! Multi-participant harness.
//!
//! A [`Cluster`] owns one [`Board`] per participant, all sharing a
//! [`MemoryNetwork`] and a [`ManualClock`]. Time only moves through
//! [`Cluster::step`] and friends, so every run is deterministic for a given
//! seed.

use crate::effects::NodeEffects;
use crate::time::ManualClock;
use crate::transport::MemoryNetwork;
use queue_board_core::{
    Board, BoardConfig, CommandOutcome, ParticipantId, ReplicatedState, ReplicationPayload,
    Result, Revision,
};
use std::collections::BTreeMap;

/// Default scheduling period of every board.
pub const DEFAULT_TICK_MS: u64 = 50;

/// An observer whose view differs from the writer's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    pub participant: ParticipantId,
    pub view_revision: Revision,
    pub writer_revision: Revision,
    /// Whether the slots match despite the revision gap
    pub slots_match: bool,
}

/// A set of boards wired to one in-memory network.
pub struct Cluster {
    config: BoardConfig,
    clock: ManualClock,
    network: MemoryNetwork,
    boards: BTreeMap<ParticipantId, Board<NodeEffects>>,
    tick_ms: u64,
}

impl Cluster {
    /// Participants `#1..=#n`; `#1` starts as the writer.
    pub fn new(config: BoardConfig, participants: u32, seed: u64) -> Result<Self> {
        let ids: Vec<ParticipantId> = (1..=participants).map(ParticipantId::new).collect();
        Self::with_participants(config, &ids, seed)
    }

    /// The given participants; the first starts as the writer.
    pub fn with_participants(
        config: BoardConfig,
        participants: &[ParticipantId],
        seed: u64,
    ) -> Result<Self> {
        config.validate()?;
        let mut cluster = Self {
            config,
            clock: ManualClock::new(0),
            network: MemoryNetwork::new(seed),
            boards: BTreeMap::new(),
            tick_ms: DEFAULT_TICK_MS,
        };
        for participant in participants {
            cluster.add_participant(*participant)?;
        }
        if let Some(first) = participants.first() {
            cluster.handoff(*first);
        }
        Ok(cluster)
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    pub fn network(&self) -> &MemoryNetwork {
        &self.network
    }

    pub fn tick_ms(&self) -> u64 {
        self.tick_ms
    }

    pub fn set_tick_ms(&mut self, tick_ms: u64) {
        self.tick_ms = tick_ms.max(1);
    }

    /// Participants in id order.
    pub fn participants(&self) -> Vec<ParticipantId> {
        self.boards.keys().copied().collect()
    }

    pub fn writer_id(&self) -> Option<ParticipantId> {
        self.network.writer()
    }

    pub fn board(&self, participant: ParticipantId) -> Option<&Board<NodeEffects>> {
        self.boards.get(&participant)
    }

    pub fn board_mut(&mut self, participant: ParticipantId) -> Option<&mut Board<NodeEffects>> {
        self.boards.get_mut(&participant)
    }

    pub fn writer_board(&self) -> Option<&Board<NodeEffects>> {
        self.writer_id().and_then(|writer| self.boards.get(&writer))
    }

    pub fn writer_board_mut(&mut self) -> Option<&mut Board<NodeEffects>> {
        let writer = self.writer_id()?;
        self.boards.get_mut(&writer)
    }

    /// Authoritative state held by the writer.
    pub fn writer_state(&self) -> Option<&ReplicatedState> {
        self.writer_board().and_then(Board::authority)
    }

    /// Connect a new participant. A late joiner receives the writer's
    /// current state through its mailbox, the way a transport syncs
    /// newcomers.
    pub fn add_participant(&mut self, participant: ParticipantId) -> Result<()> {
        self.network.connect(participant);
        let effects = NodeEffects::new(participant, self.network.clone(), self.clock.clone());
        let mut board = Board::new(self.config.clone(), effects)?;
        board.start();
        if let Some(state) = self.writer_state() {
            board.mailbox().offer(state.to_payload());
        }
        self.boards.insert(participant, board);
        tracing::debug!(%participant, "Participant connected");
        Ok(())
    }

    /// Hand every queued message to its recipient. Returns the number
    /// delivered.
    pub fn deliver_all(&mut self) -> usize {
        let mut delivered = 0;
        for participant in self.participants() {
            let inbox = self.network.drain(participant);
            let Some(board) = self.boards.get_mut(&participant) else {
                continue;
            };
            for envelope in inbox {
                match board.on_wire(Some(envelope.from), &envelope.bytes) {
                    Ok(_) => delivered += 1,
                    Err(error) => {
                        tracing::warn!(%participant, %error, "Undeliverable message");
                    }
                }
            }
        }
        delivered
    }

    /// Tick every board once. Returns the number of broadcasts made.
    pub fn tick_all(&mut self) -> usize {
        self.boards
            .values_mut()
            .filter_map(|board| board.tick())
            .count()
    }

    /// Advance one tick period, delivering before and after the ticks.
    pub fn step(&mut self) {
        self.clock.advance_ms(self.tick_ms);
        self.deliver_all();
        self.tick_all();
        self.deliver_all();
    }

    /// Step until at least `duration_ms` has elapsed.
    pub fn run_for(&mut self, duration_ms: u64) {
        let until = self.clock.now().saturating_add(duration_ms);
        while self.clock.now() < until {
            self.step();
        }
    }

    /// Nothing in flight and no batch queued at the writer.
    pub fn is_quiet(&self) -> bool {
        self.network.in_flight() == 0
            && self
                .writer_board()
                .map_or(true, |writer| !writer.has_unsent_changes())
    }

    /// Step until quiet or `max_ms` elapses. Returns whether it went quiet.
    pub fn settle(&mut self, max_ms: u64) -> bool {
        let until = self.clock.now().saturating_add(max_ms);
        while !self.is_quiet() {
            if self.clock.now() >= until {
                return false;
            }
            self.step();
        }
        true
    }

    /// Redeliver the latest state the way a transport refreshes late or lossy
    /// receivers, then tick once.
    ///
    /// The writer first sees the highest revision any view holds, in case a
    /// demoted writer's last broadcast never reached it. Every observer's
    /// mailbox is then offered the writer's state. Returns the number of
    /// observers offered the state.
    pub fn resync(&mut self) -> usize {
        let Some(writer) = self.writer_id() else {
            return 0;
        };
        let writer_revision = self
            .writer_state()
            .map_or(Revision::INITIAL, ReplicatedState::revision);
        let newest_view = self
            .boards
            .values()
            .map(Board::view)
            .max_by_key(|view| view.revision())
            .filter(|view| view.revision() > writer_revision)
            .map(|view| ReplicationPayload::from_slots(view.slots(), view.revision()));
        if let (Some(payload), Some(board)) = (newest_view, self.boards.get_mut(&writer)) {
            board.on_receive(payload);
        }

        let Some(payload) = self.writer_state().map(ReplicatedState::to_payload) else {
            return 0;
        };
        let mut offered = 0;
        for (participant, board) in &self.boards {
            if *participant != writer {
                board.mailbox().offer(payload.clone());
                offered += 1;
            }
        }
        self.tick_all();
        offered
    }

    /// Move the writer role to `participant`. Returns false if unknown.
    pub fn handoff(&mut self, participant: ParticipantId) -> bool {
        if !self.boards.contains_key(&participant) {
            return false;
        }
        self.network.set_writer(Some(participant));
        if let Some(board) = self.boards.get_mut(&participant) {
            board.on_role_granted();
        }
        tracing::debug!(%participant, "Writer role handed off");
        true
    }

    /// Disconnect `participant` and notify the writer. A departing writer
    /// hands the role to the lowest remaining id first. Returns the writer's
    /// outcome, or `None` if the participant was unknown or nobody is left.
    pub fn depart(&mut self, participant: ParticipantId) -> Option<CommandOutcome> {
        self.boards.remove(&participant)?;
        let was_writer = self.writer_id() == Some(participant);
        self.network.disconnect(participant);
        if was_writer {
            let successor = self.boards.keys().next().copied()?;
            self.handoff(successor);
        }
        let writer = self.writer_board_mut()?;
        Some(writer.on_participant_departed(participant))
    }

    /// Observers whose view differs from the writer's state.
    pub fn divergence(&self) -> Vec<Divergence> {
        let Some(state) = self.writer_state() else {
            return Vec::new();
        };
        self.boards
            .iter()
            .filter_map(|(participant, board)| {
                let view = board.view();
                let slots_match = view.slots() == state.slots();
                if slots_match && view.revision() == state.revision() {
                    return None;
                }
                Some(Divergence {
                    participant: *participant,
                    view_revision: view.revision(),
                    writer_revision: state.revision(),
                    slots_match,
                })
            })
            .collect()
    }

    /// Every view equals the writer's state.
    pub fn is_converged(&self) -> bool {
        self.writer_state().is_some() && self.divergence().is_empty()
    }
}
