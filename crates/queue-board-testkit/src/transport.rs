//! In-memory lossy network.
//!
//! [`MemoryNetwork`] carries encoded wire messages between participants of a
//! [`crate::Cluster`]. It also plays the environment's part in deciding who
//! holds the writer role. Faults are injected from a seeded RNG so a run is
//! reproducible.

use parking_lot::Mutex;
use queue_board_core::{BoardError, ParticipantId, Result};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

/// An encoded message waiting in a participant's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Sender as observed by the transport
    pub from: ParticipantId,
    /// Encoded `WireMessage`
    pub bytes: Vec<u8>,
}

/// Fault injection settings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FaultPlan {
    /// Probability in `[0, 1]` that a message is lost
    pub drop_rate: f64,
    /// Probability in `[0, 1]` that a delivered message arrives twice
    pub duplicate_rate: f64,
    /// Shuffle each inbox when it is drained
    pub reorder: bool,
}

impl FaultPlan {
    /// No faults.
    pub fn reliable() -> Self {
        Self::default()
    }

    /// Drops, duplicates and reordering all at once.
    pub fn chaotic(drop_rate: f64) -> Self {
        Self {
            drop_rate,
            duplicate_rate: drop_rate / 2.0,
            reorder: true,
        }
    }
}

/// Traffic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub broadcasts: u64,
    pub commands: u64,
    pub enqueued: u64,
    pub dropped: u64,
    pub duplicated: u64,
}

struct NetworkState {
    writer: Option<ParticipantId>,
    inboxes: BTreeMap<ParticipantId, VecDeque<Envelope>>,
    names: BTreeMap<ParticipantId, String>,
    severed: BTreeSet<ParticipantId>,
    faults: FaultPlan,
    rng: ChaCha8Rng,
    stats: NetworkStats,
}

impl NetworkState {
    fn enqueue(&mut self, from: ParticipantId, to: ParticipantId, bytes: &[u8]) {
        if self.severed.contains(&from) || self.severed.contains(&to) {
            self.stats.dropped += 1;
            return;
        }
        if self.rng.gen::<f64>() < self.faults.drop_rate {
            self.stats.dropped += 1;
            tracing::trace!(%from, %to, "Dropped message");
            return;
        }
        let copies = if self.rng.gen::<f64>() < self.faults.duplicate_rate {
            self.stats.duplicated += 1;
            2
        } else {
            1
        };
        let Some(inbox) = self.inboxes.get_mut(&to) else {
            self.stats.dropped += 1;
            return;
        };
        for _ in 0..copies {
            inbox.push_back(Envelope {
                from,
                bytes: bytes.to_vec(),
            });
            self.stats.enqueued += 1;
        }
    }
}

/// Shared in-memory network. Clones refer to the same network.
#[derive(Clone)]
pub struct MemoryNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MemoryNetwork {
    /// Create an empty, reliable network with a seeded fault RNG.
    pub fn new(seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(NetworkState {
                writer: None,
                inboxes: BTreeMap::new(),
                names: BTreeMap::new(),
                severed: BTreeSet::new(),
                faults: FaultPlan::reliable(),
                rng: ChaCha8Rng::seed_from_u64(seed),
                stats: NetworkStats::default(),
            })),
        }
    }

    /// Register a participant so it can receive messages.
    pub fn connect(&self, participant: ParticipantId) {
        self.state.lock().inboxes.entry(participant).or_default();
    }

    /// Remove a participant and everything queued for it. Clears the writer
    /// role if it held it.
    pub fn disconnect(&self, participant: ParticipantId) -> bool {
        let mut state = self.state.lock();
        if state.writer == Some(participant) {
            state.writer = None;
        }
        state.severed.remove(&participant);
        state.inboxes.remove(&participant).is_some()
    }

    /// Connected participants in id order.
    pub fn participants(&self) -> Vec<ParticipantId> {
        self.state.lock().inboxes.keys().copied().collect()
    }

    pub fn is_connected(&self, participant: ParticipantId) -> bool {
        self.state.lock().inboxes.contains_key(&participant)
    }

    /// Assign the writer role.
    pub fn set_writer(&self, writer: Option<ParticipantId>) {
        self.state.lock().writer = writer;
    }

    pub fn writer(&self) -> Option<ParticipantId> {
        self.state.lock().writer
    }

    pub fn set_display_name(&self, participant: ParticipantId, name: impl Into<String>) {
        self.state.lock().names.insert(participant, name.into());
    }

    pub fn display_name(&self, participant: ParticipantId) -> Option<String> {
        self.state.lock().names.get(&participant).cloned()
    }

    pub fn set_faults(&self, faults: FaultPlan) {
        self.state.lock().faults = faults;
    }

    pub fn faults(&self) -> FaultPlan {
        self.state.lock().faults
    }

    /// Drop all traffic to and from `participant` until healed.
    pub fn sever(&self, participant: ParticipantId) {
        self.state.lock().severed.insert(participant);
    }

    pub fn heal(&self, participant: ParticipantId) {
        self.state.lock().severed.remove(&participant);
    }

    /// Queue `bytes` for every connected participant except the sender.
    pub fn broadcast(&self, from: ParticipantId, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        if !state.inboxes.contains_key(&from) {
            return Err(BoardError::transport(format!(
                "{from} is not connected to the network"
            )));
        }
        state.stats.broadcasts += 1;
        let peers: Vec<ParticipantId> = state
            .inboxes
            .keys()
            .copied()
            .filter(|peer| *peer != from)
            .collect();
        for peer in peers {
            state.enqueue(from, peer, bytes);
        }
        Ok(())
    }

    /// Queue `bytes` for the current writer.
    pub fn send_to_writer(&self, from: ParticipantId, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        let Some(writer) = state.writer else {
            return Err(BoardError::transport("no participant holds the writer role"));
        };
        state.stats.commands += 1;
        state.enqueue(from, writer, bytes);
        Ok(())
    }

    /// Take everything queued for `participant`, shuffled if reordering is on.
    pub fn drain(&self, participant: ParticipantId) -> Vec<Envelope> {
        let mut state = self.state.lock();
        let mut envelopes: Vec<Envelope> = match state.inboxes.get_mut(&participant) {
            Some(inbox) => inbox.drain(..).collect(),
            None => return Vec::new(),
        };
        if state.faults.reorder {
            envelopes.shuffle(&mut state.rng);
        }
        envelopes
    }

    /// Messages queued across all inboxes.
    pub fn in_flight(&self) -> usize {
        self.state.lock().inboxes.values().map(VecDeque::len).sum()
    }

    pub fn stats(&self) -> NetworkStats {
        self.state.lock().stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(raw: u32) -> ParticipantId {
        ParticipantId::new(raw)
    }

    fn network(ids: &[u32]) -> MemoryNetwork {
        let network = MemoryNetwork::new(7);
        for id in ids {
            network.connect(p(*id));
        }
        network
    }

    #[test]
    fn broadcast_skips_sender() {
        let network = network(&[1, 2, 3]);
        network.broadcast(p(1), b"x").unwrap();

        assert!(network.drain(p(1)).is_empty());
        assert_eq!(network.drain(p(2)).len(), 1);
        assert_eq!(network.drain(p(3))[0].from, p(1));
        assert_eq!(network.in_flight(), 0);
    }

    #[test]
    fn commands_need_a_writer() {
        let network = network(&[1, 2]);
        assert!(network.send_to_writer(p(2), b"join").is_err());

        network.set_writer(Some(p(1)));
        network.send_to_writer(p(2), b"join").unwrap();
        assert_eq!(network.drain(p(1)).len(), 1);
    }

    #[test]
    fn severed_participant_loses_traffic() {
        let network = network(&[1, 2]);
        network.set_writer(Some(p(1)));
        network.sever(p(2));

        network.send_to_writer(p(2), b"leave").unwrap();
        assert_eq!(network.in_flight(), 0);
        assert_eq!(network.stats().dropped, 1);

        network.heal(p(2));
        network.send_to_writer(p(2), b"leave").unwrap();
        assert_eq!(network.in_flight(), 1);
    }

    #[test]
    fn full_drop_rate_loses_everything() {
        let network = network(&[1, 2, 3]);
        network.set_faults(FaultPlan {
            drop_rate: 1.0,
            ..FaultPlan::reliable()
        });
        network.broadcast(p(1), b"x").unwrap();
        assert_eq!(network.in_flight(), 0);
        assert_eq!(network.stats().dropped, 2);
    }

    #[test]
    fn disconnect_clears_writer_role() {
        let network = network(&[1, 2]);
        network.set_writer(Some(p(1)));
        assert!(network.disconnect(p(1)));
        assert_eq!(network.writer(), None);
        assert_eq!(network.participants(), vec![p(2)]);
    }
}
