//! Seeded workload over a testkit cluster.

use crate::config::SimConfig;
use anyhow::{Context, Result};
use queue_board_core::state::is_prefix_contiguous;
use queue_board_core::{BoardSnapshot, ParticipantId, RequestOutcome, Revision};
use queue_board_testkit::{Cluster, FaultPlan};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::fmt;

/// Counters for what the workload asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RequestTally {
    pub sent: u64,
    pub executed: u64,
    pub refused: u64,
}

impl RequestTally {
    fn record(&mut self, outcome: RequestOutcome) {
        match outcome {
            RequestOutcome::Sent => self.sent += 1,
            RequestOutcome::Executed(_) => self.executed += 1,
            RequestOutcome::Refused(_) => self.refused += 1,
        }
    }
}

/// Outcome of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub seed: u64,
    pub steps: u32,
    pub elapsed_ms: u64,
    pub participants: usize,
    pub writer: Option<ParticipantId>,
    pub revision: Option<Revision>,
    pub queue_length: usize,
    pub requests: RequestTally,
    pub handoffs: u32,
    pub departures: u32,
    pub broadcasts: u64,
    pub commands: u64,
    pub dropped: u64,
    pub duplicated: u64,
    pub prefix_ok: bool,
    pub converged: bool,
    pub diverged: Vec<ParticipantId>,
    /// First page as the writer renders it
    pub snapshot: Option<BoardSnapshot>,
}

impl SimReport {
    /// Whether every invariant held.
    pub fn passed(&self) -> bool {
        self.prefix_ok && self.converged
    }
}

impl fmt::Display for SimReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let writer = self
            .writer
            .map_or_else(|| "none".to_string(), |writer| writer.to_string());
        let revision = self
            .revision
            .map_or_else(|| "-".to_string(), |revision| revision.to_string());
        writeln!(
            f,
            "seed {} | {} steps | {} ms simulated",
            self.seed, self.steps, self.elapsed_ms
        )?;
        writeln!(
            f,
            "writer {writer} at {revision} | {} participants | {} queued",
            self.participants, self.queue_length
        )?;
        writeln!(
            f,
            "requests: {} sent, {} executed, {} refused | {} handoffs, {} departures",
            self.requests.sent,
            self.requests.executed,
            self.requests.refused,
            self.handoffs,
            self.departures
        )?;
        writeln!(
            f,
            "network: {} broadcasts, {} commands, {} dropped, {} duplicated",
            self.broadcasts, self.commands, self.dropped, self.duplicated
        )?;
        if let Some(snapshot) = &self.snapshot {
            for row in snapshot.rows.iter().filter(|row| row.has_data) {
                let mark = if row.done { "x" } else { " " };
                writeln!(f, "  {:>3}. [{mark}] {}", row.rank, row.label)?;
            }
        }
        let verdict = if self.passed() { "PASS" } else { "FAIL" };
        write!(
            f,
            "{verdict}: prefix {} | converged {}",
            self.prefix_ok, self.converged
        )?;
        if !self.diverged.is_empty() {
            write!(f, " (diverged: {:?})", self.diverged)?;
        }
        Ok(())
    }
}

/// A running simulation.
pub struct Simulation {
    config: SimConfig,
    cluster: Cluster,
    rng: ChaCha8Rng,
    next_id: u32,
    step: u32,
    requests: RequestTally,
    handoffs: u32,
    departures: u32,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let mut cluster = Cluster::new(config.board.clone(), config.participants, config.seed)
            .context("Failed to build cluster")?;
        cluster.set_tick_ms(config.tick_ms);
        cluster.network().set_faults(FaultPlan::chaotic(config.drop_rate));
        for raw in 1..=config.participants {
            let participant = ParticipantId::new(raw);
            cluster
                .network()
                .set_display_name(participant, format!("player-{raw:03}"));
        }
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            next_id: config.participants + 1,
            step: 0,
            requests: RequestTally::default(),
            handoffs: 0,
            departures: 0,
            cluster,
            config,
        })
    }

    /// Whether all workload steps ran.
    pub fn is_done(&self) -> bool {
        self.step >= self.config.steps
    }

    /// One workload step: a random user action, maybe a handoff or a
    /// departure, then one tick period.
    pub fn step(&mut self) -> Result<()> {
        self.step += 1;
        self.random_action()?;

        if self.config.handoff_every > 0 && self.step % self.config.handoff_every == 0 {
            self.random_handoff();
        }
        if self.rng.gen::<f64>() < self.config.departure_rate {
            self.random_departure()?;
        }

        self.cluster.step();
        Ok(())
    }

    /// Stop injecting faults, drain, refresh stragglers and check invariants.
    pub fn finish(mut self) -> SimReport {
        self.cluster.network().set_faults(FaultPlan::reliable());
        let settle_ms = self.config.settle_ms;
        self.cluster.settle(settle_ms);
        self.cluster.resync();
        self.cluster.settle(settle_ms);
        self.cluster.resync();

        let prefix_ok = self.prefix_holds();
        let diverged: Vec<ParticipantId> = self
            .cluster
            .divergence()
            .into_iter()
            .map(|divergence| divergence.participant)
            .collect();
        let converged = self.cluster.is_converged();
        let stats = self.cluster.network().stats();
        let state = self.cluster.writer_state();

        tracing::info!(
            steps = self.step,
            converged,
            prefix_ok,
            "Simulation finished"
        );

        SimReport {
            seed: self.config.seed,
            steps: self.step,
            elapsed_ms: self.cluster.clock().now(),
            participants: self.cluster.participants().len(),
            writer: self.cluster.writer_id(),
            revision: state.map(|state| state.revision()),
            queue_length: state
                .and_then(|state| state.last_occupied_index())
                .map_or(0, |last| last + 1),
            requests: self.requests,
            handoffs: self.handoffs,
            departures: self.departures,
            broadcasts: stats.broadcasts,
            commands: stats.commands,
            dropped: stats.dropped,
            duplicated: stats.duplicated,
            prefix_ok,
            converged,
            diverged,
            snapshot: self.cluster.writer_board().map(|board| board.snapshot()),
        }
    }

    fn prefix_holds(&self) -> bool {
        let writer_ok = self
            .cluster
            .writer_state()
            .map_or(true, |state| is_prefix_contiguous(state.slots()));
        writer_ok
            && self.cluster.participants().into_iter().all(|participant| {
                self.cluster
                    .board(participant)
                    .map_or(true, |board| is_prefix_contiguous(board.view().slots()))
            })
    }

    fn pick(&mut self) -> Option<ParticipantId> {
        self.cluster.participants().choose(&mut self.rng).copied()
    }

    fn random_action(&mut self) -> Result<()> {
        let Some(participant) = self.pick() else {
            return Ok(());
        };
        let roll = self.rng.gen_range(0..100u32);
        let row = self.rng.gen_range(0..self.config.board.page_size);
        let Some(board) = self.cluster.board_mut(participant) else {
            return Ok(());
        };
        let outcome = match roll {
            0..=39 => board.request_join()?,
            40..=54 => board.request_leave()?,
            55..=89 => board.request_toggle(row)?,
            90..=94 => {
                board.page_next();
                return Ok(());
            }
            _ => {
                board.page_prev();
                return Ok(());
            }
        };
        tracing::trace!(%participant, ?outcome, "Workload action");
        self.requests.record(outcome);
        Ok(())
    }

    fn random_handoff(&mut self) {
        let current = self.cluster.writer_id();
        let candidates: Vec<ParticipantId> = self
            .cluster
            .participants()
            .into_iter()
            .filter(|participant| Some(*participant) != current)
            .collect();
        if let Some(next) = candidates.choose(&mut self.rng).copied() {
            if self.cluster.handoff(next) {
                self.handoffs += 1;
                tracing::debug!(step = self.step, writer = %next, "Handed off writer role");
            }
        }
    }

    fn random_departure(&mut self) -> Result<()> {
        let replacement = ParticipantId::new(self.next_id);
        if !replacement.is_representable() || self.cluster.participants().len() < 2 {
            return Ok(());
        }
        let Some(leaving) = self.pick() else {
            return Ok(());
        };
        let outcome = self.cluster.depart(leaving);
        self.departures += 1;
        tracing::debug!(step = self.step, participant = %leaving, ?outcome, "Participant departed");

        self.next_id += 1;
        self.cluster
            .network()
            .set_display_name(replacement, format!("player-{:03}", replacement.get()));
        self.cluster.add_participant(replacement)?;
        Ok(())
    }
}
