//! Writer-side command handlers.
//!
//! [`Writer`] is the capability to mutate the replicated state. The board only
//! hands one out while its role oracle reports the writer role, so holding a
//! `Writer` is the proof of authority. Every handler is idempotent or a no-op
//! under duplicate delivery; refusals come back as
//! [`CommandOutcome::Ignored`] rather than errors.

use crate::codec::{ParticipantId, Slot};
use crate::errors::Rejection;
use crate::replicator::Replicator;
use crate::state::ReplicatedState;
use serde::{Deserialize, Serialize};

/// Commands an observer sends to the writer.
///
/// Join and leave carry no identifier; they act on the caller identity the
/// command transport reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoardCommand {
    /// Append the caller to the queue.
    Join,
    /// Replace the caller's entry with a left marker.
    Leave,
    /// Flip the done flag of the slot at `index` (0-based).
    Toggle {
        /// Absolute slot index
        index: usize,
    },
}

/// What a handler did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The state changed and a broadcast is scheduled.
    Applied,
    /// Nothing changed.
    Ignored(Rejection),
}

impl CommandOutcome {
    /// True when the state changed.
    pub fn is_applied(&self) -> bool {
        matches!(self, CommandOutcome::Applied)
    }

    /// The refusal reason, if nothing changed.
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            CommandOutcome::Applied => None,
            CommandOutcome::Ignored(reason) => Some(*reason),
        }
    }
}

impl From<Result<(), Rejection>> for CommandOutcome {
    fn from(result: Result<(), Rejection>) -> Self {
        match result {
            Ok(()) => CommandOutcome::Applied,
            Err(reason) => CommandOutcome::Ignored(reason),
        }
    }
}

/// Mutation capability over the authoritative state.
pub struct Writer<'a> {
    state: &'a mut ReplicatedState,
    replicator: &'a mut Replicator,
    now_ms: u64,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(
        state: &'a mut ReplicatedState,
        replicator: &'a mut Replicator,
        now_ms: u64,
    ) -> Self {
        Self {
            state,
            replicator,
            now_ms,
        }
    }

    /// Authoritative state as it stands.
    pub fn state(&self) -> &ReplicatedState {
        self.state
    }

    /// Dispatch a command on behalf of `caller`.
    pub fn apply(&mut self, caller: ParticipantId, command: BoardCommand) -> CommandOutcome {
        match command {
            BoardCommand::Join => self.join(caller),
            BoardCommand::Leave => self.leave(caller),
            BoardCommand::Toggle { index } => self.toggle(index),
        }
    }

    /// Append `participant` at the first row after the last used one.
    pub fn join(&mut self, participant: ParticipantId) -> CommandOutcome {
        let outcome = self.try_join(participant).into();
        self.trace("join", participant, outcome);
        outcome
    }

    /// Replace the entry of `participant` with a left marker in place.
    pub fn leave(&mut self, participant: ParticipantId) -> CommandOutcome {
        let outcome = self.mark_left(participant).into();
        self.trace("leave", participant, outcome);
        outcome
    }

    /// Flip the done flag at `index`. Left markers stay toggleable.
    pub fn toggle(&mut self, index: usize) -> CommandOutcome {
        let outcome: CommandOutcome = self.try_toggle(index).into();
        match outcome {
            CommandOutcome::Applied => tracing::debug!(index, "Toggled slot"),
            CommandOutcome::Ignored(reason) => {
                tracing::debug!(index, %reason, "Toggle ignored");
            }
        }
        outcome
    }

    /// React to the environment reporting that `participant` disconnected.
    ///
    /// Same effect as [`Writer::leave`], but driven by a departure notice
    /// rather than a request, so there is no caller to answer.
    pub fn participant_departed(&mut self, participant: ParticipantId) -> CommandOutcome {
        let outcome = self.mark_left(participant).into();
        self.trace("departed", participant, outcome);
        outcome
    }

    fn try_join(&mut self, participant: ParticipantId) -> Result<(), Rejection> {
        if !participant.is_representable() {
            return Err(Rejection::Unrepresentable);
        }
        if self.state.find_by_participant(participant).is_some() {
            return Err(Rejection::AlreadyPresent);
        }
        let row = self.state.append_row()?;
        self.state.set_slot(row, Slot::occupied(participant, false));
        self.replicator.mark_dirty(self.now_ms);
        Ok(())
    }

    fn mark_left(&mut self, participant: ParticipantId) -> Result<(), Rejection> {
        let index = self
            .state
            .find_by_participant(participant)
            .ok_or(Rejection::UnknownParticipant)?;
        let departed = self.state.slots()[index].departed();
        self.state.set_slot(index, departed);
        self.replicator.mark_dirty(self.now_ms);
        Ok(())
    }

    fn try_toggle(&mut self, index: usize) -> Result<(), Rejection> {
        let slot = self.state.slot(index).ok_or(Rejection::OutOfBounds)?;
        if slot.is_empty() {
            return Err(Rejection::EmptySlot);
        }
        self.state.set_slot(index, slot.toggled());
        self.replicator.mark_dirty(self.now_ms);
        Ok(())
    }

    fn trace(&self, action: &'static str, participant: ParticipantId, outcome: CommandOutcome) {
        match outcome {
            CommandOutcome::Applied => tracing::debug!(
                action,
                %participant,
                last = ?self.state.last_occupied_index(),
                "Applied queue mutation"
            ),
            CommandOutcome::Ignored(reason) => {
                tracing::debug!(action, %participant, %reason, "Queue mutation ignored");
            }
        }
    }
}
