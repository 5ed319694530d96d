//! One participant's board.
//!
//! [`Board`] ties the components together under the cooperative model: the
//! environment calls [`Board::tick`] at a fixed rate and the `on_*` methods as
//! events arrive. None of these overlap within a process, so no locking is
//! needed here. Cross-participant consistency rests on two rules: only the
//! writer mutates and bumps the revision, and every view refuses to move to an
//! older revision.

use crate::codec::ParticipantId;
use crate::config::BoardConfig;
use crate::effects::BoardEffects;
use crate::errors::{Rejection, Result};
use crate::handlers::{BoardCommand, CommandOutcome, Writer};
use crate::pager::Pager;
use crate::pending::PendingAction;
use crate::presentation::{BoardSnapshot, Projection};
use crate::replicator::Replicator;
use crate::state::{ReplicatedState, Revision};
use crate::view::{Acceptance, ReplicaMailbox, ViewBuffer};
use crate::wire::{self, ReplicationPayload, WirePayload};

/// Result of a local join/leave/toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Handed to the command transport for the writer.
    Sent,
    /// Executed in place because this participant is the writer.
    Executed(CommandOutcome),
    /// Refused locally before anything was sent.
    Refused(Rejection),
}

/// What an inbound wire message did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A state broadcast was offered to the view.
    State(Acceptance),
    /// A command was run through the writer-side handlers.
    Command(CommandOutcome),
}

/// A participant's replicated queue board.
pub struct Board<E: BoardEffects> {
    config: BoardConfig,
    effects: E,
    authority: ReplicatedState,
    replicator: Replicator,
    view: ViewBuffer,
    pending: PendingAction,
    pager: Pager,
    mailbox: ReplicaMailbox,
}

impl<E: BoardEffects> Board<E> {
    /// Create a board. The configuration is validated first.
    pub fn new(config: BoardConfig, effects: E) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            authority: ReplicatedState::with_capacity(config.capacity),
            replicator: Replicator::new(config.debounce()),
            view: ViewBuffer::new(config.capacity),
            pending: PendingAction::idle(),
            pager: Pager::new(config.page_size),
            mailbox: ReplicaMailbox::new(),
            config,
            effects,
        })
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn effects(&self) -> &E {
        &self.effects
    }

    /// The view this participant renders from.
    pub fn view(&self) -> &ViewBuffer {
        &self.view
    }

    pub fn pending(&self) -> &PendingAction {
        &self.pending
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    /// Handle to the latest-known mailbox, for transports that deliver off the
    /// event path.
    pub fn mailbox(&self) -> ReplicaMailbox {
        self.mailbox.clone()
    }

    pub fn is_writer(&self) -> bool {
        self.effects.is_writer()
    }

    /// Authoritative state, only while holding the writer role.
    pub fn authority(&self) -> Option<&ReplicatedState> {
        self.is_writer().then_some(&self.authority)
    }

    /// Whether a broadcast is queued.
    pub fn has_unsent_changes(&self) -> bool {
        self.is_writer() && self.replicator.is_dirty()
    }

    /// Run `mutate` against the writer capability, only while holding the
    /// writer role.
    ///
    /// Applied changes are mirrored into this participant's view before
    /// returning; the broadcast still waits for the debounce window.
    pub fn with_writer<R, F>(&mut self, mutate: F) -> Option<R>
    where
        F: FnOnce(&mut Writer<'_>) -> R,
    {
        let mut writer = self.writer()?;
        let result = mutate(&mut writer);
        if self.replicator.is_dirty() {
            self.echo_authority();
        }
        Some(result)
    }

    fn writer(&mut self) -> Option<Writer<'_>> {
        if !self.effects.is_writer() {
            return None;
        }
        let now_ms = self.effects.now_ms();
        Some(Writer::new(&mut self.authority, &mut self.replicator, now_ms))
    }

    /// Initial render. Nothing is broadcast.
    pub fn start(&mut self) {
        if self.is_writer() {
            self.echo_authority();
        }
        self.settle();
    }

    /// Periodic scheduling callback.
    ///
    /// Reconciles from the mailbox, releases a timed-out pending action and,
    /// on the writer, flushes a due batch. Returns the revision broadcast, if
    /// any.
    pub fn tick(&mut self) -> Option<Revision> {
        let now_ms = self.effects.now_ms();

        if let Some(payload) = self.mailbox.take() {
            self.on_receive(payload);
        }

        if self.pending.expire(now_ms, self.config.pending_timeout()) {
            tracing::debug!(now_ms, "Released pending action after timeout");
        }

        if !self.is_writer() {
            return None;
        }
        if self.replicator.is_dirty() {
            self.echo_authority();
        }
        let payload = self.replicator.poll_flush(now_ms, &mut self.authority)?;
        if let Err(error) = self.effects.broadcast(&payload) {
            tracing::warn!(
                revision = %payload.revision,
                %error,
                "Broadcast failed; observers will catch up on a later revision"
            );
        }
        self.apply_to_view(&payload);
        Some(payload.revision)
    }

    /// Push delivery of a broadcast.
    pub fn on_receive(&mut self, payload: ReplicationPayload) -> Acceptance {
        if self.is_writer() {
            return self.receive_as_writer(payload);
        }
        self.apply_to_view(&payload)
    }

    /// Decode and dispatch a raw wire message.
    pub fn on_wire(&mut self, caller: Option<ParticipantId>, bytes: &[u8]) -> Result<Delivery> {
        let message = wire::decode_message(bytes)?;
        Ok(match message.payload {
            WirePayload::State(payload) => Delivery::State(self.on_receive(payload)),
            WirePayload::Command(envelope) => {
                if caller.is_some_and(|caller| caller != envelope.caller) {
                    tracing::warn!(
                        claimed = %envelope.caller,
                        "Command caller does not match transport identity"
                    );
                }
                let caller = caller.unwrap_or(envelope.caller);
                Delivery::Command(self.on_command(caller, envelope.command))
            }
        })
    }

    /// The environment granted this participant the writer role.
    ///
    /// The current view becomes the authoritative state as is. No broadcast is
    /// sent; the next local mutation schedules one.
    pub fn on_role_granted(&mut self) {
        self.authority =
            ReplicatedState::from_parts(self.view.slots().to_vec(), self.view.revision());
        self.replicator.reset();
        tracing::info!(
            revision = %self.authority.revision(),
            capacity = self.authority.capacity(),
            "Writer role granted; adopted current view"
        );
    }

    /// A command addressed to the writer arrived from `caller`.
    pub fn on_command(&mut self, caller: ParticipantId, command: BoardCommand) -> CommandOutcome {
        self.execute(|writer| writer.apply(caller, command))
    }

    /// The environment reported that `participant` disconnected.
    pub fn on_participant_departed(&mut self, participant: ParticipantId) -> CommandOutcome {
        self.execute(|writer| writer.participant_departed(participant))
    }

    /// Ask to join the queue.
    pub fn request_join(&mut self) -> Result<RequestOutcome> {
        let Some(me) = self.effects.local_participant() else {
            return Ok(RequestOutcome::Refused(Rejection::NoLocalParticipant));
        };
        let now_ms = self.effects.now_ms();
        let joined = self.view.is_joined(me);
        if let Err(reason) = self
            .pending
            .begin_join(joined, self.config.auto_page_on_join, now_ms)
        {
            return Ok(RequestOutcome::Refused(reason));
        }
        self.dispatch_pending(me, BoardCommand::Join)
    }

    /// Ask to leave the queue.
    pub fn request_leave(&mut self) -> Result<RequestOutcome> {
        let Some(me) = self.effects.local_participant() else {
            return Ok(RequestOutcome::Refused(Rejection::NoLocalParticipant));
        };
        let now_ms = self.effects.now_ms();
        if let Err(reason) = self.pending.begin_leave(now_ms) {
            return Ok(RequestOutcome::Refused(reason));
        }
        self.dispatch_pending(me, BoardCommand::Leave)
    }

    /// Ask to toggle the entry shown at `row` of the current page.
    pub fn request_toggle(&mut self, row: usize) -> Result<RequestOutcome> {
        if !self.pending.permits_toggle(self.is_writer()) {
            return Ok(RequestOutcome::Refused(Rejection::PendingAction));
        }
        if row >= self.pager.page_size() {
            return Ok(RequestOutcome::Refused(Rejection::OutOfBounds));
        }
        let Some(index) = self.pager.offset().checked_add(row) else {
            return Ok(RequestOutcome::Refused(Rejection::OutOfBounds));
        };
        match self.view.slot(index) {
            None => return Ok(RequestOutcome::Refused(Rejection::OutOfBounds)),
            Some(slot) if slot.is_empty() => {
                return Ok(RequestOutcome::Refused(Rejection::EmptySlot))
            }
            Some(_) => {}
        }
        let me = self.effects.local_participant();
        self.dispatch(me, BoardCommand::Toggle { index })
    }

    /// Previous page. Local only.
    pub fn page_prev(&mut self) {
        self.pager.prev();
    }

    /// Next page. Local only.
    pub fn page_next(&mut self) {
        self.pager.next(self.view.last_occupied_index());
    }

    /// Read projection for rendering.
    pub fn snapshot(&self) -> BoardSnapshot {
        Projection {
            config: &self.config,
            view: &self.view,
            pager: &self.pager,
            pending: &self.pending,
            local: self.effects.local_participant(),
            is_writer: self.is_writer(),
        }
        .snapshot(|participant| self.effects.display_name(participant))
    }

    /// Dispatch a join or leave whose pending action is already set. A send
    /// that fails clears it again.
    fn dispatch_pending(
        &mut self,
        me: ParticipantId,
        command: BoardCommand,
    ) -> Result<RequestOutcome> {
        let outcome = self.dispatch(Some(me), command);
        if outcome.is_err() {
            self.pending.cancel();
        }
        outcome
    }

    fn dispatch(
        &mut self,
        caller: Option<ParticipantId>,
        command: BoardCommand,
    ) -> Result<RequestOutcome> {
        if self.is_writer() {
            let outcome = match (command, caller) {
                (BoardCommand::Toggle { index }, _) => self.execute(|writer| writer.toggle(index)),
                (command, Some(caller)) => self.execute(|writer| writer.apply(caller, command)),
                (_, None) => CommandOutcome::Ignored(Rejection::NoLocalParticipant),
            };
            return Ok(RequestOutcome::Executed(outcome));
        }
        self.effects.send_to_writer(command)?;
        tracing::debug!(?command, "Sent command to writer");
        Ok(RequestOutcome::Sent)
    }

    fn execute<F>(&mut self, mutate: F) -> CommandOutcome
    where
        F: FnOnce(&mut Writer<'_>) -> CommandOutcome,
    {
        let Some(mut writer) = self.writer() else {
            tracing::warn!("Queue mutation refused: not the writer");
            return CommandOutcome::Ignored(Rejection::NotWriter);
        };
        let outcome = mutate(&mut writer);
        if outcome.is_applied() {
            self.echo_authority();
        }
        outcome
    }

    fn receive_as_writer(&mut self, payload: ReplicationPayload) -> Acceptance {
        if payload.revision <= self.authority.revision() {
            return Acceptance::Ignored;
        }
        // A newer revision here can only come from a writer that raced the
        // handoff. Catch up so our next broadcast supersedes it.
        if self.replicator.is_dirty() {
            tracing::warn!(
                ours = %self.authority.revision(),
                theirs = %payload.revision,
                "Newer state arrived with local changes queued; fast-forwarding revision"
            );
            self.authority.fast_forward(payload.revision);
            return Acceptance::Ignored;
        }
        tracing::warn!(
            ours = %self.authority.revision(),
            theirs = %payload.revision,
            "Newer state arrived at the writer; adopting it"
        );
        self.authority.adopt(&payload);
        self.apply_to_view(&payload)
    }

    fn echo_authority(&mut self) {
        let payload = self.authority.to_payload();
        self.apply_to_view(&payload);
    }

    fn apply_to_view(&mut self, payload: &ReplicationPayload) -> Acceptance {
        let acceptance = self.view.accept(payload);
        if acceptance.is_applied() {
            self.settle();
        }
        acceptance
    }

    fn settle(&mut self) {
        let last = self.view.last_occupied_index();
        let joined = self
            .effects
            .local_participant()
            .map_or(false, |me| self.view.is_joined(me));
        if self.pending.take_follow(joined) {
            self.pager.jump_to_last(last);
        }
        self.pending.resolve(joined);
        self.pager.clamp(last);
    }
}
