//! Local pending-action tracking.
//!
//! When an observer asks the writer to join or leave, the request may take a
//! while to come back as replicated state, or may be lost entirely. The
//! pending action holds the observer in a waiting state until its view shows
//! the expected result, or until the timeout releases it. The timeout is a
//! liveness fallback only: it does not retract the request and does not mean
//! the request succeeded.

use crate::errors::Rejection;
use std::time::Duration;

/// Reference timeout before a pending action is released.
pub const DEFAULT_PENDING_TIMEOUT: Duration = Duration::from_secs(5);

/// Kind of request awaiting confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PendingKind {
    /// Nothing outstanding.
    #[default]
    None,
    /// A join was sent; waiting to appear in the view.
    AwaitingJoin,
    /// A leave was sent; waiting to disappear from the view.
    AwaitingLeave,
}

/// Outstanding join/leave request of the local participant. Never replicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingAction {
    kind: PendingKind,
    since_ms: u64,
    follow_join: bool,
}

impl PendingAction {
    /// No outstanding request.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Current kind.
    pub fn kind(&self) -> PendingKind {
        self.kind
    }

    /// When the outstanding request was issued.
    pub fn since_ms(&self) -> Option<u64> {
        self.is_pending().then_some(self.since_ms)
    }

    /// Whether a request is outstanding.
    pub fn is_pending(&self) -> bool {
        self.kind != PendingKind::None
    }

    /// Start waiting for a join.
    ///
    /// Refused when the participant is already joined in the view or another
    /// request is outstanding. `follow` asks the pager to jump to the new
    /// entry once it shows up.
    pub fn begin_join(
        &mut self,
        already_joined: bool,
        follow: bool,
        now_ms: u64,
    ) -> Result<(), Rejection> {
        if self.is_pending() {
            return Err(Rejection::PendingAction);
        }
        if already_joined {
            return Err(Rejection::AlreadyPresent);
        }
        self.kind = PendingKind::AwaitingJoin;
        self.since_ms = now_ms;
        self.follow_join = follow;
        Ok(())
    }

    /// Start waiting for a leave. No presence check: leaving while absent is a
    /// no-op at the writer and resolves on the next view update.
    pub fn begin_leave(&mut self, now_ms: u64) -> Result<(), Rejection> {
        if self.is_pending() {
            return Err(Rejection::PendingAction);
        }
        self.kind = PendingKind::AwaitingLeave;
        self.since_ms = now_ms;
        Ok(())
    }

    /// Drop the outstanding request, e.g. when it never left this participant.
    pub fn cancel(&mut self) {
        self.kind = PendingKind::None;
        self.follow_join = false;
    }

    /// Settle against the applied view. Returns true if the action cleared.
    pub fn resolve(&mut self, joined: bool) -> bool {
        let settled = match self.kind {
            PendingKind::None => false,
            PendingKind::AwaitingJoin => joined,
            PendingKind::AwaitingLeave => !joined,
        };
        if settled {
            tracing::debug!(kind = ?self.kind, "Pending action confirmed by view");
            self.kind = PendingKind::None;
        }
        settled
    }

    /// Release the action once `timeout` has elapsed. `None` disables the
    /// fallback. Returns true if the action was released.
    pub fn expire(&mut self, now_ms: u64, timeout: Option<Duration>) -> bool {
        let Some(timeout) = timeout else {
            return false;
        };
        if !self.is_pending() {
            return false;
        }
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        if now_ms.saturating_sub(self.since_ms) > timeout_ms {
            tracing::debug!(
                kind = ?self.kind,
                waited_ms = now_ms.saturating_sub(self.since_ms),
                "Pending action timed out"
            );
            self.kind = PendingKind::None;
            return true;
        }
        false
    }

    /// Whether row toggles from this observer are allowed. The writer acts on
    /// its own applied state and is never held back.
    pub fn permits_toggle(&self, is_writer: bool) -> bool {
        is_writer || !self.is_pending()
    }

    /// Consume the jump-to-entry request once the participant is joined.
    pub fn take_follow(&mut self, joined: bool) -> bool {
        if self.follow_join && joined {
            self.follow_join = false;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Option<Duration> = Some(DEFAULT_PENDING_TIMEOUT);

    #[test]
    fn join_resolves_when_view_shows_participant() {
        let mut pending = PendingAction::idle();
        pending.begin_join(false, false, 0).unwrap();
        assert_eq!(pending.kind(), PendingKind::AwaitingJoin);

        assert!(!pending.resolve(false));
        assert!(pending.resolve(true));
        assert_eq!(pending.kind(), PendingKind::None);
    }

    #[test]
    fn join_refused_when_already_joined() {
        let mut pending = PendingAction::idle();
        assert_eq!(
            pending.begin_join(true, false, 0),
            Err(Rejection::AlreadyPresent)
        );
        assert!(!pending.is_pending());
    }

    #[test]
    fn leave_resolves_when_participant_absent() {
        let mut pending = PendingAction::idle();
        pending.begin_leave(10).unwrap();
        assert_eq!(pending.since_ms(), Some(10));
        assert!(!pending.resolve(true));
        assert!(pending.resolve(false));
    }

    #[test]
    fn second_request_waits_for_first() {
        let mut pending = PendingAction::idle();
        pending.begin_leave(0).unwrap();
        assert_eq!(
            pending.begin_join(false, false, 1),
            Err(Rejection::PendingAction)
        );
    }

    #[test]
    fn cancel_returns_to_idle() {
        let mut pending = PendingAction::idle();
        pending.begin_join(false, true, 0).unwrap();
        pending.cancel();
        assert_eq!(pending.kind(), PendingKind::None);
        assert!(!pending.take_follow(true));
        assert!(pending.begin_leave(1).is_ok());
    }

    #[test]
    fn timeout_releases_strictly_after_window() {
        let mut pending = PendingAction::idle();
        pending.begin_leave(0).unwrap();

        assert!(!pending.expire(5_000, TIMEOUT));
        assert!(pending.is_pending());
        assert!(pending.expire(5_001, TIMEOUT));
        assert!(!pending.is_pending());
    }

    #[test]
    fn disabled_timeout_never_releases() {
        let mut pending = PendingAction::idle();
        pending.begin_join(false, false, 0).unwrap();
        assert!(!pending.expire(u64::MAX, None));
        assert!(pending.is_pending());
    }

    #[test]
    fn toggles_blocked_while_pending_except_writer() {
        let mut pending = PendingAction::idle();
        assert!(pending.permits_toggle(false));
        pending.begin_join(false, false, 0).unwrap();
        assert!(!pending.permits_toggle(false));
        assert!(pending.permits_toggle(true));
    }

    #[test]
    fn follow_is_consumed_once() {
        let mut pending = PendingAction::idle();
        pending.begin_join(false, true, 0).unwrap();
        assert!(!pending.take_follow(false));
        assert!(pending.take_follow(true));
        assert!(!pending.take_follow(true));
    }
}
