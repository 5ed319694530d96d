//! Read projections for rendering.
//!
//! Nothing here feeds back into replicated state. A renderer gets one
//! [`BoardSnapshot`] per refresh and draws it; user input goes back through
//! the board's request methods.

use crate::codec::{ParticipantId, Slot};
use crate::config::BoardConfig;
use crate::pager::{PageInfo, Pager};
use crate::pending::PendingAction;
use crate::state::Revision;
use crate::view::ViewBuffer;
use serde::{Deserialize, Serialize};

/// One rendered row of the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowView {
    /// Whether the row shows an entry
    pub has_data: bool,
    /// Whether clicking the row may toggle it
    pub interactable: bool,
    /// 1-based queue position; 0 for blank rows
    pub rank: usize,
    /// Whether the entry is checked off
    pub done: bool,
    /// Display label
    pub label: String,
    /// Whether the entry is a left marker
    pub is_left: bool,
}

impl RowView {
    fn blank() -> Self {
        Self {
            has_data: false,
            interactable: false,
            rank: 0,
            done: false,
            label: String::new(),
            is_left: false,
        }
    }
}

/// Which join/leave affordances to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Controls {
    pub show_join: bool,
    pub show_leave: bool,
    /// Non-interactive "waiting" indicator
    pub show_pending: bool,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    /// Revision the view was built from
    pub revision: Revision,
    /// Exactly one entry per row of the page
    pub rows: Vec<RowView>,
    pub page: PageInfo,
    pub controls: Controls,
    /// 1-based position of the local participant, if joined
    pub your_rank: Option<usize>,
}

/// Cut `label` to at most `max_bytes` UTF-8 bytes including `suffix`.
///
/// Cuts fall on char boundaries. A `max_bytes` of 0 disables truncation.
pub fn truncate_label(label: &str, max_bytes: usize, suffix: &str) -> String {
    if max_bytes == 0 || label.len() <= max_bytes {
        return label.to_string();
    }
    let budget = max_bytes.saturating_sub(suffix.len());
    let end = label
        .char_indices()
        .map(|(start, ch)| start + ch.len_utf8())
        .take_while(|&end| end <= budget)
        .last()
        .unwrap_or(0);
    format!("{}{suffix}", &label[..end])
}

pub(crate) struct Projection<'a> {
    pub config: &'a BoardConfig,
    pub view: &'a ViewBuffer,
    pub pager: &'a Pager,
    pub pending: &'a PendingAction,
    pub local: Option<ParticipantId>,
    pub is_writer: bool,
}

impl Projection<'_> {
    pub fn snapshot<F>(&self, display_name: F) -> BoardSnapshot
    where
        F: Fn(ParticipantId) -> Option<String>,
    {
        let last = self.view.last_occupied_index();
        let rows_interactable = self.pending.permits_toggle(self.is_writer);

        let rows = self
            .pager
            .rows()
            .map(|index| match (last, self.view.slot(index)) {
                (Some(last), Some(slot)) if index <= last && !slot.is_empty() => RowView {
                    has_data: true,
                    interactable: rows_interactable,
                    rank: index + 1,
                    done: slot.done(),
                    label: self.label(slot, &display_name),
                    is_left: slot.is_left(),
                },
                _ => RowView::blank(),
            })
            .collect();

        let joined = self.local.map_or(false, |me| self.view.is_joined(me));
        let pending = self.pending.is_pending();
        BoardSnapshot {
            revision: self.view.revision(),
            rows,
            page: self.pager.info(last),
            controls: Controls {
                show_join: !pending && self.local.is_some() && !joined,
                show_leave: !pending && joined,
                show_pending: pending,
            },
            your_rank: self.local.and_then(|me| self.view.rank_of(me)),
        }
    }

    fn label<F>(&self, slot: Slot, display_name: &F) -> String
    where
        F: Fn(ParticipantId) -> Option<String>,
    {
        match slot {
            Slot::Occupied { participant, .. } => {
                let name = display_name(participant).unwrap_or_else(|| participant.to_string());
                truncate_label(&name, self.config.max_label_bytes, &self.config.label_suffix)
            }
            Slot::Left { .. } => self.config.left_label.clone(),
            Slot::Empty => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ReplicationPayload;

    #[test]
    fn short_labels_pass_through() {
        assert_eq!(truncate_label("alice", 32, "…"), "alice");
    }

    #[test]
    fn long_labels_are_cut_on_char_boundary() {
        // Each kana is 3 bytes; budget 10 - 3 (suffix) = 7 fits two.
        assert_eq!(truncate_label("あいうえお", 10, "…"), "あい…");
        assert_eq!(truncate_label("abcdefgh", 5, ".."), "abc..");
    }

    #[test]
    fn tiny_budget_leaves_only_suffix() {
        assert_eq!(truncate_label("abcdef", 2, "…"), "…");
        assert_eq!(truncate_label("abcdef", 0, "…"), "abcdef");
    }

    #[test]
    fn snapshot_renders_page_rows() {
        let config = BoardConfig {
            page_size: 3,
            ..BoardConfig::with_capacity(5)
        };
        let me = ParticipantId::new(2);
        let mut view = ViewBuffer::new(5);
        view.accept(&ReplicationPayload::from_slots(
            &[
                Slot::Left { done: true },
                Slot::occupied(me, false),
                Slot::Empty,
                Slot::Empty,
                Slot::Empty,
            ],
            Revision::new(3),
        ));
        let pager = Pager::new(3);
        let pending = PendingAction::idle();

        let snapshot = Projection {
            config: &config,
            view: &view,
            pager: &pager,
            pending: &pending,
            local: Some(me),
            is_writer: false,
        }
        .snapshot(|id| (id == me).then(|| "bob".to_string()));

        assert_eq!(snapshot.rows.len(), 3);
        assert!(snapshot.rows[0].is_left && snapshot.rows[0].done);
        assert_eq!(snapshot.rows[0].label, "[left the queue]");
        assert_eq!(snapshot.rows[1].label, "bob");
        assert_eq!(snapshot.rows[1].rank, 2);
        assert!(!snapshot.rows[2].has_data);
        assert_eq!(snapshot.your_rank, Some(2));
        assert!(snapshot.controls.show_leave && !snapshot.controls.show_join);
        assert_eq!(snapshot.page.total, 1);
    }
}
