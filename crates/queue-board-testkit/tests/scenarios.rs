#![allow(missing_docs)]
use queue_board_core::{BoardConfig, CommandOutcome, ParticipantId, PendingKind, Revision, Slot};
use queue_board_testkit::{
    assert_cluster_prefix, assert_converged, assert_view_slots, init_test_tracing, Cluster,
};

const A: ParticipantId = ParticipantId::new(1);
const B: ParticipantId = ParticipantId::new(2);
const C: ParticipantId = ParticipantId::new(3);
const D: ParticipantId = ParticipantId::new(4);

fn occupied(participant: ParticipantId, done: bool) -> Slot {
    Slot::occupied(participant, done)
}

fn join(cluster: &mut Cluster, participant: ParticipantId) {
    cluster
        .board_mut(participant)
        .unwrap()
        .request_join()
        .unwrap();
    cluster.deliver_all();
}

#[test]
fn three_slot_walkthrough() {
    init_test_tracing();
    let mut cluster = Cluster::new(BoardConfig::with_capacity(3), 3, 1).unwrap();

    join(&mut cluster, A);
    assert_eq!(
        cluster.writer_state().unwrap().slots(),
        &[occupied(A, false), Slot::Empty, Slot::Empty]
    );

    join(&mut cluster, B);
    assert_eq!(
        cluster.writer_state().unwrap().slots(),
        &[occupied(A, false), occupied(B, false), Slot::Empty]
    );

    cluster.board_mut(A).unwrap().request_toggle(0).unwrap();
    assert_eq!(
        cluster.writer_state().unwrap().slots(),
        &[occupied(A, true), occupied(B, false), Slot::Empty]
    );

    cluster.board_mut(A).unwrap().request_leave().unwrap();
    assert_eq!(
        cluster.writer_state().unwrap().slots(),
        &[Slot::Left { done: true }, occupied(B, false), Slot::Empty]
    );

    join(&mut cluster, C);
    assert!(cluster.settle(2_000));

    assert_view_slots!(
        cluster.board(C).unwrap(),
        [Slot::Left { done: true }, occupied(B, false), occupied(C, false)]
    );
    // Everything happened inside one debounce window.
    assert_eq!(cluster.writer_state().unwrap().revision(), Revision::new(1));
    assert_converged(&cluster);
}

#[test]
fn join_on_full_queue_changes_nothing() {
    let mut cluster = Cluster::new(BoardConfig::with_capacity(3), 4, 2).unwrap();
    for participant in [A, B, C] {
        join(&mut cluster, participant);
    }
    assert!(cluster.settle(2_000));
    let before = cluster.writer_state().unwrap().clone();

    join(&mut cluster, D);
    assert!(cluster.settle(2_000));

    let after = cluster.writer_state().unwrap();
    assert_eq!(after, &before);
    assert_eq!(after.last_occupied_index(), Some(2));
    assert!(cluster.board(D).unwrap().pending().is_pending());

    cluster.run_for(6_000);
    let snapshot = cluster.board(D).unwrap().snapshot();
    assert!(!snapshot.controls.show_pending);
    assert!(snapshot.controls.show_join);
    assert_eq!(snapshot.your_rank, None);
}

#[test]
fn lost_leave_releases_pending_after_timeout() {
    let mut cluster = Cluster::new(BoardConfig::with_capacity(3), 2, 3).unwrap();
    join(&mut cluster, B);
    assert!(cluster.settle(2_000));
    assert!(cluster.board(B).unwrap().view().is_joined(B));

    cluster.network().sever(B);
    cluster.board_mut(B).unwrap().request_leave().unwrap();
    assert_eq!(
        cluster.board(B).unwrap().pending().kind(),
        PendingKind::AwaitingLeave
    );

    cluster.run_for(5_000);
    assert!(cluster.board(B).unwrap().pending().is_pending());

    cluster.step();
    let board = cluster.board(B).unwrap();
    assert_eq!(board.pending().kind(), PendingKind::None);
    assert!(board.view().is_joined(B));
    assert!(cluster.writer_state().unwrap().find_by_participant(B).is_some());
}

#[test]
fn departure_leaves_marker_in_place() {
    let mut cluster = Cluster::new(BoardConfig::with_capacity(4), 3, 4).unwrap();
    join(&mut cluster, B);
    join(&mut cluster, C);
    assert!(cluster.settle(2_000));
    cluster.board_mut(B).unwrap().request_toggle(0).unwrap();
    cluster.deliver_all();
    assert!(cluster.settle(2_000));

    assert_eq!(cluster.depart(B), Some(CommandOutcome::Applied));
    assert!(cluster.settle(2_000));

    assert_eq!(
        cluster.writer_state().unwrap().slots(),
        &[Slot::Left { done: true }, occupied(C, false), Slot::Empty, Slot::Empty]
    );
    assert_eq!(cluster.board(C).unwrap().snapshot().your_rank, Some(2));
    assert_converged(&cluster);
}

#[test]
fn departing_writer_hands_role_to_lowest_remaining() {
    let mut cluster = Cluster::new(BoardConfig::with_capacity(3), 3, 5).unwrap();
    join(&mut cluster, A);
    join(&mut cluster, B);
    assert!(cluster.settle(2_000));

    assert_eq!(cluster.depart(A), Some(CommandOutcome::Applied));
    assert_eq!(cluster.writer_id(), Some(B));
    assert!(cluster.settle(2_000));

    assert_view_slots!(
        cluster.board(C).unwrap(),
        [Slot::Left { done: false }, occupied(B, false), Slot::Empty]
    );
    assert_converged(&cluster);
}

#[test]
fn joining_follows_own_entry_to_last_page() {
    let config = BoardConfig {
        page_size: 10,
        ..BoardConfig::with_capacity(25)
    };
    let mut cluster = Cluster::new(config, 23, 6).unwrap();
    for raw in 1..=22 {
        join(&mut cluster, ParticipantId::new(raw));
    }
    assert!(cluster.settle(2_000));

    let late = ParticipantId::new(23);
    join(&mut cluster, late);
    assert!(cluster.settle(2_000));

    let board = cluster.board(late).unwrap();
    assert_eq!(board.pager().offset(), 20);
    let snapshot = board.snapshot();
    assert_eq!(snapshot.page.current, 3);
    assert_eq!(snapshot.your_rank, Some(23));
    assert!(snapshot.rows[2].has_data && !snapshot.rows[3].has_data);

    assert_eq!(cluster.board(A).unwrap().pager().offset(), 0);
    assert_cluster_prefix(&cluster);
}

#[test]
fn long_names_are_truncated_in_rows() {
    let mut cluster = Cluster::new(BoardConfig::with_capacity(3), 2, 7).unwrap();
    cluster
        .network()
        .set_display_name(B, "Bartholomew of the Extremely Long Name");
    join(&mut cluster, B);
    assert!(cluster.settle(2_000));

    let row = &cluster.board(A).unwrap().snapshot().rows[0];
    assert!(row.label.ends_with('…'));
    assert!(row.label.len() <= 32);
    assert!(row.label.starts_with("Bartholomew"));
}

#[test]
fn toggle_of_empty_row_is_refused_locally() {
    let mut cluster = Cluster::new(BoardConfig::with_capacity(3), 2, 8).unwrap();
    let outcome = cluster.board_mut(B).unwrap().request_toggle(1).unwrap();
    assert_eq!(
        outcome,
        queue_board_core::RequestOutcome::Refused(queue_board_core::Rejection::EmptySlot)
    );
    assert_eq!(cluster.network().stats().commands, 0);
}
