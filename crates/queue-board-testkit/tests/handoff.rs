#![allow(missing_docs)]
use assert_matches::assert_matches;
use queue_board_core::{
    Acceptance, BoardConfig, ParticipantId, ReplicationPayload, Revision, Slot,
};
use queue_board_testkit::{assert_converged, Cluster};

const A: ParticipantId = ParticipantId::new(1);
const B: ParticipantId = ParticipantId::new(2);
const C: ParticipantId = ParticipantId::new(3);

fn settled_cluster(seed: u64) -> Cluster {
    let mut cluster = Cluster::new(BoardConfig::with_capacity(4), 3, seed).unwrap();
    for participant in [A, B] {
        cluster
            .board_mut(participant)
            .unwrap()
            .request_join()
            .unwrap();
        cluster.deliver_all();
    }
    assert!(cluster.settle(2_000));
    cluster
}

#[test]
fn new_writer_adopts_state_without_broadcasting() {
    let mut cluster = settled_cluster(21);
    let before = cluster.writer_state().unwrap().clone();
    let broadcasts = cluster.network().stats().broadcasts;

    assert!(cluster.handoff(B));
    cluster.run_for(1_000);

    assert_eq!(cluster.writer_state().unwrap(), &before);
    assert_eq!(cluster.network().stats().broadcasts, broadcasts);
    assert!(cluster.board(A).unwrap().authority().is_none());

    cluster.board_mut(C).unwrap().request_join().unwrap();
    cluster.deliver_all();
    assert!(cluster.settle(2_000));

    assert_eq!(cluster.writer_state().unwrap().revision(), before.revision().next());
    assert!(cluster.board(A).unwrap().view().is_joined(C));
    assert_converged(&cluster);
}

#[test]
fn demoted_writer_never_flushes_queued_changes() {
    let mut cluster = settled_cluster(22);
    let revision = cluster.writer_state().unwrap().revision();

    cluster.board_mut(A).unwrap().request_toggle(0).unwrap();
    assert!(cluster.board(A).unwrap().view().slot(0).unwrap().done());

    assert!(cluster.handoff(B));
    assert!(cluster.settle(2_000));
    assert_eq!(cluster.writer_state().unwrap().revision(), revision);
    assert!(!cluster.writer_state().unwrap().slot(0).unwrap().done());

    // The old writer's optimistic echo is replaced by the refreshed state.
    cluster.resync();
    assert!(!cluster.board(A).unwrap().view().slot(0).unwrap().done());
    assert_converged(&cluster);
}

#[test]
fn writer_outruns_racing_state_it_receives_while_dirty() {
    let mut cluster = settled_cluster(23);
    assert!(cluster.handoff(B));
    cluster.board_mut(B).unwrap().request_toggle(1).unwrap();

    let racing = ReplicationPayload::from_slots(
        &[Slot::occupied(C, false), Slot::Empty, Slot::Empty, Slot::Empty],
        Revision::new(9),
    );
    let acceptance = cluster.writer_board_mut().unwrap().on_receive(racing);
    assert_eq!(acceptance, Acceptance::Ignored);

    assert!(cluster.settle(2_000));
    let state = cluster.writer_state().unwrap();
    assert_eq!(state.revision(), Revision::new(10));
    assert!(state.slot(1).unwrap().done());
    assert_converged(&cluster);
}

#[test]
fn clean_writer_adopts_newer_racing_state() {
    let mut cluster = settled_cluster(24);
    assert!(cluster.handoff(B));

    let racing = ReplicationPayload::from_slots(
        &[
            Slot::occupied(A, true),
            Slot::occupied(B, false),
            Slot::Empty,
            Slot::Empty,
        ],
        Revision::new(5),
    );
    let acceptance = cluster.writer_board_mut().unwrap().on_receive(racing);
    assert_matches!(acceptance, Acceptance::Applied);

    cluster.resync();
    assert_eq!(cluster.writer_state().unwrap().revision(), Revision::new(5));
    assert!(cluster.board(C).unwrap().view().slot(0).unwrap().done());
    assert_converged(&cluster);
}

#[test]
fn stale_state_is_ignored_by_the_writer() {
    let mut cluster = settled_cluster(25);
    let before = cluster.writer_state().unwrap().clone();

    let stale = ReplicationPayload::from_slots(&[Slot::Empty; 4], Revision::INITIAL);
    let acceptance = cluster.writer_board_mut().unwrap().on_receive(stale);

    assert_eq!(acceptance, Acceptance::Ignored);
    assert_eq!(cluster.writer_state().unwrap(), &before);
}
