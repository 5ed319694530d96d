#![allow(missing_docs)]
use proptest::prelude::*;
use queue_board_core::{BoardConfig, ParticipantId, ReplicationPayload, Revision, Slot};
use queue_board_testkit::strategies::arb_payload;
use queue_board_testkit::{
    assert_cluster_prefix, assert_converged, init_test_tracing, Cluster, FaultPlan,
};

const A: ParticipantId = ParticipantId::new(1);
const B: ParticipantId = ParticipantId::new(2);

fn join(cluster: &mut Cluster, participant: ParticipantId) {
    cluster
        .board_mut(participant)
        .unwrap()
        .request_join()
        .unwrap();
    cluster.deliver_all();
}

fn observer_after(first: ReplicationPayload, second: ReplicationPayload) -> (Revision, Vec<Slot>) {
    let mut cluster = Cluster::new(BoardConfig::with_capacity(6), 2, 10).unwrap();
    let board = cluster.board_mut(B).unwrap();
    board.on_receive(first);
    board.on_receive(second);
    (board.view().revision(), board.view().slots().to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn views_never_regress(
        a in arb_payload(6, 40),
        b in arb_payload(6, 40),
    ) {
        prop_assume!(a.revision != b.revision);
        let newer = if a.revision > b.revision { a.clone() } else { b.clone() };

        for (first, second) in [(a.clone(), b.clone()), (b.clone(), a.clone())] {
            let (revision, slots) = observer_after(first, second);
            prop_assert_eq!(revision, newer.revision);
            prop_assert_eq!(slots, newer.decode_slots());
        }
    }

    #[test]
    fn burst_is_one_broadcast_one_revision(toggles in 1usize..20) {
        let mut cluster = Cluster::new(BoardConfig::with_capacity(4), 2, 9).unwrap();
        join(&mut cluster, B);
        prop_assert!(cluster.settle(2_000));
        let prior = cluster.writer_state().unwrap().revision();
        let prior_broadcasts = cluster.network().stats().broadcasts;

        let all_applied = cluster
            .writer_board_mut()
            .unwrap()
            .with_writer(|writer| (0..toggles).all(|_| writer.toggle(0).is_applied()))
            .unwrap();
        prop_assert!(all_applied);
        prop_assert!(cluster.settle(2_000));

        prop_assert_eq!(cluster.network().stats().broadcasts - prior_broadcasts, 1);
        prop_assert_eq!(cluster.writer_state().unwrap().revision(), prior.next());
        prop_assert_eq!(
            cluster.board(B).unwrap().view().slot(0).map(|slot| slot.done()),
            Some(toggles % 2 == 1)
        );
    }
}

#[test]
fn mutations_spread_over_the_window_share_one_revision() {
    init_test_tracing();
    let mut cluster = Cluster::new(BoardConfig::with_capacity(8), 5, 13).unwrap();
    for raw in 2..=5 {
        join(&mut cluster, ParticipantId::new(raw));
        cluster.step();
    }
    // Four joins across 200ms, all before the 250ms deadline armed by the first.
    assert_eq!(cluster.network().stats().broadcasts, 0);

    assert!(cluster.settle(2_000));
    assert_eq!(cluster.network().stats().broadcasts, 1);
    assert_eq!(cluster.writer_state().unwrap().revision(), Revision::new(1));
    assert_converged(&cluster);
}

#[test]
fn duplicated_commands_do_not_duplicate_entries() {
    let mut cluster = Cluster::new(BoardConfig::with_capacity(4), 3, 14).unwrap();
    cluster.network().set_faults(FaultPlan {
        duplicate_rate: 1.0,
        ..FaultPlan::reliable()
    });

    join(&mut cluster, B);
    assert!(cluster.settle(2_000));
    assert_eq!(cluster.network().stats().duplicated, 3);

    let state = cluster.writer_state().unwrap();
    assert_eq!(state.find_by_participant(B), Some(0));
    assert_eq!(state.last_occupied_index(), Some(0));
    assert_converged(&cluster);
}

#[test]
fn lossy_reordered_traffic_converges_after_resync() {
    init_test_tracing();
    let mut cluster = Cluster::new(BoardConfig::with_capacity(12), 6, 11).unwrap();
    cluster.network().set_faults(FaultPlan::chaotic(0.3));

    for round in 0u32..20 {
        for raw in 1u32..=6 {
            let board = cluster.board_mut(ParticipantId::new(raw)).unwrap();
            match (round + raw) % 3 {
                0 => board.request_join().unwrap(),
                1 => board.request_toggle(0).unwrap(),
                _ => board.request_leave().unwrap(),
            };
        }
        cluster.run_for(300);
        assert_cluster_prefix(&cluster);
    }

    cluster.network().set_faults(FaultPlan::reliable());
    assert!(cluster.settle(10_000));
    cluster.resync();
    assert!(cluster.settle(10_000));
    assert_converged(&cluster);
    assert!(cluster.network().stats().dropped > 0);
}

#[test]
fn mailbox_accepts_state_from_another_thread() {
    let mut cluster = Cluster::new(BoardConfig::with_capacity(3), 2, 12).unwrap();
    cluster.network().sever(B);
    join(&mut cluster, A);
    assert!(cluster.settle(2_000));
    assert_eq!(cluster.board(B).unwrap().view().revision(), Revision::INITIAL);

    let payload = cluster.writer_state().unwrap().to_payload();
    let mailbox = cluster.board(B).unwrap().mailbox();
    std::thread::spawn(move || mailbox.offer(payload))
        .join()
        .unwrap();

    cluster.step();
    assert!(cluster.board(B).unwrap().view().is_joined(A));
    assert_converged(&cluster);
}
