//! Standard assertion helpers for queue board tests.

use crate::cluster::Cluster;
use queue_board_core::state::is_prefix_contiguous;
use queue_board_core::Slot;

/// Assert that a board's view holds exactly the given slots
#[macro_export]
macro_rules! assert_view_slots {
    ($board:expr, [$($slot:expr),* $(,)?]) => {{
        let expected: Vec<queue_board_core::Slot> = vec![$($slot),*];
        assert_eq!(
            $board.view().slots(),
            expected.as_slice(),
            "View at {} does not hold the expected slots",
            $board.view().revision()
        )
    }};
}

/// Assert that non-empty slots form a prefix.
pub fn assert_prefix_contiguous(slots: &[Slot]) {
    assert!(
        is_prefix_contiguous(slots),
        "Used slots are not a contiguous prefix: {slots:?}"
    );
}

/// Assert that the writer exists and every view matches its state.
pub fn assert_converged(cluster: &Cluster) {
    let state = cluster
        .writer_state()
        .expect("cluster has no writer to converge on");
    let divergence = cluster.divergence();
    assert!(
        divergence.is_empty(),
        "Views diverge from writer state at {}: {divergence:?}",
        state.revision()
    );
}

/// Assert the prefix invariant on the writer and on every view.
pub fn assert_cluster_prefix(cluster: &Cluster) {
    if let Some(state) = cluster.writer_state() {
        assert_prefix_contiguous(state.slots());
    }
    for participant in cluster.participants() {
        if let Some(board) = cluster.board(participant) {
            assert_prefix_contiguous(board.view().slots());
        }
    }
}
