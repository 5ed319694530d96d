//! Queue Board Testing Infrastructure
//!
//! Deterministic building blocks for exercising boards together: a manual
//! clock, a seeded lossy network that also assigns the writer role, and a
//! [`Cluster`] harness driving one board per participant.
//!
//! # Usage
//!
//! ```rust,no_run
//! use queue_board_core::{BoardConfig, ParticipantId};
//! use queue_board_testkit::{assert_converged, Cluster};
//!
//! let mut cluster = Cluster::new(BoardConfig::with_capacity(8), 3, 42).unwrap();
//! cluster.board_mut(ParticipantId::new(2)).unwrap().request_join().unwrap();
//! cluster.settle(1_000);
//! assert_converged(&cluster);
//! ```

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod assertions;
pub mod cluster;
pub mod effects;
pub mod strategies;
pub mod time;
pub mod transport;

pub use assertions::*;
pub use cluster::{Cluster, Divergence, DEFAULT_TICK_MS};
pub use effects::NodeEffects;
pub use time::ManualClock;
pub use transport::{Envelope, FaultPlan, MemoryNetwork, NetworkStats};

/// Install a test-friendly tracing subscriber once. `RUST_LOG` selects the
/// level.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
