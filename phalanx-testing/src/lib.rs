//! # Phalanx Testing
//!
//! In-process cluster tooling: an in-memory transport hub with partition
//! support and a harness that boots a full cluster of consensus engines.

pub mod cluster;
pub mod network;

pub use cluster::{ClusterNode, TestCluster, TestEngine};
pub use network::{InMemoryNetwork, NetworkHub};

/// Initialise test logging once; later calls are no-ops.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}
