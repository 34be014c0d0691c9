//! # Phalanx Engine
//!
//! The consensus core of the Phalanx replication library: an implementation
//! of the Rabia protocol for a fixed cluster of `n = 2f + 1` crash-fault
//! replicas.
//!
//! ## Components
//!
//! - [`phase::PhaseData`]: per-phase tally of proposals and votes, and the
//!   deterministic evaluation rules (initial vote, round-2 vote, decision,
//!   coin flip)
//! - [`consensus::ConsensusManager`]: bounded phase cache and message
//!   routing with stale-drop and future-buffering semantics
//! - [`state::StateManager`]: node lifecycle, state machine bridge, and
//!   snapshot coordination
//! - [`engine::ConsensusEngine`]: the orchestrator gluing the above to the
//!   network, persistence, and client submissions
//! - [`executor::Executor`]: the serial critical worker / parallel pool
//!   split that serializes phase-advancing transitions
//!
//! ## Example
//!
//! ```no_run
//! use phalanx_core::network::ClusterConfig;
//! use phalanx_core::state_machine::InMemoryStateMachine;
//! use phalanx_core::NodeId;
//! use phalanx_engine::{ConsensusEngine, EngineConfig};
//! use phalanx_persistence::InMemoryPersistence;
//!
//! # async fn run(network: impl phalanx_core::network::NetworkTransport) {
//! let members = ["a", "b", "c"].map(NodeId::new);
//! let cluster = ClusterConfig::new(NodeId::new("a"), members);
//! let engine = ConsensusEngine::new(
//!     cluster,
//!     EngineConfig::default(),
//!     InMemoryStateMachine::new(),
//!     network,
//!     InMemoryPersistence::new(),
//! );
//! engine.start();
//! engine.wait_started().await;
//! # }
//! ```

pub mod config;
pub mod consensus;
pub mod engine;
pub mod executor;
pub mod pending;
pub mod phase;
pub mod state;

pub use config::EngineConfig;
pub use consensus::ConsensusManager;
pub use engine::{ConsensusEngine, EngineStatistics};
pub use executor::{CriticalTask, Executor};
pub use pending::PendingPool;
pub use phase::{coin_flip, PhaseData, Round2Outcome};
pub use state::StateManager;
