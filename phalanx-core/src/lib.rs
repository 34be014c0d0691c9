//! # Phalanx Core
//!
//! Core types and collaborator contracts for the Phalanx replicated state
//! machine library.
//!
//! This crate defines everything the consensus engine shares with its
//! surroundings:
//!
//! - **Types**: `NodeId`, `Phase`, `StateValue`, `Command`, `CommandBatch`
//! - **Messages**: the protocol message catalogue and its envelope
//! - **State machine**: the deterministic application contract and snapshots
//! - **Network**: cluster topology arithmetic and the transport trait
//! - **Persistence**: the saved-state contract for resynchronization
//! - **Errors**: the caller-facing error taxonomy
//! - **Validation / codec**: structural message checks and wire encodings
//!
//! ## Example
//!
//! ```rust
//! use phalanx_core::{Command, CommandBatch, NodeId, Phase};
//!
//! let batch = CommandBatch::new(vec![Command::new("SET key value")]);
//! let node = NodeId::new("replica-1");
//! let phase = Phase::ZERO.next();
//! assert_eq!(phase.value(), 1);
//! assert!(!batch.is_empty());
//! ```

pub mod codec;
pub mod error;
pub mod messages;
pub mod network;
pub mod persistence;
pub mod state_machine;
pub mod types;
pub mod validation;

pub use error::*;
pub use types::*;
pub use validation::Validator;
