//! # Error Types
//!
//! Error handling for the Phalanx consensus protocol. Protocol-internal
//! outcomes (stale messages, duplicate decisions, carry-forward) are not
//! errors; this enum covers the conditions surfaced to callers and the
//! infrastructure seams.

use crate::{NodeId, Phase};
use thiserror::Error;

/// Errors surfaced by the consensus engine and its collaborators.
///
/// # Examples
///
/// ```rust
/// use phalanx_core::PhalanxError;
///
/// let error = PhalanxError::network("connection refused");
/// assert!(error.is_retryable());
/// ```
#[derive(Error, Debug)]
pub enum PhalanxError {
    /// A batch was submitted while this replica is dormant.
    #[error("node is not active")]
    NodeInactive,

    /// A batch was submitted with no commands in it.
    #[error("command batch is empty")]
    EmptyCommandBatch,

    /// The state machine failed to produce a snapshot.
    #[error("snapshot failed: {message}")]
    SnapshotFailed { message: String },

    /// The state machine rejected a snapshot during restore.
    #[error("restore failed: {message}")]
    RestoreFailed { message: String },

    /// Communication failure in the transport layer.
    #[error("network error: {message}")]
    Network { message: String },

    /// Failure in the persistence layer.
    #[error("persistence error: {message}")]
    Persistence { message: String },

    /// The application state machine failed while applying commands.
    #[error("state machine error: {message}")]
    StateMachine { message: String },

    /// Not enough replicas reachable to make progress.
    #[error("quorum not available: {current}/{required} nodes")]
    QuorumNotAvailable { current: usize, required: usize },

    /// Snapshot or saved-state integrity check failed.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Referenced replica is not a cluster member.
    #[error("node {node_id} not found")]
    NodeNotFound { node_id: NodeId },

    /// Referenced phase has been evicted or never existed.
    #[error("phase {phase} not found")]
    PhaseNotFound { phase: Phase },

    /// Operation exceeded its deadline.
    #[error("timeout occurred: {operation}")]
    Timeout { operation: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal condition.
    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, PhalanxError>;

impl PhalanxError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    pub fn state_machine(message: impl Into<String>) -> Self {
        Self::StateMachine {
            message: message.into(),
        }
    }

    pub fn snapshot_failed(message: impl Into<String>) -> Self {
        Self::SnapshotFailed {
            message: message.into(),
        }
    }

    pub fn restore_failed(message: impl Into<String>) -> Self {
        Self::RestoreFailed {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether retrying the operation may succeed.
    ///
    /// Transient conditions (network, timeouts, missing quorum) are
    /// retryable; integrity and usage errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. }
                | Self::Timeout { .. }
                | Self::QuorumNotAvailable { .. }
                | Self::NodeInactive
        )
    }
}
