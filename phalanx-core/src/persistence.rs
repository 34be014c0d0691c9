//! Minimal persistence boundary: a saved snapshot plus the still-pending
//! batches, written on deactivation and read back during resynchronization.

use crate::state_machine::Snapshot;
use crate::{CommandBatch, Phase, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The unit of durable state.
///
/// Equality is structural: snapshot bytes, committed phase, and pending
/// batches all participate, so two replicas with the same saved state
/// compare equal regardless of where the snapshot was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedState {
    pub snapshot: Option<Snapshot>,
    pub last_committed_phase: Phase,
    pub pending_batches: Vec<CommandBatch>,
}

impl SavedState {
    pub fn new(
        snapshot: Option<Snapshot>,
        last_committed_phase: Phase,
        pending_batches: Vec<CommandBatch>,
    ) -> Self {
        Self {
            snapshot,
            last_committed_phase,
            pending_batches,
        }
    }

    /// The state of a replica that has never committed anything.
    pub fn initial() -> Self {
        Self {
            snapshot: None,
            last_committed_phase: Phase::ZERO,
            pending_batches: Vec::new(),
        }
    }
}

impl Default for SavedState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Durable storage for [`SavedState`]. An in-memory implementation
/// satisfies the contract; durable variants are pluggable.
#[async_trait]
pub trait Persistence: Send + Sync + 'static {
    async fn save(&self, state: &SavedState) -> Result<()>;

    async fn load(&self) -> Result<Option<SavedState>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Command;

    #[test]
    fn initial_state_is_empty() {
        let state = SavedState::initial();
        assert!(state.snapshot.is_none());
        assert_eq!(state.last_committed_phase, Phase::ZERO);
        assert!(state.pending_batches.is_empty());
    }

    #[test]
    fn equality_is_structural() {
        let batch = CommandBatch::new(vec![Command::new("SET k v")]);
        let a = SavedState::new(
            Some(Snapshot::new(&b"state"[..])),
            Phase::new(3),
            vec![batch.clone()],
        );
        let b = SavedState::new(Some(Snapshot::new(&b"state"[..])), Phase::new(3), vec![batch]);
        assert_eq!(a, b);

        let c = SavedState::new(Some(Snapshot::new(&b"other"[..])), Phase::new(3), Vec::new());
        assert_ne!(a, c);
    }
}
