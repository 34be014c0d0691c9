use async_trait::async_trait;
use parking_lot::RwLock;
use phalanx_core::persistence::{Persistence, SavedState};
use phalanx_core::Result;
use std::sync::Arc;

/// Keeps the saved state in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPersistence {
    state: Arc<RwLock<Option<SavedState>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Persistence for InMemoryPersistence {
    async fn save(&self, state: &SavedState) -> Result<()> {
        *self.state.write() = Some(state.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<SavedState>> {
        Ok(self.state.read().clone())
    }
}
