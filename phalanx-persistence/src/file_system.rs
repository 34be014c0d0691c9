use async_trait::async_trait;
use phalanx_core::persistence::{Persistence, SavedState};
use phalanx_core::{PhalanxError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Stores the saved state in a single JSON file.
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash mid-write leaves the previous state intact.
#[derive(Debug, Clone)]
pub struct FileSystemPersistence {
    state_file_path: PathBuf,
}

impl FileSystemPersistence {
    /// Create a backend rooted at `data_dir`, creating the directory if
    /// needed.
    pub async fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        if !data_dir.exists() {
            fs::create_dir_all(data_dir).await.map_err(|e| {
                PhalanxError::persistence(format!("failed to create data directory: {e}"))
            })?;
        }
        Ok(Self {
            state_file_path: data_dir.join("state.json"),
        })
    }
}

#[async_trait]
impl Persistence for FileSystemPersistence {
    async fn save(&self, state: &SavedState) -> Result<()> {
        let encoded = serde_json::to_vec(state)?;
        let temp_path = self.state_file_path.with_extension("tmp");

        fs::write(&temp_path, &encoded).await.map_err(|e| {
            PhalanxError::persistence(format!("failed to write temporary state file: {e}"))
        })?;
        fs::rename(&temp_path, &self.state_file_path)
            .await
            .map_err(|e| {
                PhalanxError::persistence(format!("failed to move state file into place: {e}"))
            })?;

        debug!(
            "persisted state at committed phase {}",
            state.last_committed_phase
        );
        Ok(())
    }

    async fn load(&self) -> Result<Option<SavedState>> {
        match fs::read(&self.state_file_path).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PhalanxError::persistence(format!(
                "failed to read state file: {e}"
            ))),
        }
    }
}
