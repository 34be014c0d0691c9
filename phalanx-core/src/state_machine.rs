//! State machine boundary: the application contract the engine replicates,
//! plus a small in-memory key/value machine used by tests and examples.

use crate::{Command, PhalanxError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// An opaque, checksummed state machine snapshot.
///
/// Equality is structural over the snapshot bytes, which is what saved-state
/// comparison relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub data: Bytes,
    pub checksum: u32,
}

impl Snapshot {
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let checksum = crc32fast::hash(&data);
        Self { data, checksum }
    }

    pub fn verify_checksum(&self) -> bool {
        crc32fast::hash(&self.data) == self.checksum
    }
}

/// The deterministic application the cluster replicates.
///
/// `process` is invoked with each committed batch's commands in list order
/// and must return one result per command. Snapshots carry the complete
/// state; `restore_snapshot` followed by replaying later batches must be
/// equivalent to having processed everything locally.
#[async_trait]
pub trait StateMachine: Send + Sync {
    /// Apply commands in order and return per-command results.
    async fn process(&mut self, commands: &[Command]) -> Result<Vec<Bytes>>;

    /// Produce a snapshot of the complete current state.
    async fn make_snapshot(&self) -> Result<Snapshot>;

    /// Replace the current state with the snapshot's contents.
    async fn restore_snapshot(&mut self, snapshot: &Snapshot) -> Result<()>;

    /// Return to the empty initial state.
    async fn reset(&mut self);
}

/// String-command key/value machine: `SET key value`, `GET key`, `DEL key`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStateMachine {
    state: std::collections::HashMap<String, Bytes>,
}

impl InMemoryStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_one(&mut self, command: &Command) -> Bytes {
        let text = String::from_utf8_lossy(&command.data);
        let parts: Vec<&str> = text.split_whitespace().collect();

        match parts.as_slice() {
            ["SET", key, value] => {
                self.state
                    .insert((*key).to_string(), Bytes::from((*value).to_string()));
                Bytes::from_static(b"OK")
            }
            ["GET", key] => match self.state.get(*key) {
                Some(value) => value.clone(),
                None => Bytes::from_static(b"NOT_FOUND"),
            },
            ["DEL", key] => match self.state.remove(*key) {
                Some(_) => Bytes::from_static(b"OK"),
                None => Bytes::from_static(b"NOT_FOUND"),
            },
            _ => Bytes::from_static(b"ERROR: invalid command"),
        }
    }
}

#[async_trait]
impl StateMachine for InMemoryStateMachine {
    async fn process(&mut self, commands: &[Command]) -> Result<Vec<Bytes>> {
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            results.push(self.apply_one(command));
        }
        Ok(results)
    }

    async fn make_snapshot(&self) -> Result<Snapshot> {
        let serialized = serde_json::to_vec(&self.state)?;
        Ok(Snapshot::new(serialized))
    }

    async fn restore_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        if !snapshot.verify_checksum() {
            return Err(PhalanxError::ChecksumMismatch {
                expected: snapshot.checksum,
                actual: crc32fast::hash(&snapshot.data),
            });
        }
        self.state = serde_json::from_slice(&snapshot.data)?;
        Ok(())
    }

    async fn reset(&mut self) {
        self.state.clear();
    }
}
