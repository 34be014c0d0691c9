//! # Core Types
//!
//! Fundamental identifiers and values used throughout the Phalanx consensus
//! protocol.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// Identity of a replica in the consensus cluster.
///
/// Node identities are opaque strings assigned by the deployment (host
/// names, pod names, operator-chosen labels). The membership set is fixed
/// at startup; identifiers are used as map keys for proposals and votes.
///
/// # Examples
///
/// ```rust
/// use phalanx_core::NodeId;
///
/// let node = NodeId::new("replica-1");
/// assert_eq!(node.as_str(), "replica-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of one consensus phase.
///
/// Phases are numbered from zero and totally ordered; the protocol moves
/// through them one decision at a time.
///
/// # Examples
///
/// ```rust
/// use phalanx_core::Phase;
///
/// let phase = Phase::ZERO;
/// assert!(phase.next() > phase);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Phase(u64);

impl Phase {
    /// The initial phase.
    pub const ZERO: Phase = Phase(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The successor phase.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Vote values exchanged by the protocol.
///
/// Round-1 votes and decisions only ever carry `V0` or `V1`; `VQuestion`
/// marks round-2 abstention when round 1 produced no quorum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateValue {
    /// Vote against / decide the empty batch.
    V0,
    /// Vote for / decide the agreed batch.
    V1,
    /// No round-1 quorum observed; round-2 only.
    VQuestion,
}

impl StateValue {
    /// True for `V0` and `V1`.
    pub fn is_definite(&self) -> bool {
        !matches!(self, StateValue::VQuestion)
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::V0 => write!(f, "V0"),
            StateValue::V1 => write!(f, "V1"),
            StateValue::VQuestion => write!(f, "V?"),
        }
    }
}

/// Internal identifier of a command batch, used for ordering and equality.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BatchId(Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The identifier carried by the canonical empty batch.
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlates a committed batch back to the client that submitted it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The correlation id of the canonical empty batch.
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single application command.
///
/// The payload is opaque to the protocol; the state machine interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub id: Uuid,
    pub data: bytes::Bytes,
}

impl Command {
    pub fn new(data: impl Into<bytes::Bytes>) -> Self {
        Self {
            id: Uuid::new_v4(),
            data: data.into(),
        }
    }
}

/// An ordered list of commands proposed and committed as a unit.
///
/// Batches are totally ordered by `(timestamp, id, correlation_id)`; the
/// pending pool uses this order when choosing what to propose next.
///
/// # Examples
///
/// ```rust
/// use phalanx_core::{Command, CommandBatch};
///
/// let batch = CommandBatch::new(vec![Command::new("SET k v")]);
/// assert!(!batch.is_empty());
/// assert!(CommandBatch::empty().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandBatch {
    pub id: BatchId,
    pub correlation_id: CorrelationId,
    pub commands: Vec<Command>,
    /// Milliseconds since the Unix epoch at creation.
    pub timestamp: u64,
}

impl CommandBatch {
    pub fn new(commands: Vec<Command>) -> Self {
        Self {
            id: BatchId::new(),
            correlation_id: CorrelationId::new(),
            commands,
            timestamp: now_millis(),
        }
    }

    /// The canonical empty batch: the protocol's no-op proposal. All
    /// replicas construct the identical value.
    pub fn empty() -> Self {
        Self {
            id: BatchId::nil(),
            correlation_id: CorrelationId::nil(),
            commands: Vec::new(),
            timestamp: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn order_key(&self) -> (u64, BatchId, CorrelationId) {
        (self.timestamp, self.id, self.correlation_id)
    }
}

impl PartialOrd for CommandBatch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CommandBatch {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
