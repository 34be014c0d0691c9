//! Cluster topology arithmetic and the transport boundary.
//!
//! Membership is fixed at startup. The quorum sizes are derived once from
//! `n = 2f + 1`; any two quorums intersect in at least one replica, which
//! is the property the vote-counting rules lean on.

use crate::messages::ProtocolMessage;
use crate::{NodeId, Result};
use async_trait::async_trait;
use std::collections::HashSet;

/// The fixed cluster membership as seen by one replica.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    node_id: NodeId,
    members: HashSet<NodeId>,
}

impl ClusterConfig {
    /// Build the configuration for `node_id`. The local node is always a
    /// member, whether or not `members` listed it.
    pub fn new(node_id: NodeId, members: impl IntoIterator<Item = NodeId>) -> Self {
        let mut members: HashSet<NodeId> = members.into_iter().collect();
        members.insert(node_id.clone());
        Self { node_id, members }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn members(&self) -> &HashSet<NodeId> {
        &self.members
    }

    /// Total cluster size `n`.
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Minimal quorum: `f + 1` of `n = 2f + 1` members.
    pub fn quorum_size(&self) -> usize {
        self.members.len() / 2 + 1
    }

    /// The decision threshold; equal to the quorum size for `n = 2f + 1`.
    pub fn f_plus_one(&self) -> usize {
        self.quorum_size()
    }
}

/// Quorum state notifications delivered by the membership layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuorumEvent {
    /// Enough members are reachable for the protocol to make progress.
    Established,
    /// The reachable set fell below quorum.
    Disappeared,
}

/// Message delivery between cluster members.
///
/// Delivery is asynchronous, best-effort, and at-least-once; duplicates are
/// harmless because every protocol transition is idempotent per
/// `(sender, phase)`. Broadcast does not deliver to the local node; the
/// engine records its own observations directly.
#[async_trait]
pub trait NetworkTransport: Send + Sync + 'static {
    /// Best-effort delivery to every other cluster member.
    async fn broadcast(&self, message: ProtocolMessage) -> Result<()>;

    /// Best-effort delivery to one member.
    async fn send_to(&self, target: &NodeId, message: ProtocolMessage) -> Result<()>;

    /// The next inbound message, together with its sender.
    async fn receive(&self) -> Result<(NodeId, ProtocolMessage)>;
}
