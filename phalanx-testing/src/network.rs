//! In-process cluster transport.
//!
//! A [`NetworkHub`] connects any number of [`InMemoryNetwork`] transports.
//! Delivery is immediate and loss-free unless a node is cut, in which case
//! traffic to and from it is silently dropped, mimicking a partition.

use async_trait::async_trait;
use parking_lot::RwLock;
use phalanx_core::messages::ProtocolMessage;
use phalanx_core::network::NetworkTransport;
use phalanx_core::{NodeId, PhalanxError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

type Inbox = mpsc::UnboundedReceiver<(NodeId, ProtocolMessage)>;
type InboxSender = mpsc::UnboundedSender<(NodeId, ProtocolMessage)>;

#[derive(Default)]
struct HubState {
    peers: HashMap<NodeId, InboxSender>,
    cut: HashSet<NodeId>,
}

/// The shared message fabric of a test cluster.
#[derive(Clone, Default)]
pub struct NetworkHub {
    state: Arc<RwLock<HubState>>,
}

impl NetworkHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node and hand back its transport.
    pub fn join(&self, node_id: NodeId) -> InMemoryNetwork {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.write().peers.insert(node_id.clone(), tx);
        InMemoryNetwork {
            node_id,
            state: self.state.clone(),
            inbox: Mutex::new(rx),
        }
    }

    /// Cut a node off: nothing is delivered to it and its sends go nowhere.
    pub fn disconnect(&self, node_id: &NodeId) {
        self.state.write().cut.insert(node_id.clone());
    }

    /// Undo [`disconnect`](Self::disconnect).
    pub fn reconnect(&self, node_id: &NodeId) {
        self.state.write().cut.remove(node_id);
    }
}

/// One node's view of the hub.
pub struct InMemoryNetwork {
    node_id: NodeId,
    state: Arc<RwLock<HubState>>,
    inbox: Mutex<Inbox>,
}

#[async_trait]
impl NetworkTransport for InMemoryNetwork {
    async fn broadcast(&self, message: ProtocolMessage) -> Result<()> {
        let state = self.state.read();
        if state.cut.contains(&self.node_id) {
            return Ok(());
        }
        for (peer, tx) in &state.peers {
            if peer == &self.node_id || state.cut.contains(peer) {
                continue;
            }
            let _ = tx.send((self.node_id.clone(), message.clone()));
        }
        Ok(())
    }

    async fn send_to(&self, target: &NodeId, message: ProtocolMessage) -> Result<()> {
        let state = self.state.read();
        if state.cut.contains(&self.node_id) || state.cut.contains(target) {
            return Ok(());
        }
        if let Some(tx) = state.peers.get(target) {
            let _ = tx.send((self.node_id.clone(), message));
        }
        Ok(())
    }

    async fn receive(&self) -> Result<(NodeId, ProtocolMessage)> {
        self.inbox
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| PhalanxError::network("network hub closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phalanx_core::Phase;

    #[tokio::test]
    async fn broadcast_reaches_everyone_but_the_sender() {
        let hub = NetworkHub::new();
        let a = hub.join(NodeId::new("a"));
        let b = hub.join(NodeId::new("b"));
        let c = hub.join(NodeId::new("c"));

        a.broadcast(ProtocolMessage::sync_request(NodeId::new("a")))
            .await
            .unwrap();

        let (from, _) = b.receive().await.unwrap();
        assert_eq!(from, NodeId::new("a"));
        let (from, _) = c.receive().await.unwrap();
        assert_eq!(from, NodeId::new("a"));
    }

    #[tokio::test]
    async fn unicast_reaches_only_the_target() {
        let hub = NetworkHub::new();
        let a = hub.join(NodeId::new("a"));
        let b = hub.join(NodeId::new("b"));

        a.send_to(
            &NodeId::new("b"),
            ProtocolMessage::vote_round1(NodeId::new("a"), Phase::ZERO, phalanx_core::StateValue::V0),
        )
        .await
        .unwrap();

        let (from, _) = b.receive().await.unwrap();
        assert_eq!(from, NodeId::new("a"));
    }

    #[tokio::test]
    async fn cut_nodes_neither_send_nor_receive() {
        let hub = NetworkHub::new();
        let a = hub.join(NodeId::new("a"));
        let b = hub.join(NodeId::new("b"));

        hub.disconnect(&NodeId::new("b"));
        a.broadcast(ProtocolMessage::sync_request(NodeId::new("a")))
            .await
            .unwrap();
        b.broadcast(ProtocolMessage::sync_request(NodeId::new("b")))
            .await
            .unwrap();

        // Neither direction delivered anything.
        let b_empty =
            tokio::time::timeout(std::time::Duration::from_millis(50), b.receive()).await;
        assert!(b_empty.is_err());
        let a_empty =
            tokio::time::timeout(std::time::Duration::from_millis(50), a.receive()).await;
        assert!(a_empty.is_err());

        hub.reconnect(&NodeId::new("b"));
        a.broadcast(ProtocolMessage::sync_request(NodeId::new("a")))
            .await
            .unwrap();
        let (from, _) = b.receive().await.unwrap();
        assert_eq!(from, NodeId::new("a"));
    }
}
