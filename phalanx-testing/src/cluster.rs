//! An in-process cluster of consensus engines wired over the network hub.

use crate::network::{InMemoryNetwork, NetworkHub};
use anyhow::Context;
use bytes::Bytes;
use phalanx_core::network::{ClusterConfig, QuorumEvent};
use phalanx_core::state_machine::InMemoryStateMachine;
use phalanx_core::{Command, NodeId, Result};
use phalanx_engine::{ConsensusEngine, EngineConfig, EngineStatistics};
use phalanx_persistence::InMemoryPersistence;
use std::time::Duration;

pub type TestEngine = ConsensusEngine<InMemoryStateMachine, InMemoryNetwork, InMemoryPersistence>;

pub struct ClusterNode {
    pub id: NodeId,
    pub engine: TestEngine,
}

pub struct TestCluster {
    hub: NetworkHub,
    pub nodes: Vec<ClusterNode>,
}

impl TestCluster {
    /// Boot `size` engines over a shared hub, start them, and report an
    /// established quorum to each. The engines begin resynchronizing
    /// immediately; await [`wait_all_started`](Self::wait_all_started)
    /// before submitting work.
    pub fn launch(size: usize, config: EngineConfig) -> Self {
        let hub = NetworkHub::new();
        let ids: Vec<NodeId> = (0..size).map(|i| NodeId::new(format!("node-{i}"))).collect();

        let nodes = ids
            .iter()
            .map(|id| {
                let transport = hub.join(id.clone());
                let cluster = ClusterConfig::new(id.clone(), ids.iter().cloned());
                let engine = ConsensusEngine::new(
                    cluster,
                    config.clone(),
                    InMemoryStateMachine::new(),
                    transport,
                    InMemoryPersistence::new(),
                );
                engine.start();
                engine.notify_quorum(QuorumEvent::Established);
                ClusterNode {
                    id: id.clone(),
                    engine,
                }
            })
            .collect();

        Self { hub, nodes }
    }

    pub async fn wait_all_started(&self) -> anyhow::Result<()> {
        for node in &self.nodes {
            tokio::time::timeout(Duration::from_secs(5), node.engine.wait_started())
                .await
                .with_context(|| format!("node {} did not activate", node.id))?;
        }
        Ok(())
    }

    /// Submit commands through one node and await the committed results.
    pub async fn apply(&self, node: usize, commands: Vec<Command>) -> Result<Vec<Bytes>> {
        self.nodes[node].engine.apply(commands).await
    }

    pub fn statistics(&self, node: usize) -> EngineStatistics {
        self.nodes[node].engine.statistics()
    }

    /// Partition one node away from the rest and tell it quorum is gone.
    pub fn disconnect(&self, node: usize) {
        self.hub.disconnect(&self.nodes[node].id);
        self.nodes[node]
            .engine
            .notify_quorum(QuorumEvent::Disappeared);
    }

    /// Heal the partition and tell the node quorum is back.
    pub fn reconnect(&self, node: usize) {
        self.hub.reconnect(&self.nodes[node].id);
        self.nodes[node]
            .engine
            .notify_quorum(QuorumEvent::Established);
    }

    pub async fn stop_all(&self) {
        for node in &self.nodes {
            node.engine.stop().await;
        }
    }
}
