//! The two-lane execution model.
//!
//! Everything that advances the phase (vote handling, decisions, phase
//! starts, lifecycle changes) is funneled through one serial critical
//! worker fed by a bounded queue. Gossip handling and network sends run on
//! the shared tokio pool and may only enqueue work for the critical worker,
//! never perform critical transitions themselves.

use phalanx_core::messages::ProtocolMessage;
use phalanx_core::network::QuorumEvent;
use phalanx_core::{NodeId, PhalanxError, Result};
use std::future::Future;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

/// Work items processed serially by the critical worker.
#[derive(Debug)]
pub enum CriticalTask {
    /// Propose the best pending batch in the current phase.
    StartPhase,
    /// A protocol message on the ordering-critical path. Locally produced
    /// votes and decisions are looped back through here as well.
    Inbound {
        from: NodeId,
        message: ProtocolMessage,
    },
    /// Quorum state change reported by the membership layer.
    QuorumChanged(QuorumEvent),
    /// Drain and terminate the worker.
    Stop,
}

/// Submission handle for the critical worker's queue.
#[derive(Clone)]
pub struct Executor {
    tx: mpsc::Sender<CriticalTask>,
}

impl Executor {
    pub fn new(depth: usize) -> (Self, mpsc::Receiver<CriticalTask>) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue a task for the critical worker. A full queue is unrecoverable
    /// for the engine and is surfaced as an error here.
    pub fn submit(&self, task: CriticalTask) -> Result<()> {
        self.tx.try_send(task).map_err(|e| match e {
            TrySendError::Full(_) => PhalanxError::internal("critical queue exhausted"),
            TrySendError::Closed(_) => PhalanxError::internal("critical worker stopped"),
        })
    }

    /// Run fast-path work on the shared pool.
    pub fn spawn_parallel<F>(future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phalanx_core::Phase;

    #[tokio::test]
    async fn tasks_drain_in_submission_order() {
        let (executor, mut rx) = Executor::new(8);
        executor.submit(CriticalTask::StartPhase).unwrap();
        executor
            .submit(CriticalTask::Inbound {
                from: NodeId::new("n1"),
                message: ProtocolMessage::sync_request(NodeId::new("n1")),
            })
            .unwrap();
        executor.submit(CriticalTask::Stop).unwrap();

        assert!(matches!(rx.recv().await, Some(CriticalTask::StartPhase)));
        assert!(matches!(rx.recv().await, Some(CriticalTask::Inbound { .. })));
        assert!(matches!(rx.recv().await, Some(CriticalTask::Stop)));
    }

    #[tokio::test]
    async fn full_queue_is_an_error() {
        let (executor, _rx) = Executor::new(1);
        executor.submit(CriticalTask::StartPhase).unwrap();
        let err = executor.submit(CriticalTask::StartPhase).unwrap_err();
        assert!(err.to_string().contains("critical queue exhausted"));
    }

    #[tokio::test]
    async fn closed_queue_is_an_error() {
        let (executor, rx) = Executor::new(1);
        drop(rx);
        let err = executor
            .submit(CriticalTask::Inbound {
                from: NodeId::new("n1"),
                message: ProtocolMessage::vote_round1(
                    NodeId::new("n1"),
                    Phase::ZERO,
                    phalanx_core::StateValue::V0,
                ),
            })
            .unwrap_err();
        assert!(err.to_string().contains("critical worker stopped"));
    }
}
