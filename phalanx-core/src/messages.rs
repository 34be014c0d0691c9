//! The protocol message catalogue.
//!
//! Every message travels inside a [`ProtocolMessage`] envelope carrying the
//! sender, an optional unicast target (`None` for broadcast), and a
//! creation timestamp.

use crate::persistence::SavedState;
use crate::{CommandBatch, NodeId, Phase, StateValue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolMessage {
    pub id: uuid::Uuid,
    pub from: NodeId,
    pub to: Option<NodeId>,
    pub timestamp: u64,
    pub payload: MessagePayload,
}

impl ProtocolMessage {
    pub fn new(from: NodeId, to: Option<NodeId>, payload: MessagePayload) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            from,
            to,
            timestamp: crate::types::now_millis(),
            payload,
        }
    }

    pub fn new_batch(from: NodeId, batch: CommandBatch) -> Self {
        Self::new(from, None, MessagePayload::NewBatch(NewBatchMessage { batch }))
    }

    pub fn propose(from: NodeId, phase: Phase, batch: CommandBatch) -> Self {
        Self::new(
            from,
            None,
            MessagePayload::Propose(ProposeMessage { phase, batch }),
        )
    }

    pub fn vote_round1(from: NodeId, phase: Phase, value: StateValue) -> Self {
        Self::new(
            from,
            None,
            MessagePayload::VoteRound1(VoteRound1Message { phase, value }),
        )
    }

    pub fn vote_round2(from: NodeId, phase: Phase, value: StateValue) -> Self {
        Self::new(
            from,
            None,
            MessagePayload::VoteRound2(VoteRound2Message { phase, value }),
        )
    }

    pub fn decision(from: NodeId, phase: Phase, value: StateValue, batch: CommandBatch) -> Self {
        Self::new(
            from,
            None,
            MessagePayload::Decision(DecisionMessage {
                phase,
                value,
                batch,
            }),
        )
    }

    pub fn sync_request(from: NodeId) -> Self {
        Self::new(from, None, MessagePayload::SyncRequest)
    }

    pub fn sync_response(from: NodeId, to: NodeId, saved: SavedState) -> Self {
        Self::new(
            from,
            Some(to),
            MessagePayload::SyncResponse(SyncResponseMessage { saved }),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MessagePayload {
    /// Gossip of a freshly submitted batch.
    NewBatch(NewBatchMessage),
    /// The sender's proposal for a phase.
    Propose(ProposeMessage),
    /// Round-1 vote; the value is always definite.
    VoteRound1(VoteRound1Message),
    /// Round-2 vote; `VQuestion` marks abstention.
    VoteRound2(VoteRound2Message),
    /// A committed outcome for a phase.
    Decision(DecisionMessage),
    /// A dormant replica asking peers for their saved state.
    SyncRequest,
    /// Reply to a sync request.
    SyncResponse(SyncResponseMessage),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBatchMessage {
    pub batch: CommandBatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeMessage {
    pub phase: Phase,
    pub batch: CommandBatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRound1Message {
    pub phase: Phase,
    pub value: StateValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRound2Message {
    pub phase: Phase,
    pub value: StateValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionMessage {
    pub phase: Phase,
    pub value: StateValue,
    pub batch: CommandBatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponseMessage {
    pub saved: SavedState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Command;

    #[test]
    fn broadcast_messages_have_no_target() {
        let from = NodeId::new("n1");
        let msg = ProtocolMessage::propose(
            from.clone(),
            Phase::ZERO,
            CommandBatch::new(vec![Command::new("SET k v")]),
        );
        assert_eq!(msg.from, from);
        assert!(msg.to.is_none());
        assert!(matches!(msg.payload, MessagePayload::Propose(_)));
    }

    #[test]
    fn sync_response_is_unicast() {
        let msg = ProtocolMessage::sync_response(
            NodeId::new("n1"),
            NodeId::new("n2"),
            SavedState::initial(),
        );
        assert_eq!(msg.to, Some(NodeId::new("n2")));
    }
}
