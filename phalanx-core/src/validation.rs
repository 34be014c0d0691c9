//! Structural validation of inbound protocol messages.

use crate::messages::{MessagePayload, ProtocolMessage};
use crate::{CommandBatch, PhalanxError, Result};

/// Maximum accepted size of a single command payload.
const MAX_COMMAND_SIZE: usize = 1024 * 1024;

pub trait Validator {
    fn validate(&self) -> Result<()>;
}

impl Validator for CommandBatch {
    fn validate(&self) -> Result<()> {
        if self.commands.is_empty() && !self.correlation_id.is_nil() {
            return Err(PhalanxError::internal(
                "batch without commands must be the canonical empty batch",
            ));
        }
        for command in &self.commands {
            if command.data.len() > MAX_COMMAND_SIZE {
                return Err(PhalanxError::internal(format!(
                    "command {} exceeds {} bytes",
                    command.id, MAX_COMMAND_SIZE
                )));
            }
        }
        Ok(())
    }
}

impl Validator for ProtocolMessage {
    fn validate(&self) -> Result<()> {
        match &self.payload {
            MessagePayload::NewBatch(msg) => {
                // Gossip of an empty batch is meaningless.
                if msg.batch.is_empty() {
                    return Err(PhalanxError::EmptyCommandBatch);
                }
                msg.batch.validate()
            }
            MessagePayload::Propose(msg) => msg.batch.validate(),
            MessagePayload::VoteRound1(msg) => {
                if !msg.value.is_definite() {
                    return Err(PhalanxError::internal(
                        "round-1 vote must be V0 or V1",
                    ));
                }
                Ok(())
            }
            MessagePayload::VoteRound2(_) => Ok(()),
            MessagePayload::Decision(msg) => {
                if !msg.value.is_definite() {
                    return Err(PhalanxError::internal("decision must be V0 or V1"));
                }
                msg.batch.validate()
            }
            MessagePayload::SyncRequest => Ok(()),
            MessagePayload::SyncResponse(msg) => {
                for batch in &msg.saved.pending_batches {
                    batch.validate()?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Command, NodeId, Phase, StateValue};

    #[test]
    fn round1_vote_must_be_definite() {
        let ok = ProtocolMessage::vote_round1(NodeId::new("n1"), Phase::ZERO, StateValue::V1);
        assert!(ok.validate().is_ok());

        let bad =
            ProtocolMessage::vote_round1(NodeId::new("n1"), Phase::ZERO, StateValue::VQuestion);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn round2_vote_may_abstain() {
        let msg =
            ProtocolMessage::vote_round2(NodeId::new("n1"), Phase::ZERO, StateValue::VQuestion);
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn empty_batch_gossip_is_rejected() {
        let msg = ProtocolMessage::new_batch(NodeId::new("n1"), CommandBatch::empty());
        assert!(msg.validate().is_err());
    }

    #[test]
    fn empty_proposal_is_accepted() {
        let msg = ProtocolMessage::propose(NodeId::new("n1"), Phase::ZERO, CommandBatch::empty());
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn decision_must_be_definite() {
        let msg = ProtocolMessage::decision(
            NodeId::new("n1"),
            Phase::ZERO,
            StateValue::VQuestion,
            CommandBatch::empty(),
        );
        assert!(msg.validate().is_err());

        let ok = ProtocolMessage::decision(
            NodeId::new("n1"),
            Phase::ZERO,
            StateValue::V1,
            CommandBatch::new(vec![Command::new("SET k v")]),
        );
        assert!(ok.validate().is_ok());
    }
}
