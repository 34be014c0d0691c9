//! Encoding helpers for the transport boundary.
//!
//! The engine itself never touches bytes; transports pick a codec and use
//! it on both ends.

use crate::{PhalanxError, Result};
use serde::{Deserialize, Serialize};

/// A wire encoding for protocol messages and saved state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Human-readable; handy for debugging captures.
    Json,
    /// Compact binary; the default.
    Binary,
}

impl Default for Codec {
    fn default() -> Self {
        Self::Binary
    }
}

impl Codec {
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            Self::Json => serde_json::to_vec(value).map_err(PhalanxError::from),
            Self::Binary => bincode::serialize(value)
                .map_err(|e| PhalanxError::internal(format!("binary encoding failed: {e}"))),
        }
    }

    pub fn decode<T: for<'de> Deserialize<'de>>(&self, bytes: &[u8]) -> Result<T> {
        match self {
            Self::Json => serde_json::from_slice(bytes).map_err(PhalanxError::from),
            Self::Binary => bincode::deserialize(bytes)
                .map_err(|e| PhalanxError::internal(format!("binary decoding failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{MessagePayload, ProtocolMessage};
    use crate::{Command, CommandBatch, NodeId, Phase};

    #[test]
    fn both_codecs_round_trip_messages() {
        let msg = ProtocolMessage::propose(
            NodeId::new("n1"),
            Phase::new(4),
            CommandBatch::new(vec![Command::new("SET k v")]),
        );

        for codec in [Codec::Json, Codec::Binary] {
            let bytes = codec.encode(&msg).unwrap();
            let decoded: ProtocolMessage = codec.decode(&bytes).unwrap();
            assert_eq!(decoded.from, msg.from);
            match (&decoded.payload, &msg.payload) {
                (MessagePayload::Propose(a), MessagePayload::Propose(b)) => {
                    assert_eq!(a.phase, b.phase);
                    assert_eq!(a.batch, b.batch);
                }
                _ => panic!("payload kind changed in transit"),
            }
        }
    }

    #[test]
    fn garbage_input_is_an_error() {
        let garbage = [0xff_u8, 0x00, 0x13, 0x37];
        assert!(Codec::Json.decode::<ProtocolMessage>(&garbage).is_err());
        assert!(Codec::Binary.decode::<ProtocolMessage>(&garbage).is_err());
    }
}
