//! Session handshake.
//!
//! The handshake protocol:
//! 1. Agent sends `Hello` with its agent id, listen port and protocol version
//! 2. Node replies `HelloAck` with its node id and protocol version
//! 3. The session is open once a compatible `HelloAck` arrives
//!
//! The node may refuse by replying `Goodbye` instead.

use crate::config::{ConnectionConfig, PROTOCOL_VERSION};
use crate::error::{P2pError, P2pResult};
use crate::protocol::{Hello, HelloAck, RpcMessage};

/// Create the hello message for a session.
pub fn create_hello(config: &ConnectionConfig) -> Hello {
    Hello {
        agent_id: config.agent_id.clone(),
        listen_port: u32::from(config.listen_port),
        protocol_version: PROTOCOL_VERSION,
    }
}

/// Validate a received hello acknowledgement.
pub fn validate_hello_ack(ack: &HelloAck) -> P2pResult<()> {
    // For now, require exact match
    if ack.protocol_version != PROTOCOL_VERSION {
        return Err(P2pError::IncompatibleVersion {
            peer_version: ack.protocol_version,
            our_version: PROTOCOL_VERSION,
        });
    }
    Ok(())
}

/// Result of a completed handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResult {
    /// Identity the node reported.
    pub node_id: String,
    /// Protocol version agreed upon.
    pub protocol_version: u32,
}

impl From<HelloAck> for HandshakeResult {
    fn from(ack: HelloAck) -> Self {
        Self {
            node_id: ack.node_id,
            protocol_version: ack.protocol_version,
        }
    }
}

/// Interpret the first message received after `Hello`.
pub fn complete_handshake(reply: RpcMessage) -> P2pResult<HandshakeResult> {
    match reply {
        RpcMessage::HelloAck(ack) => {
            validate_hello_ack(&ack)?;
            Ok(HandshakeResult::from(ack))
        }
        RpcMessage::Goodbye(bye) => Err(P2pError::HandshakeFailed(format!(
            "node refused session: {}",
            bye.reason
        ))),
        other => Err(P2pError::HandshakeFailed(format!(
            "expected hello_ack, got {}",
            other.name()
        ))),
    }
}
