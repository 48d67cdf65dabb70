//! Bridge RPC messages.
//!
//! Every frame carries one message. The frame's kind byte selects the
//! schema and the payload holds the message fields in the tag/value
//! encoding from [`warden_core::wire`].

use warden_core::wire::{FieldWriter, WireMessage, WireValue};
use warden_core::{DecodeError, PeerMessage};

/// Frame kind bytes.
pub mod kind {
    /// [`Hello`](super::Hello)
    pub const HELLO: u8 = 1;
    /// [`HelloAck`](super::HelloAck)
    pub const HELLO_ACK: u8 = 2;
    /// [`SendMessage`](super::SendMessage)
    pub const SEND_MESSAGE: u8 = 3;
    /// Inbound [`PeerMessage`](warden_core::PeerMessage)
    pub const INBOUND: u8 = 4;
    /// [`VerifyAddressRequest`](super::VerifyAddressRequest)
    pub const VERIFY_ADDRESS_REQUEST: u8 = 5;
    /// [`VerifyAddressResponse`](super::VerifyAddressResponse)
    pub const VERIFY_ADDRESS_RESPONSE: u8 = 6;
    /// [`Goodbye`](super::Goodbye)
    pub const GOODBYE: u8 = 7;
}

/// Sent by the agent to open a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hello {
    /// Identity the agent announces to the network.
    pub agent_id: String,
    /// Port the node should listen on for peers.
    pub listen_port: u32,
    /// Agent's protocol version.
    pub protocol_version: u32,
}

/// Node's acceptance of a [`Hello`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelloAck {
    /// Network identity assigned by the node.
    pub node_id: String,
    /// Node's protocol version.
    pub protocol_version: u32,
}

/// Outbound application message addressed to another agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendMessage {
    /// Recipient agent id.
    pub to_agent_id: String,
    /// Message body.
    pub content: String,
}

/// Node asks the agent to check an address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyAddressRequest {
    /// Correlates the response.
    pub request_id: u64,
    /// Address to check.
    pub address: String,
}

/// Agent's answer to a [`VerifyAddressRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyAddressResponse {
    /// Copied from the request.
    pub request_id: u64,
    /// Whether the address is well formed.
    pub is_valid: bool,
    /// Lower-cased address, empty when invalid.
    pub normalized_address: String,
}

/// Either side announces it is closing the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Goodbye {
    /// Free-form reason.
    pub reason: String,
}

fn merge_string(target: &mut String, field: u32, value: WireValue<'_>) -> Result<(), DecodeError> {
    if let Some(s) = value.as_string(field)? {
        *target = s;
    }
    Ok(())
}

fn merge_u32(target: &mut u32, field: u32, value: WireValue<'_>) -> Result<(), DecodeError> {
    if let Some(v) = value.as_u32(field)? {
        *target = v;
    }
    Ok(())
}

impl WireMessage for Hello {
    fn encode_fields(&self, writer: &mut FieldWriter) {
        writer.put_string(1, &self.agent_id);
        writer.put_u32(2, self.listen_port);
        writer.put_u32(3, self.protocol_version);
    }

    fn merge_field(&mut self, field: u32, value: WireValue<'_>) -> Result<(), DecodeError> {
        match field {
            1 => merge_string(&mut self.agent_id, field, value),
            2 => merge_u32(&mut self.listen_port, field, value),
            3 => merge_u32(&mut self.protocol_version, field, value),
            _ => Ok(()),
        }
    }
}

impl WireMessage for HelloAck {
    fn encode_fields(&self, writer: &mut FieldWriter) {
        writer.put_string(1, &self.node_id);
        writer.put_u32(2, self.protocol_version);
    }

    fn merge_field(&mut self, field: u32, value: WireValue<'_>) -> Result<(), DecodeError> {
        match field {
            1 => merge_string(&mut self.node_id, field, value),
            2 => merge_u32(&mut self.protocol_version, field, value),
            _ => Ok(()),
        }
    }
}

impl WireMessage for SendMessage {
    fn encode_fields(&self, writer: &mut FieldWriter) {
        writer.put_string(1, &self.to_agent_id);
        writer.put_string(2, &self.content);
    }

    fn merge_field(&mut self, field: u32, value: WireValue<'_>) -> Result<(), DecodeError> {
        match field {
            1 => merge_string(&mut self.to_agent_id, field, value),
            2 => merge_string(&mut self.content, field, value),
            _ => Ok(()),
        }
    }
}

impl WireMessage for VerifyAddressRequest {
    fn encode_fields(&self, writer: &mut FieldWriter) {
        writer.put_u64(1, self.request_id);
        writer.put_string(2, &self.address);
    }

    fn merge_field(&mut self, field: u32, value: WireValue<'_>) -> Result<(), DecodeError> {
        match field {
            1 => {
                if let Some(v) = value.as_u64() {
                    self.request_id = v;
                }
                Ok(())
            }
            2 => merge_string(&mut self.address, field, value),
            _ => Ok(()),
        }
    }
}

impl WireMessage for VerifyAddressResponse {
    fn encode_fields(&self, writer: &mut FieldWriter) {
        writer.put_u64(1, self.request_id);
        writer.put_bool(2, self.is_valid);
        writer.put_string(3, &self.normalized_address);
    }

    fn merge_field(&mut self, field: u32, value: WireValue<'_>) -> Result<(), DecodeError> {
        match field {
            1 => {
                if let Some(v) = value.as_u64() {
                    self.request_id = v;
                }
                Ok(())
            }
            2 => {
                if let Some(v) = value.as_bool() {
                    self.is_valid = v;
                }
                Ok(())
            }
            3 => merge_string(&mut self.normalized_address, field, value),
            _ => Ok(()),
        }
    }
}

impl WireMessage for Goodbye {
    fn encode_fields(&self, writer: &mut FieldWriter) {
        writer.put_string(1, &self.reason);
    }

    fn merge_field(&mut self, field: u32, value: WireValue<'_>) -> Result<(), DecodeError> {
        match field {
            1 => merge_string(&mut self.reason, field, value),
            _ => Ok(()),
        }
    }
}

/// All bridge RPC messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcMessage {
    // Session
    /// Agent opens a session.
    Hello(Hello),
    /// Node accepts the session.
    HelloAck(HelloAck),
    /// Either side closes the session.
    Goodbye(Goodbye),

    // Application traffic
    /// Agent sends to a remote agent.
    SendMessage(SendMessage),
    /// Node delivers a message from a remote agent.
    Inbound(PeerMessage),

    // Address verification service
    /// Node asks the agent to check an address.
    VerifyAddressRequest(VerifyAddressRequest),
    /// Agent answers an address check.
    VerifyAddressResponse(VerifyAddressResponse),
}

impl RpcMessage {
    /// Frame kind byte for this message.
    pub fn kind(&self) -> u8 {
        match self {
            RpcMessage::Hello(_) => kind::HELLO,
            RpcMessage::HelloAck(_) => kind::HELLO_ACK,
            RpcMessage::SendMessage(_) => kind::SEND_MESSAGE,
            RpcMessage::Inbound(_) => kind::INBOUND,
            RpcMessage::VerifyAddressRequest(_) => kind::VERIFY_ADDRESS_REQUEST,
            RpcMessage::VerifyAddressResponse(_) => kind::VERIFY_ADDRESS_RESPONSE,
            RpcMessage::Goodbye(_) => kind::GOODBYE,
        }
    }

    /// Get a human-readable name for the message type.
    pub fn name(&self) -> &'static str {
        match self {
            RpcMessage::Hello(_) => "hello",
            RpcMessage::HelloAck(_) => "hello_ack",
            RpcMessage::SendMessage(_) => "send_message",
            RpcMessage::Inbound(_) => "inbound",
            RpcMessage::VerifyAddressRequest(_) => "verify_address_request",
            RpcMessage::VerifyAddressResponse(_) => "verify_address_response",
            RpcMessage::Goodbye(_) => "goodbye",
        }
    }

    /// Encode the message fields, without framing.
    pub fn encode_payload(&self) -> Vec<u8> {
        match self {
            RpcMessage::Hello(m) => m.encode_to_vec(),
            RpcMessage::HelloAck(m) => m.encode_to_vec(),
            RpcMessage::SendMessage(m) => m.encode_to_vec(),
            RpcMessage::Inbound(m) => m.encode_to_vec(),
            RpcMessage::VerifyAddressRequest(m) => m.encode_to_vec(),
            RpcMessage::VerifyAddressResponse(m) => m.encode_to_vec(),
            RpcMessage::Goodbye(m) => m.encode_to_vec(),
        }
    }

    /// Decode a payload given its frame kind.
    pub fn decode(kind: u8, payload: &[u8]) -> Result<Self, DecodeError> {
        let message = match kind {
            kind::HELLO => RpcMessage::Hello(Hello::decode(payload)?),
            kind::HELLO_ACK => RpcMessage::HelloAck(HelloAck::decode(payload)?),
            kind::SEND_MESSAGE => RpcMessage::SendMessage(SendMessage::decode(payload)?),
            kind::INBOUND => RpcMessage::Inbound(PeerMessage::decode(payload)?),
            kind::VERIFY_ADDRESS_REQUEST => {
                RpcMessage::VerifyAddressRequest(VerifyAddressRequest::decode(payload)?)
            }
            kind::VERIFY_ADDRESS_RESPONSE => {
                RpcMessage::VerifyAddressResponse(VerifyAddressResponse::decode(payload)?)
            }
            kind::GOODBYE => RpcMessage::Goodbye(Goodbye::decode(payload)?),
            other => return Err(DecodeError::UnknownMessageKind(other)),
        };
        Ok(message)
    }
}

impl std::fmt::Display for RpcMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcMessage::Hello(h) => write!(
                f,
                "Hello(agent={}, port={}, version={})",
                h.agent_id, h.listen_port, h.protocol_version
            ),
            RpcMessage::HelloAck(a) => {
                write!(f, "HelloAck(node={}, version={})", a.node_id, a.protocol_version)
            }
            RpcMessage::SendMessage(m) => {
                write!(f, "SendMessage(to={}, len={})", m.to_agent_id, m.content.len())
            }
            RpcMessage::Inbound(m) => {
                write!(f, "Inbound(from={}, len={})", m.from_agent_id, m.content.len())
            }
            RpcMessage::VerifyAddressRequest(r) => {
                write!(f, "VerifyAddressRequest(id={})", r.request_id)
            }
            RpcMessage::VerifyAddressResponse(r) => write!(
                f,
                "VerifyAddressResponse(id={}, valid={})",
                r.request_id, r.is_valid
            ),
            RpcMessage::Goodbye(g) => write!(f, "Goodbye({})", g.reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<RpcMessage> {
        vec![
            RpcMessage::Hello(Hello {
                agent_id: "agent-1".into(),
                listen_port: 8000,
                protocol_version: 1,
            }),
            RpcMessage::HelloAck(HelloAck {
                node_id: "node-xyz".into(),
                protocol_version: 1,
            }),
            RpcMessage::SendMessage(SendMessage {
                to_agent_id: "agent-2".into(),
                content: "{\"status\":\"success\"}".into(),
            }),
            RpcMessage::Inbound(PeerMessage::new("agent-3", "hello")),
            RpcMessage::VerifyAddressRequest(VerifyAddressRequest {
                request_id: u64::MAX,
                address: "0xabc".into(),
            }),
            RpcMessage::VerifyAddressResponse(VerifyAddressResponse {
                request_id: 9,
                is_valid: true,
                normalized_address: "0xabc".into(),
            }),
            RpcMessage::Goodbye(Goodbye { reason: "shutdown".into() }),
            // All-default payloads encode to zero bytes.
            RpcMessage::Goodbye(Goodbye::default()),
            RpcMessage::VerifyAddressResponse(VerifyAddressResponse::default()),
        ]
    }

    #[test]
    fn test_every_kind_round_trips() {
        for message in samples() {
            let payload = message.encode_payload();
            let decoded = RpcMessage::decode(message.kind(), &payload).unwrap();
            assert_eq!(decoded, message, "round trip of {}", message.name());
        }
    }

    #[test]
    fn test_hello_known_bytes() {
        let hello = Hello {
            agent_id: "a".into(),
            listen_port: 8000,
            protocol_version: 1,
        };
        // 0x0A len=1 'a' | 0x10 varint 8000 | 0x18 01
        assert_eq!(
            hello.encode_to_vec(),
            vec![0x0A, 0x01, b'a', 0x10, 0xC0, 0x3E, 0x18, 0x01]
        );
    }

    #[test]
    fn test_zero_fields_suppressed() {
        let response = VerifyAddressResponse {
            request_id: 0,
            is_valid: false,
            normalized_address: String::new(),
        };
        assert!(response.encode_to_vec().is_empty());
    }

    #[test]
    fn test_unknown_kind() {
        assert_eq!(
            RpcMessage::decode(42, &[]),
            Err(DecodeError::UnknownMessageKind(42))
        );
    }

    #[test]
    fn test_unknown_field_is_skipped() {
        let mut payload = SendMessage {
            to_agent_id: "b".into(),
            content: "c".into(),
        }
        .encode_to_vec();
        // field 15, length-delimited, 3 bytes
        payload.extend_from_slice(&[0x7A, 0x03, 1, 2, 3]);
        let decoded = RpcMessage::decode(kind::SEND_MESSAGE, &payload).unwrap();
        assert_eq!(
            decoded,
            RpcMessage::SendMessage(SendMessage {
                to_agent_id: "b".into(),
                content: "c".into(),
            })
        );
    }

    #[test]
    fn test_truncated_payload() {
        let payload = Hello {
            agent_id: "agent".into(),
            ..Default::default()
        }
        .encode_to_vec();
        let cut = &payload[..payload.len() - 1];
        assert_eq!(RpcMessage::decode(kind::HELLO, cut), Err(DecodeError::Truncated));
    }

    #[test]
    fn test_display() {
        let msg = RpcMessage::Goodbye(Goodbye { reason: "bye".into() });
        assert_eq!(format!("{}", msg), "Goodbye(bye)");
        assert_eq!(msg.name(), "goodbye");
    }
}
