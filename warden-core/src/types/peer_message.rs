//! Messages delivered from remote agents.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::wire::{FieldWriter, WireMessage, WireValue};

/// A message received from another agent on the P2P network.
///
/// Produced by the bridge for each inbound frame and handed to the
/// registered handler. Fields are fixed once constructed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerMessage {
    /// Agent id of the sender, used as the reply address.
    pub from_agent_id: String,
    /// Raw message body.
    pub content: String,
}

impl PeerMessage {
    /// Create a new peer message.
    pub fn new(from_agent_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            from_agent_id: from_agent_id.into(),
            content: content.into(),
        }
    }
}

impl WireMessage for PeerMessage {
    fn encode_fields(&self, writer: &mut FieldWriter) {
        writer.put_string(1, &self.from_agent_id);
        writer.put_string(2, &self.content);
    }

    fn merge_field(&mut self, field: u32, value: WireValue<'_>) -> Result<(), DecodeError> {
        match field {
            1 => {
                if let Some(s) = value.as_string(field)? {
                    self.from_agent_id = s;
                }
            }
            2 => {
                if let Some(s) = value.as_string(field)? {
                    self.content = s;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
