//! Moderation handler for inbound peer messages.

use std::sync::Arc;

use async_trait::async_trait;
use warden_core::{moderate, BlacklistSet, PeerMessage};
use warden_p2p::{BridgeSender, MessageHandler};

/// Replies to every inbound message with its moderation verdict as JSON.
pub struct ModerationAgent {
    blacklist: Arc<BlacklistSet>,
    sender: BridgeSender,
}

impl ModerationAgent {
    /// Create an agent replying through `sender`.
    pub fn new(blacklist: Arc<BlacklistSet>, sender: BridgeSender) -> Self {
        Self { blacklist, sender }
    }
}

#[async_trait]
impl MessageHandler for ModerationAgent {
    async fn handle(&self, message: PeerMessage) {
        tracing::info!(
            from = %message.from_agent_id,
            content = %message.content,
            "Got message"
        );

        let result = moderate(&message.content, &self.blacklist);
        if !result.is_success() {
            tracing::debug!(from = %message.from_agent_id, "Rejected malformed address");
        }

        if let Err(e) = self
            .sender
            .send_message(&message.from_agent_id, &result.to_json())
            .await
        {
            tracing::error!(
                to = %message.from_agent_id,
                error = %e,
                "Failed to send moderation reply"
            );
        }
    }
}
