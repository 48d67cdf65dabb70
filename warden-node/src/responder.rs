//! Chat response generation.

use std::sync::Arc;

use async_trait::async_trait;
use warden_core::{moderate, validate_format, BlacklistSet};

/// Produces the reply text for a chat prompt.
#[async_trait]
pub trait ChatResponder: Send + Sync {
    /// Answer `prompt`.
    async fn respond(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Answers with the moderation verdict for the first address in the prompt.
#[derive(Debug, Clone)]
pub struct ModerationResponder {
    blacklist: Arc<BlacklistSet>,
}

impl ModerationResponder {
    /// Create a responder over `blacklist`.
    pub fn new(blacklist: Arc<BlacklistSet>) -> Self {
        Self { blacklist }
    }
}

/// First whitespace or punctuation separated token that is a valid address.
fn find_address(prompt: &str) -> Option<&str> {
    prompt
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | ';' | ':' | '"' | '\'' | '(' | ')' | '?' | '!'))
        .find(|token| validate_format(token))
}

#[async_trait]
impl ChatResponder for ModerationResponder {
    async fn respond(&self, prompt: &str) -> anyhow::Result<String> {
        let Some(address) = find_address(prompt) else {
            return Ok(
                "I can check Ethereum addresses against the blacklist. \
                 Send an address written as 0x followed by 40 hex characters."
                    .to_string(),
            );
        };

        let result = moderate(address, &self.blacklist);
        let reply = if result.is_blacklisted {
            format!("The address {} is blacklisted.", address)
        } else {
            format!("The address {} is not blacklisted.", address)
        };
        Ok(reply)
    }
}
