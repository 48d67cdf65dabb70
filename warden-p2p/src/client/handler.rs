//! Inbound message handlers.

use std::future::Future;

use async_trait::async_trait;
use warden_core::PeerMessage;

/// Receives application messages from remote agents.
///
/// The client awaits each call before reading the next frame, so a handler
/// sees messages one at a time in arrival order.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle one inbound message.
    async fn handle(&self, message: PeerMessage);
}

#[async_trait]
impl<F, Fut> MessageHandler for F
where
    F: Fn(PeerMessage) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, message: PeerMessage) {
        (self)(message).await
    }
}
