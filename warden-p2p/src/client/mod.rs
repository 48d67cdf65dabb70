//! Bridge client.
//!
//! The client owns one session with the local node at a time:
//!
//! ```text
//! Disconnected --connect--> Connecting --HelloAck--> Connected
//! Connected --disconnect--> Disconnecting --transport closed--> Disconnected
//! Connected --transport lost--> Disconnected
//! ```
//!
//! While connected a single reader task pulls frames off the transport,
//! decodes them and hands application messages to the registered handler.
//! Writes from any task go through one mutex-guarded framed writer.

mod handler;
mod state;

pub use handler::MessageHandler;
pub use state::{AtomicState, ConnectionState};

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use warden_core::moderation::normalize_address;
use warden_core::PeerMessage;

use crate::config::{ConnectionConfig, DEFAULT_DRAIN_TIMEOUT, DEFAULT_EVENT_CAPACITY};
use crate::error::{P2pError, P2pResult};
use crate::protocol::{
    complete_handshake, create_hello, FrameCodec, Goodbye, HandshakeResult, RpcMessage,
    SendMessage, VerifyAddressRequest, VerifyAddressResponse,
};
use crate::transport::{BoxedReader, BoxedWriter, Transport};

type FrameReader = FramedRead<BoxedReader, FrameCodec>;
type FrameWriter = FramedWrite<BoxedWriter, FrameCodec>;
type HandlerSlot = Arc<parking_lot::RwLock<Option<Arc<dyn MessageHandler>>>>;

/// Lifecycle notifications published by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Handshake completed.
    Connected {
        /// Identity reported by the node.
        node_id: String,
    },
    /// `disconnect` finished.
    Disconnected,
    /// The transport died while connected. Not retried.
    TransportLost {
        /// What the transport reported.
        reason: String,
    },
    /// An inbound frame was dropped because it could not be decoded.
    DecodeFailed {
        /// Decoder error.
        error: String,
    },
}

/// State shared between the client, its reader task and senders.
struct Shared {
    state: AtomicState,
    writer: tokio::sync::Mutex<Option<FrameWriter>>,
    handler: HandlerSlot,
    events: broadcast::Sender<ClientEvent>,
    node_id: parking_lot::RwLock<Option<String>>,
    transport: Arc<dyn Transport>,
}

impl Shared {
    fn emit(&self, event: ClientEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn send_frame(&self, message: RpcMessage) -> P2pResult<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(P2pError::NotConnected)?;
        tracing::trace!(message = %message, "Sending frame");
        writer.send(message).await.map_err(|e| match e {
            P2pError::Io(io) => P2pError::Send(io.to_string()),
            other => other,
        })
    }

    async fn send_message(&self, to_agent_id: &str, content: &str) -> P2pResult<()> {
        if !self.state.load().is_connected() {
            return Err(P2pError::NotConnected);
        }
        self.send_frame(RpcMessage::SendMessage(SendMessage {
            to_agent_id: to_agent_id.to_string(),
            content: content.to_string(),
        }))
        .await
    }

    async fn dispatch(&self, message: RpcMessage) {
        match message {
            RpcMessage::Inbound(peer_message) => {
                // Read the slot once; a replacement applies from the next frame.
                let handler = self.handler.read().clone();
                match handler {
                    Some(handler) => handler.handle(peer_message).await,
                    None => tracing::debug!(
                        from = %peer_message.from_agent_id,
                        "No handler registered, dropping message"
                    ),
                }
            }
            RpcMessage::VerifyAddressRequest(request) => {
                let response = verify_address(&request);
                if let Err(e) = self
                    .send_frame(RpcMessage::VerifyAddressResponse(response))
                    .await
                {
                    tracing::warn!(request_id = request.request_id, error = %e, "Failed to answer address check");
                }
            }
            RpcMessage::Goodbye(goodbye) => {
                tracing::info!(reason = %goodbye.reason, "Node said goodbye");
            }
            other => {
                tracing::debug!(message = %other, "Ignoring unexpected message from node");
            }
        }
    }

    async fn on_transport_lost(&self, reason: String) {
        if self
            .state
            .transition(ConnectionState::Connected, ConnectionState::Disconnecting)
            .is_err()
        {
            // disconnect() owns the teardown.
            return;
        }

        tracing::warn!(reason = %reason, "Transport lost");
        self.writer.lock().await.take();
        if let Err(e) = self.transport.close().await {
            tracing::debug!(error = %e, "Transport close after loss failed");
        }
        self.node_id.write().take();
        self.state.store(ConnectionState::Disconnected);
        self.emit(ClientEvent::TransportLost { reason });
    }
}

/// Answer a node-originated address check with the moderation format rule.
fn verify_address(request: &VerifyAddressRequest) -> VerifyAddressResponse {
    match normalize_address(&request.address) {
        Ok(normalized) => VerifyAddressResponse {
            request_id: request.request_id,
            is_valid: true,
            normalized_address: normalized,
        },
        Err(_) => VerifyAddressResponse {
            request_id: request.request_id,
            is_valid: false,
            normalized_address: String::new(),
        },
    }
}

async fn read_loop(
    shared: Arc<Shared>,
    mut frames: FrameReader,
    mut lost: BoxFuture<'static, String>,
    mut stop: oneshot::Receiver<()>,
) {
    let reason = loop {
        tokio::select! {
            // Checked between frames only; a dispatch in progress completes.
            _ = &mut stop => return,
            frame = frames.next() => match frame {
                Some(Ok(raw)) => match raw.into_message() {
                    Ok(message) => shared.dispatch(message).await,
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping undecodable frame");
                        shared.emit(ClientEvent::DecodeFailed { error: e.to_string() });
                    }
                },
                Some(Err(e)) => break e.to_string(),
                None => break "connection closed by node".to_string(),
            },
            reason = &mut lost => break reason,
        }
    };
    shared.on_transport_lost(reason).await;
}

/// Cheap cloneable handle for sending through a client.
///
/// Handlers hold one of these to reply to the agent that messaged them.
#[derive(Clone)]
pub struct BridgeSender {
    shared: Arc<Shared>,
}

impl BridgeSender {
    /// Send `content` to `to_agent_id`. Fire-and-forget.
    pub async fn send_message(&self, to_agent_id: &str, content: &str) -> P2pResult<()> {
        self.shared.send_message(to_agent_id, content).await
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state.load()
    }
}

impl std::fmt::Debug for BridgeSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeSender")
            .field("state", &self.state())
            .finish()
    }
}

/// Live session resources owned by the lifecycle lock.
struct Session {
    reader: JoinHandle<()>,
    stop: oneshot::Sender<()>,
}

/// Client for the local P2P node.
pub struct P2pClient {
    shared: Arc<Shared>,
    lifecycle: tokio::sync::Mutex<Option<Session>>,
}

impl P2pClient {
    /// Create a disconnected client over `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                state: AtomicState::new(ConnectionState::Disconnected),
                writer: tokio::sync::Mutex::new(None),
                handler: Arc::new(parking_lot::RwLock::new(None)),
                events,
                node_id: parking_lot::RwLock::new(None),
                transport,
            }),
            lifecycle: tokio::sync::Mutex::new(None),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state.load()
    }

    /// Node id from the last successful handshake, while connected.
    pub fn node_id(&self) -> Option<String> {
        self.shared.node_id.read().clone()
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.shared.events.subscribe()
    }

    /// Handle for sending from other tasks.
    pub fn sender(&self) -> BridgeSender {
        BridgeSender {
            shared: self.shared.clone(),
        }
    }

    /// Register the inbound message handler, replacing any previous one.
    pub fn on_message<H>(&self, handler: H)
    where
        H: MessageHandler + 'static,
    {
        *self.shared.handler.write() = Some(Arc::new(handler));
    }

    /// Open the transport and complete the handshake.
    ///
    /// The whole open plus handshake is bounded by `config.timeout`. Any
    /// failure, including the timeout, closes the transport and leaves the
    /// client `Disconnected`.
    pub async fn connect(&self, config: &ConnectionConfig) -> P2pResult<()> {
        self.shared
            .state
            .transition(ConnectionState::Disconnected, ConnectionState::Connecting)
            .map_err(|state| P2pError::InvalidState {
                operation: "connect",
                state,
            })?;

        let mut session = self.lifecycle.lock().await;
        tracing::info!(agent_id = %config.agent_id, listen_port = config.listen_port, "Connecting to node");

        let outcome = match timeout(config.timeout, self.open_session(config)).await {
            Ok(result) => result,
            Err(_) => Err(P2pError::ConnectTimeout(config.timeout)),
        };

        match outcome {
            Ok((handshake, frames, writer, lost)) => {
                *self.shared.writer.lock().await = Some(writer);
                *self.shared.node_id.write() = Some(handshake.node_id.clone());
                self.shared.state.store(ConnectionState::Connected);

                let (stop, stop_rx) = oneshot::channel();
                let reader = tokio::spawn(read_loop(self.shared.clone(), frames, lost, stop_rx));
                if let Some(previous) = session.replace(Session { reader, stop }) {
                    previous.reader.abort();
                }

                tracing::info!(node_id = %handshake.node_id, "Connected to node");
                self.shared.emit(ClientEvent::Connected {
                    node_id: handshake.node_id,
                });
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Connect failed, closing transport");
                if let Err(close_err) = self.shared.transport.close().await {
                    tracing::debug!(error = %close_err, "Transport close after failed connect");
                }
                self.shared.state.store(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    async fn open_session(
        &self,
        config: &ConnectionConfig,
    ) -> P2pResult<(HandshakeResult, FrameReader, FrameWriter, BoxFuture<'static, String>)> {
        let link = self.shared.transport.open().await?;
        let mut frames = FramedRead::new(link.reader, FrameCodec::new());
        let mut writer = FramedWrite::new(link.writer, FrameCodec::new());

        writer.send(RpcMessage::Hello(create_hello(config))).await?;

        loop {
            match frames.next().await {
                Some(Ok(raw)) => match raw.into_message() {
                    Ok(reply) => {
                        let handshake = complete_handshake(reply)?;
                        return Ok((handshake, frames, writer, link.lost));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping undecodable frame during handshake");
                    }
                },
                Some(Err(e)) => return Err(e),
                None => {
                    return Err(P2pError::TransportLost {
                        reason: "connection closed during handshake".to_string(),
                    })
                }
            }
        }
    }

    /// Send `content` to `to_agent_id`. Fire-and-forget.
    pub async fn send_message(&self, to_agent_id: &str, content: &str) -> P2pResult<()> {
        self.shared.send_message(to_agent_id, content).await
    }

    /// Close the session.
    ///
    /// Stops reading new frames, lets a handler already running finish (so
    /// its reply still goes out), then says goodbye and closes the
    /// transport. A no-op when already `Disconnected`, or when a teardown
    /// is already underway. Fails with [`P2pError::InvalidState`] while
    /// connecting.
    pub async fn disconnect(&self) -> P2pResult<()> {
        match self.shared.state.load() {
            ConnectionState::Connected => {}
            ConnectionState::Disconnected | ConnectionState::Disconnecting => return Ok(()),
            state => {
                return Err(P2pError::InvalidState {
                    operation: "disconnect",
                    state,
                })
            }
        }

        let mut session = self.lifecycle.lock().await;
        tracing::info!("Disconnecting from node");

        if let Some(Session { mut reader, stop }) = session.take() {
            let _ = stop.send(());
            if timeout(DEFAULT_DRAIN_TIMEOUT, &mut reader).await.is_err() {
                tracing::warn!("Handler still running after drain timeout, aborting it");
                reader.abort();
                let _ = reader.await;
            }
        }

        // Another disconnect, or a transport loss seen while draining, may
        // have finished the teardown already.
        match self
            .shared
            .state
            .transition(ConnectionState::Connected, ConnectionState::Disconnecting)
        {
            Ok(()) => {}
            Err(ConnectionState::Disconnected) | Err(ConnectionState::Disconnecting) => {
                return Ok(());
            }
            Err(state) => {
                return Err(P2pError::InvalidState {
                    operation: "disconnect",
                    state,
                })
            }
        }

        let goodbye = RpcMessage::Goodbye(Goodbye {
            reason: "agent disconnecting".to_string(),
        });
        if let Err(e) = self.shared.send_frame(goodbye).await {
            tracing::debug!(error = %e, "Goodbye not delivered");
        }
        if let Some(mut writer) = self.shared.writer.lock().await.take() {
            if let Err(e) = writer.close().await {
                tracing::debug!(error = %e, "Writer shutdown failed");
            }
        }

        let result = self.shared.transport.close().await;
        self.shared.node_id.write().take();
        self.shared.state.store(ConnectionState::Disconnected);
        self.shared.emit(ClientEvent::Disconnected);
        tracing::info!("Disconnected from node");

        result.map_err(|e| P2pError::Disconnect(e.to_string()))
    }
}

impl std::fmt::Debug for P2pClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("P2pClient")
            .field("state", &self.state())
            .field("node_id", &self.node_id())
            .finish()
    }
}
