//! P2P message bridge for the Warden agent.
//!
//! This crate connects local agent logic to a P2P network through an
//! external node process:
//!
//! - Launching, supervising and stopping the node process
//! - Length-prefixed RPC framing over the node's local endpoint
//! - A client with a single inbound handler and serialized writes
//!
//! # Architecture
//!
//! ```text
//! P2pClient
//! ├── Transport (ProcessTransport: spawn node + dial RPC port)
//! ├── Reader Task (decode frames, await handler per message)
//! └── FramedWrite (mutex-guarded, shared by every BridgeSender)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use warden_p2p::{ConnectionConfig, P2pClient, ProcessTransport, TransportConfig};
//!
//! let transport = ProcessTransport::new(TransportConfig::new("/usr/local/bin/p2p-node"));
//! let client = P2pClient::new(Arc::new(transport));
//! client.on_message(|msg: warden_core::PeerMessage| async move {
//!     println!("{}: {}", msg.from_agent_id, msg.content);
//! });
//! client.connect(&ConnectionConfig::new("agent-1")).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod transport;

// Re-export main types
pub use client::{BridgeSender, ClientEvent, ConnectionState, MessageHandler, P2pClient};
pub use config::{
    ConnectionConfig, TransportConfig, FRAME_MAGIC, MAX_FRAME_SIZE, PROTOCOL_VERSION,
};
pub use error::{P2pError, P2pResult};
pub use protocol::{FrameCodec, RawFrame, RpcMessage};
pub use transport::{
    MemoryListener, MemoryTransport, NodeProcess, ProcessTransport, Transport, TransportLink,
};
