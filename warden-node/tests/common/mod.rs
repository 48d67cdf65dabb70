//! Shared test helpers for warden-node integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::Value;
use tempfile::NamedTempFile;
use tokio::io::DuplexStream;
use tokio_util::codec::Framed;

use warden_core::PeerMessage;
use warden_node::config::NodeConfig;
use warden_node::node::{Node, NodeHandle};
use warden_node::responder::ChatResponder;
use warden_p2p::protocol::HelloAck;
use warden_p2p::{FrameCodec, MemoryTransport, RpcMessage, PROTOCOL_VERSION};

/// Address present in the test blacklist.
pub const BLOCKED: &str = "0x8576acc5c05d6ce88f4e49bf65bdf0c62f91353c";

/// Address absent from the test blacklist.
pub const CLEAN: &str = "0x1234567890abcdef1234567890abcdef12345678";

/// How long to wait for anything the agent does asynchronously.
pub const WAIT: Duration = Duration::from_secs(3);

/// Node side of the bridge link.
pub type NodeFrames = Framed<DuplexStream, FrameCodec>;

/// Responder that always fails.
pub struct FailingResponder;

#[async_trait]
impl ChatResponder for FailingResponder {
    async fn respond(&self, _prompt: &str) -> anyhow::Result<String> {
        anyhow::bail!("model unavailable")
    }
}

/// A running agent wired to an in-process node.
pub struct TestContext {
    pub handle: NodeHandle,
    pub node: Node,
    pub transport: Arc<MemoryTransport>,
    pub peer: NodeFrames,
    pub http: Client,
    pub base_url: String,
    _blacklist: NamedTempFile,
}

impl TestContext {
    /// Start an agent with the default responder.
    pub async fn start() -> Self {
        Self::start_with(None).await
    }

    /// Start an agent whose chat responder always fails.
    pub async fn start_failing() -> Self {
        Self::start_with(Some(Arc::new(FailingResponder))).await
    }

    async fn start_with(responder: Option<Arc<dyn ChatResponder>>) -> Self {
        let blacklist = write_blacklist(&[BLOCKED]);

        let config = NodeConfig {
            http_host: "127.0.0.1".to_string(),
            http_port: 0,
            agent_name: "test-agent".to_string(),
            handshake_timeout: WAIT,
            blacklist_path: blacklist.path().to_path_buf(),
            ..NodeConfig::default()
        };

        let (transport, mut listener) = MemoryTransport::new();
        let transport = Arc::new(transport);

        let mut node = Node::with_transport(config, transport.clone()).unwrap();
        if let Some(responder) = responder {
            node = node.with_responder(responder);
        }

        let accept = tokio::spawn(async move {
            let stream = listener.accept().await.unwrap();
            let mut peer = Framed::new(stream, FrameCodec::new());
            let hello = peer.next().await.unwrap().unwrap().into_message().unwrap();
            assert!(matches!(hello, RpcMessage::Hello(ref h) if h.agent_id == "test-agent"));
            peer.send(RpcMessage::HelloAck(HelloAck {
                node_id: "node-test".to_string(),
                protocol_version: PROTOCOL_VERSION,
            }))
            .await
            .unwrap();
            peer
        });

        let handle = node.start().await.unwrap();
        let peer = accept.await.unwrap();
        let base_url = format!("http://{}", handle.http_addr);

        Self {
            handle,
            node,
            transport,
            peer,
            http: Client::new(),
            base_url,
            _blacklist: blacklist,
        }
    }

    /// Full URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Deliver a message from a remote agent.
    pub async fn send_inbound(&mut self, from: &str, content: &str) {
        self.peer
            .send(RpcMessage::Inbound(PeerMessage::new(from, content)))
            .await
            .unwrap();
    }

    /// Next frame the agent writes to the node.
    pub async fn next_frame(&mut self) -> RpcMessage {
        tokio::time::timeout(WAIT, self.peer.next())
            .await
            .expect("timed out waiting for agent frame")
            .unwrap()
            .unwrap()
            .into_message()
            .unwrap()
    }

    /// Next moderation reply: recipient and parsed JSON body.
    pub async fn next_reply(&mut self) -> (String, Value) {
        match self.next_frame().await {
            RpcMessage::SendMessage(msg) => {
                let body = serde_json::from_str(&msg.content).unwrap();
                (msg.to_agent_id, body)
            }
            other => panic!("expected SendMessage, got {}", other),
        }
    }

    /// GET a path and return status and JSON body.
    pub async fn get_json(&self, path: &str) -> (u16, Value) {
        let response = self.http.get(self.url(path)).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    /// Stop the agent.
    pub async fn shutdown(self) {
        self.handle.shutdown().await.unwrap();
    }
}

/// Write a blacklist file holding `addresses`.
pub fn write_blacklist(addresses: &[&str]) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), serde_json::to_string(addresses).unwrap()).unwrap();
    file
}
