//! Agent orchestrator.
//!
//! Coordinates the agent components: blacklist, P2P bridge, moderation
//! handler and HTTP API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use warden_core::BlacklistSet;
use warden_p2p::{ClientEvent, P2pClient, ProcessTransport, Transport};

use crate::agent::ModerationAgent;
use crate::config::NodeConfig;
use crate::http::{self, AppState};
use crate::responder::{ChatResponder, ModerationResponder};
use crate::shutdown::{shutdown_channel, wait_for, wait_for_shutdown_signal, ShutdownTx};

/// The agent.
pub struct Node {
    /// Agent configuration.
    config: NodeConfig,

    /// Addresses to flag, shared with the handler and HTTP API.
    blacklist: Arc<BlacklistSet>,

    /// Bridge to the P2P node.
    client: Arc<P2pClient>,

    /// Chat reply generator.
    responder: Arc<dyn ChatResponder>,
}

impl Node {
    /// Create an agent that launches the configured node binary.
    pub fn new(config: NodeConfig) -> anyhow::Result<Self> {
        let transport_config = config
            .transport_config()
            .context("P2P_NODE_PATH must point to the P2P node binary")?;
        Self::with_transport(config, Arc::new(ProcessTransport::new(transport_config)))
    }

    /// Create an agent over an existing transport.
    pub fn with_transport(config: NodeConfig, transport: Arc<dyn Transport>) -> anyhow::Result<Self> {
        let blacklist = BlacklistSet::load(&config.blacklist_path)
            .with_context(|| format!("failed to load blacklist {}", config.blacklist_path.display()))?;
        tracing::info!(
            path = %config.blacklist_path.display(),
            entries = blacklist.len(),
            "Blacklist loaded"
        );

        let blacklist = Arc::new(blacklist);
        let responder = Arc::new(ModerationResponder::new(blacklist.clone()));

        Ok(Self {
            config,
            blacklist,
            client: Arc::new(P2pClient::new(transport)),
            responder,
        })
    }

    /// Replace the chat responder.
    pub fn with_responder(mut self, responder: Arc<dyn ChatResponder>) -> Self {
        self.responder = responder;
        self
    }

    /// The bridge client.
    pub fn client(&self) -> &Arc<P2pClient> {
        &self.client
    }

    /// Connect the bridge and start serving HTTP.
    pub async fn start(&self) -> anyhow::Result<NodeHandle> {
        tracing::info!("Starting Warden agent...");
        tracing::info!("  Agent id: {}", self.config.agent_name);
        tracing::info!("  Node RPC: {}:{}", self.config.rpc_host, self.config.rpc_port);
        tracing::info!("  P2P port: {}", self.config.p2p_port);

        // Handler goes in before connect so no early message is missed.
        let sender = self.client.sender();
        self.client
            .on_message(ModerationAgent::new(self.blacklist.clone(), sender.clone()));

        self.client
            .connect(&self.config.connection_config())
            .await
            .context("failed to connect to P2P node")?;

        let listener = match TcpListener::bind(self.config.http_addr()).await {
            Ok(listener) => listener,
            Err(e) => {
                if let Err(disconnect_err) = self.client.disconnect().await {
                    tracing::warn!(error = %disconnect_err, "Disconnect after bind failure");
                }
                return Err(anyhow::Error::new(e)
                    .context(format!("failed to bind HTTP server to {}", self.config.http_addr())));
            }
        };
        let http_addr = listener.local_addr()?;

        let state = Arc::new(AppState {
            agent_name: self.config.agent_name.clone(),
            blacklist: self.blacklist.clone(),
            responder: self.responder.clone(),
            bridge: sender,
        });
        let router = http::router(state);

        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(wait_for(shutdown_rx))
                .await
        });

        let watcher = tokio::spawn(log_bridge_events(self.client.subscribe()));

        tracing::info!("HTTP server listening on {}", http_addr);

        Ok(NodeHandle {
            http_addr,
            server,
            watcher,
            shutdown_tx,
            client: self.client.clone(),
        })
    }

    /// Run until SIGINT or SIGTERM, then shut down gracefully.
    pub async fn run(&self) -> anyhow::Result<()> {
        let handle = self.start().await?;

        let signal = wait_for_shutdown_signal().await;
        tracing::info!("Shutting down agent...");
        handle.shutdown().await?;
        signal.context("failed to install signal handlers")?;

        tracing::info!("Agent shutdown complete");
        Ok(())
    }
}

async fn log_bridge_events(mut events: tokio::sync::broadcast::Receiver<ClientEvent>) {
    use tokio::sync::broadcast::error::RecvError;

    loop {
        match events.recv().await {
            Ok(ClientEvent::TransportLost { reason }) => {
                tracing::error!(reason = %reason, "P2P node lost; peer messaging unavailable");
            }
            Ok(ClientEvent::DecodeFailed { error }) => {
                tracing::debug!(error = %error, "Dropped undecodable frame");
            }
            Ok(event) => tracing::debug!(event = ?event, "Bridge event"),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Bridge event log lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Handle to a started agent.
pub struct NodeHandle {
    /// Address the HTTP server is bound to.
    pub http_addr: SocketAddr,
    server: JoinHandle<std::io::Result<()>>,
    watcher: JoinHandle<()>,
    shutdown_tx: ShutdownTx,
    client: Arc<P2pClient>,
}

impl NodeHandle {
    /// Stop serving HTTP and disconnect the bridge.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let _ = self.shutdown_tx.send(());
        match self.server.await {
            Ok(Ok(())) => tracing::info!("HTTP server stopped"),
            Ok(Err(e)) => tracing::warn!(error = %e, "HTTP server exited with error"),
            Err(e) => tracing::warn!(error = %e, "HTTP server task failed"),
        }

        self.client
            .disconnect()
            .await
            .context("failed to disconnect from P2P node")?;
        self.watcher.abort();
        Ok(())
    }
}
