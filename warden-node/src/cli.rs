//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

/// Warden moderation agent.
#[derive(Parser, Debug, Clone)]
#[command(name = "warden-node")]
#[command(about = "Address moderation agent bridged to a P2P network")]
#[command(version)]
pub struct Cli {
    /// Path to the P2P node binary.
    #[arg(long, env = "P2P_NODE_PATH")]
    pub node_path: Option<PathBuf>,

    /// Extra arguments for the P2P node, whitespace separated.
    #[arg(long, env = "P2P_NODE_ARGS", allow_hyphen_values = true)]
    pub node_args: Option<String>,

    /// Host of the node's local RPC endpoint.
    #[arg(long, env = "GRPC_HOST", default_value = "127.0.0.1")]
    pub rpc_host: String,

    /// Port of the node's local RPC endpoint.
    #[arg(long, env = "GRPC_PORT", default_value_t = 50051)]
    pub rpc_port: u16,

    /// Port the node listens on for peers.
    #[arg(long, env = "P2P_PORT", default_value_t = 8000)]
    pub p2p_port: u16,

    /// HTTP listen host.
    #[arg(long, env = "HTTP_HOST", default_value = "0.0.0.0")]
    pub http_host: String,

    /// HTTP listen port.
    #[arg(long, env = "HTTP_PORT", default_value_t = 3000)]
    pub http_port: u16,

    /// Agent id announced to the network and reported as the chat model.
    #[arg(long, env = "AGENT_NAME", default_value = "default-agent")]
    pub agent_name: String,

    /// Bound on launching the node and completing the handshake, in milliseconds.
    #[arg(long, env = "HANDSHAKE_TIMEOUT_MS", default_value_t = 5000)]
    pub handshake_timeout_ms: u64,

    /// JSON array of blacklisted addresses.
    #[arg(long, env = "BLACKLIST_PATH", default_value = "address.json")]
    pub blacklist_path: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Node arguments split on whitespace.
    pub fn node_args(&self) -> Vec<String> {
        self.node_args
            .as_deref()
            .map(|args| args.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
