//! Agent configuration.

use std::path::PathBuf;
use std::time::Duration;

use warden_p2p::config::{DEFAULT_LISTEN_PORT, DEFAULT_RPC_HOST, DEFAULT_RPC_PORT};
use warden_p2p::{ConnectionConfig, TransportConfig};

use crate::cli::Cli;

/// Complete agent configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Path to the P2P node binary.
    pub node_path: Option<PathBuf>,

    /// Extra arguments for the P2P node.
    pub node_args: Vec<String>,

    /// Host of the node's RPC endpoint.
    pub rpc_host: String,

    /// Port of the node's RPC endpoint.
    pub rpc_port: u16,

    /// Port the node listens on for peers.
    pub p2p_port: u16,

    /// HTTP listen host.
    pub http_host: String,

    /// HTTP listen port.
    pub http_port: u16,

    /// Agent id.
    pub agent_name: String,

    /// Bound on node launch plus handshake.
    pub handshake_timeout: Duration,

    /// Blacklist file.
    pub blacklist_path: PathBuf,

    /// Log level.
    pub log_level: String,
}

impl NodeConfig {
    /// Create an agent configuration from CLI arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            node_path: cli.node_path.clone(),
            node_args: cli.node_args(),
            rpc_host: cli.rpc_host.clone(),
            rpc_port: cli.rpc_port,
            p2p_port: cli.p2p_port,
            http_host: cli.http_host.clone(),
            http_port: cli.http_port,
            agent_name: cli.agent_name.clone(),
            handshake_timeout: Duration::from_millis(cli.handshake_timeout_ms),
            blacklist_path: cli.blacklist_path.clone(),
            log_level: cli.log_level.clone(),
        }
    }

    /// Build the bridge session configuration.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(self.agent_name.clone())
            .with_listen_port(self.p2p_port)
            .with_timeout(self.handshake_timeout)
    }

    /// Build the node process configuration, if a binary is configured.
    pub fn transport_config(&self) -> Option<TransportConfig> {
        self.node_path.as_ref().map(|path| {
            TransportConfig::new(path.clone())
                .with_args(self.node_args.clone())
                .with_rpc_endpoint(self.rpc_host.clone(), self.rpc_port)
        })
    }

    /// `host:port` the HTTP server binds to.
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_path: None,
            node_args: Vec::new(),
            rpc_host: DEFAULT_RPC_HOST.to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            p2p_port: DEFAULT_LISTEN_PORT,
            http_host: "0.0.0.0".to_string(),
            http_port: 3000,
            agent_name: "default-agent".to_string(),
            handshake_timeout: Duration::from_secs(5),
            blacklist_path: PathBuf::from("address.json"),
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.http_addr(), "0.0.0.0:3000");
        assert!(config.transport_config().is_none());

        let connection = config.connection_config();
        assert_eq!(connection.agent_id, "default-agent");
        assert_eq!(connection.listen_port, 8000);
        assert_eq!(connection.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_cli() {
        let cli = Cli::parse_from([
            "warden-node",
            "--node-path",
            "/opt/p2p-node",
            "--node-args",
            "--quiet",
            "--rpc-port",
            "6001",
            "--agent-name",
            "moderator",
            "--handshake-timeout-ms",
            "750",
            "--log-level",
            "warden=debug",
        ]);
        let config = NodeConfig::from_cli(&cli);

        let transport = config.transport_config().unwrap();
        assert_eq!(transport.binary_path, PathBuf::from("/opt/p2p-node"));
        assert_eq!(transport.args, vec!["--quiet"]);
        assert_eq!(transport.rpc_addr(), "127.0.0.1:6001");

        let connection = config.connection_config();
        assert_eq!(connection.agent_id, "moderator");
        assert_eq!(connection.timeout, Duration::from_millis(750));
        assert_eq!(config.log_level, "warden=debug");
    }
}
