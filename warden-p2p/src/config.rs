//! Bridge configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Magic bytes opening every RPC frame.
pub const FRAME_MAGIC: [u8; 4] = *b"WRDN";

/// Maximum frame body size in bytes (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Current bridge protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Default bound on transport open plus handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default P2P listen port requested from the node.
pub const DEFAULT_LISTEN_PORT: u16 = 8000;

/// Default host of the node's local RPC endpoint.
pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";

/// Default port of the node's local RPC endpoint.
pub const DEFAULT_RPC_PORT: u16 = 50051;

/// Time allowed for the node to exit after SIGTERM before it is killed.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

/// Delay between attempts to dial the node's RPC endpoint.
pub const DEFAULT_DIAL_INTERVAL: Duration = Duration::from_millis(100);

/// Time `disconnect` waits for an in-flight handler before aborting it.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Capacity of the client event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Parameters for one bridge session.
///
/// Supplied once at startup and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Port the node should listen on for peers.
    pub listen_port: u16,

    /// Identity this agent announces to the network.
    pub agent_id: String,

    /// Bound on opening the transport and completing the handshake.
    pub timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_LISTEN_PORT,
            agent_id: "default-agent".to_string(),
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// Create a configuration for the given agent id.
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            ..Default::default()
        }
    }

    /// Set the P2P listen port.
    pub fn with_listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    /// Set the connect timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// How to launch and reach the external node process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Path to the node executable.
    pub binary_path: PathBuf,

    /// Extra arguments passed to the node.
    pub args: Vec<String>,

    /// Host of the node's RPC endpoint.
    pub rpc_host: String,

    /// Port of the node's RPC endpoint.
    pub rpc_port: u16,

    /// Grace period between SIGTERM and a forced kill.
    pub stop_grace: Duration,

    /// Delay between RPC dial attempts.
    pub dial_interval: Duration,
}

impl TransportConfig {
    /// Create a configuration for the given node binary.
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            rpc_host: DEFAULT_RPC_HOST.to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            stop_grace: DEFAULT_STOP_GRACE,
            dial_interval: DEFAULT_DIAL_INTERVAL,
        }
    }

    /// Set the node arguments.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Set the RPC endpoint.
    pub fn with_rpc_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.rpc_host = host.into();
        self.rpc_port = port;
        self
    }

    /// Set the stop grace period.
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    /// Set the dial retry interval.
    pub fn with_dial_interval(mut self, interval: Duration) -> Self {
        self.dial_interval = interval;
        self
    }

    /// `host:port` of the RPC endpoint.
    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.rpc_host, self.rpc_port)
    }
}
