//! Bridge error types.

use std::io;
use std::time::Duration;

use thiserror::Error;
use warden_core::DecodeError;

use crate::client::ConnectionState;

/// Errors raised by the transport, codec and client layers.
#[derive(Debug, Error)]
pub enum P2pError {
    /// The node process could not be launched.
    #[error("Failed to launch node {path}: {reason}")]
    Launch { path: String, reason: String },

    /// The transport closed or the node process exited.
    #[error("Transport lost: {reason}")]
    TransportLost { reason: String },

    /// A frame payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The operation is not allowed in the current connection state.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: ConnectionState,
    },

    /// The transport or handshake did not complete in time.
    #[error("Connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The client is not connected.
    #[error("Not connected")]
    NotConnected,

    /// A frame could not be written.
    #[error("Send failed: {0}")]
    Send(String),

    /// Teardown did not complete cleanly.
    #[error("Disconnect failed: {0}")]
    Disconnect(String),

    /// I/O error on the transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Frame body exceeds the maximum allowed size.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Frame did not start with the expected magic bytes.
    #[error("Invalid frame magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic { expected: [u8; 4], actual: [u8; 4] },

    /// The node rejected or garbled the handshake.
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    /// Node speaks a protocol version we do not.
    #[error("Incompatible protocol version: {peer_version} (our version: {our_version})")]
    IncompatibleVersion { peer_version: u32, our_version: u32 },

    /// Another start or stop is already in progress.
    #[error("Transport lifecycle operation already in progress")]
    LifecycleBusy,
}

/// Result type for bridge operations.
pub type P2pResult<T> = Result<T, P2pError>;
