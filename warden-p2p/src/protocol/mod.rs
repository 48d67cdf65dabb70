//! Bridge RPC protocol layer.
//!
//! This module contains:
//! - Message definitions for the seven RPC message kinds
//! - Length-prefixed framing codec
//! - Session handshake logic

pub mod framing;
pub mod handshake;
pub mod messages;

// Re-export main types
pub use framing::{FrameCodec, RawFrame};
pub use handshake::{complete_handshake, create_hello, validate_hello_ack, HandshakeResult};
pub use messages::{
    kind, Goodbye, Hello, HelloAck, RpcMessage, SendMessage, VerifyAddressRequest,
    VerifyAddressResponse,
};
