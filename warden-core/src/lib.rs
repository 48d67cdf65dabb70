//! # Warden Core
//!
//! Shared building blocks for the Warden moderation agent.
//!
//! - A compact tag/value wire codec used by the bridge RPC protocol
//! - Application message types exchanged with remote agents
//! - The address moderation rule and its static blacklist

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod moderation;
pub mod types;
pub mod wire;

// Re-export commonly used types at crate root
pub use error::{BlacklistError, DecodeError, ValidationError};
pub use moderation::{
    check_blacklist, moderate, normalize_address, validate_format, BlacklistSet,
    ModerationResult, ModerationStatus,
};
pub use types::PeerMessage;
pub use wire::{FieldReader, FieldWriter, WireMessage, WireValue};
