//! Error types for the Warden core crate.

use std::fmt;

/// Errors produced while decoding tag/value payloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer ended before the value was complete.
    Truncated,
    /// A varint ran past 10 bytes.
    VarintOverflow,
    /// A key carried a wire type that is not part of the format.
    InvalidWireType(u8),
    /// A key carried field number zero.
    InvalidFieldNumber,
    /// A string field did not hold valid UTF-8.
    InvalidUtf8 {
        /// Field number of the offending value.
        field: u32,
    },
    /// A numeric field held a value wider than its declared type.
    ValueOutOfRange {
        /// Field number of the offending value.
        field: u32,
    },
    /// A frame carried a message kind this build does not know.
    UnknownMessageKind(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated => write!(f, "payload truncated"),
            DecodeError::VarintOverflow => write!(f, "varint exceeds 10 bytes"),
            DecodeError::InvalidWireType(t) => write!(f, "invalid wire type {}", t),
            DecodeError::InvalidFieldNumber => write!(f, "field number 0 is reserved"),
            DecodeError::InvalidUtf8 { field } => {
                write!(f, "field {} is not valid UTF-8", field)
            }
            DecodeError::ValueOutOfRange { field } => {
                write!(f, "field {} value out of range", field)
            }
            DecodeError::UnknownMessageKind(kind) => write!(f, "unknown message kind {}", kind),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Errors raised when message content fails a moderation rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Content is not `0x` followed by 40 hex characters.
    InvalidAddressFormat(String),
}

impl ValidationError {
    /// Message reported back to callers for this failure.
    pub fn public_message(&self) -> &'static str {
        match self {
            ValidationError::InvalidAddressFormat(_) => "Invalid Ethereum address format",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidAddressFormat(content) => {
                write!(f, "invalid Ethereum address format: {:?}", content)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors loading the static blacklist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlacklistError {
    /// The blacklist file could not be read.
    Read(String),
    /// The blacklist file is not a JSON array of strings.
    Parse(String),
}

impl fmt::Display for BlacklistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlacklistError::Read(msg) => write!(f, "failed to read blacklist: {}", msg),
            BlacklistError::Parse(msg) => write!(f, "failed to parse blacklist: {}", msg),
        }
    }
}

impl std::error::Error for BlacklistError {}
