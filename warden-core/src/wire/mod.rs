//! Compact tag/value wire format for bridge RPC payloads.
//!
//! Every field is written as a key followed by a value:
//!
//! ```text
//! key   = varint((field_number << 3) | wire_type)
//! value = varint            (wire type 0: integers, bools)
//!       | 8 bytes LE        (wire type 1)
//!       | varint len, bytes (wire type 2: strings, nested bytes)
//!       | 4 bytes LE        (wire type 5)
//! ```
//!
//! The layout is byte-compatible with protobuf's encoding of scalar and
//! string fields. Encoders write fields in ascending field order and omit
//! fields holding their zero value. Decoders skip fields they do not know,
//! so newer peers can add fields without breaking older ones.

mod reader;
mod varint;
mod writer;

pub use reader::{FieldReader, WireValue};
pub use varint::{decode_varint, encode_varint, encoded_len_varint, MAX_VARINT_LEN};
pub use writer::FieldWriter;

use crate::error::DecodeError;

/// Wire type carried in the low three bits of every key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    /// Base-128 varint.
    Varint = 0,
    /// Little-endian 64-bit value.
    Fixed64 = 1,
    /// Varint length followed by that many bytes.
    LengthDelimited = 2,
    /// Little-endian 32-bit value.
    Fixed32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::Fixed32),
            other => Err(DecodeError::InvalidWireType(other)),
        }
    }
}

/// A message with a fixed tag/value schema.
///
/// Implementors describe their fields once in [`encode_fields`] and
/// [`merge_field`]; framing, zero-value suppression and unknown-field
/// skipping come from the provided methods.
///
/// [`encode_fields`]: WireMessage::encode_fields
/// [`merge_field`]: WireMessage::merge_field
pub trait WireMessage: Default + Sized {
    /// Write every non-default field in ascending field order.
    fn encode_fields(&self, writer: &mut FieldWriter);

    /// Apply one decoded field to `self`.
    ///
    /// Unknown field numbers and known fields arriving with an unexpected
    /// wire type must be ignored.
    fn merge_field(&mut self, field: u32, value: WireValue<'_>) -> Result<(), DecodeError>;

    /// Encode this message into a fresh buffer.
    fn encode_to_vec(&self) -> Vec<u8> {
        let mut writer = FieldWriter::new();
        self.encode_fields(&mut writer);
        writer.into_vec()
    }

    /// Decode a message from a complete payload.
    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut message = Self::default();
        let mut reader = FieldReader::new(buf);
        while let Some((field, value)) = reader.next_field()? {
            message.merge_field(field, value)?;
        }
        Ok(message)
    }
}
