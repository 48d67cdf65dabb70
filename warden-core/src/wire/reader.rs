//! Field-by-field decoding of a tag/value payload.

use super::varint::decode_varint;
use super::WireType;
use crate::error::DecodeError;

/// One decoded field value, borrowed from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireValue<'a> {
    /// Wire type 0.
    Varint(u64),
    /// Wire type 1.
    Fixed64(u64),
    /// Wire type 2.
    Bytes(&'a [u8]),
    /// Wire type 5.
    Fixed32(u32),
}

impl<'a> WireValue<'a> {
    /// Interpret as a UTF-8 string.
    ///
    /// Returns `Ok(None)` when the value has a non length-delimited wire
    /// type, which callers treat as an unknown field.
    pub fn as_string(&self, field: u32) -> Result<Option<String>, DecodeError> {
        match self {
            WireValue::Bytes(bytes) => std::str::from_utf8(bytes)
                .map(|s| Some(s.to_owned()))
                .map_err(|_| DecodeError::InvalidUtf8 { field }),
            _ => Ok(None),
        }
    }

    /// Interpret as a 32-bit unsigned integer.
    pub fn as_u32(&self, field: u32) -> Result<Option<u32>, DecodeError> {
        match self {
            WireValue::Varint(v) => u32::try_from(*v)
                .map(Some)
                .map_err(|_| DecodeError::ValueOutOfRange { field }),
            _ => Ok(None),
        }
    }

    /// Interpret as a 64-bit unsigned integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            WireValue::Varint(v) => Some(*v),
            _ => None,
        }
    }

    /// Interpret as a bool. Any non-zero varint is `true`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            WireValue::Varint(v) => Some(*v != 0),
            _ => None,
        }
    }
}

/// Cursor over the fields of a single payload.
pub struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    /// Start reading at the beginning of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Read the next `(field_number, value)` pair.
    ///
    /// Returns `Ok(None)` once the payload is exhausted.
    pub fn next_field(&mut self) -> Result<Option<(u32, WireValue<'a>)>, DecodeError> {
        if self.remaining() == 0 {
            return Ok(None);
        }

        let key = self.read_varint()?;
        let wire_type = WireType::try_from((key & 0x07) as u8)?;
        let field = u32::try_from(key >> 3).map_err(|_| DecodeError::InvalidFieldNumber)?;
        if field == 0 {
            return Err(DecodeError::InvalidFieldNumber);
        }

        let value = match wire_type {
            WireType::Varint => WireValue::Varint(self.read_varint()?),
            WireType::Fixed64 => {
                let bytes = self.take(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                WireValue::Fixed64(u64::from_le_bytes(raw))
            }
            WireType::LengthDelimited => {
                let len = self.read_varint()?;
                let len = usize::try_from(len).map_err(|_| DecodeError::Truncated)?;
                WireValue::Bytes(self.take(len)?)
            }
            WireType::Fixed32 => {
                let bytes = self.take(4)?;
                let mut raw = [0u8; 4];
                raw.copy_from_slice(bytes);
                WireValue::Fixed32(u32::from_le_bytes(raw))
            }
        };

        Ok(Some((field, value)))
    }

    fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let (value, used) = decode_varint(&self.buf[self.pos..])?;
        self.pos += used;
        Ok(value)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::Truncated);
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }
}
