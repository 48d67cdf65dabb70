//! Field encoding with zero-value suppression.

use bytes::{BufMut, BytesMut};

use super::varint::encode_varint;
use super::WireType;

/// Accumulates encoded fields for one message.
///
/// Every `put_*` method skips the field entirely when the value is the
/// type's zero value (empty string, `0`, `false`).
#[derive(Debug, Default)]
pub struct FieldWriter {
    buf: BytesMut,
}

impl FieldWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a string field.
    pub fn put_string(&mut self, field: u32, value: &str) {
        self.put_bytes(field, value.as_bytes());
    }

    /// Write a length-delimited byte field.
    pub fn put_bytes(&mut self, field: u32, value: &[u8]) {
        if value.is_empty() {
            return;
        }
        self.put_key(field, WireType::LengthDelimited);
        encode_varint(value.len() as u64, &mut self.buf);
        self.buf.put_slice(value);
    }

    /// Write a `u32` field as a varint.
    pub fn put_u32(&mut self, field: u32, value: u32) {
        self.put_u64(field, u64::from(value));
    }

    /// Write a `u64` field as a varint.
    pub fn put_u64(&mut self, field: u32, value: u64) {
        if value == 0 {
            return;
        }
        self.put_key(field, WireType::Varint);
        encode_varint(value, &mut self.buf);
    }

    /// Write a bool field as a varint.
    pub fn put_bool(&mut self, field: u32, value: bool) {
        if !value {
            return;
        }
        self.put_key(field, WireType::Varint);
        self.buf.put_u8(1);
    }

    /// Encoded length so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume the writer, returning the encoded bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }

    fn put_key(&mut self, field: u32, wire_type: WireType) {
        let key = (u64::from(field) << 3) | wire_type as u64;
        encode_varint(key, &mut self.buf);
    }
}
