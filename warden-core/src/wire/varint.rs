//! Base-128 varint encoding.
//!
//! Each byte carries 7 bits of the value, least significant group first.
//! The high bit is set on every byte except the last. A `u64` needs at
//! most 10 bytes.

use bytes::BufMut;

use crate::error::DecodeError;

/// Maximum encoded length of a `u64` varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Append `value` to `buf` as a varint.
pub fn encode_varint(mut value: u64, buf: &mut impl BufMut) {
    loop {
        if value < 0x80 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8(((value & 0x7F) as u8) | 0x80);
        value >>= 7;
    }
}

/// Decode a varint from the front of `buf`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize), DecodeError> {
    let mut value: u64 = 0;
    for (i, &byte) in buf.iter().enumerate() {
        if i == MAX_VARINT_LEN {
            return Err(DecodeError::VarintOverflow);
        }
        // The tenth byte may only contribute the top bit of a u64.
        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            return Err(DecodeError::VarintOverflow);
        }
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if buf.len() >= MAX_VARINT_LEN {
        Err(DecodeError::VarintOverflow)
    } else {
        Err(DecodeError::Truncated)
    }
}

/// Number of bytes `value` occupies once encoded.
pub fn encoded_len_varint(value: u64) -> usize {
    // Each 7 significant bits costs one byte; zero still costs one.
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}
