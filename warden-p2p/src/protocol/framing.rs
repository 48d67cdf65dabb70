//! Length-prefixed frame codec.
//!
//! Frames are laid out as:
//! - 4 bytes: magic `WRDN`
//! - 4 bytes: big-endian body length (kind byte + payload)
//! - 1 byte: message kind
//! - N bytes: tag/value payload
//!
//! The codec only splits the byte stream into frames. Payload decoding
//! happens afterwards in [`RawFrame::into_message`], so a frame with an
//! unknown kind or a malformed payload can be dropped without tearing down
//! the stream. Bad magic or an oversize length cannot be resynchronised and
//! are returned as stream errors.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use warden_core::DecodeError;

use crate::config::{FRAME_MAGIC, MAX_FRAME_SIZE};
use crate::error::{P2pError, P2pResult};
use crate::protocol::RpcMessage;

/// Header size: 4 bytes magic + 4 bytes length.
const HEADER_SIZE: usize = 8;

/// One frame split off the stream, not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Message kind byte.
    pub kind: u8,
    /// Encoded message fields.
    pub payload: Bytes,
}

impl RawFrame {
    /// Decode the payload according to the frame kind.
    pub fn into_message(self) -> Result<RpcMessage, DecodeError> {
        RpcMessage::decode(self.kind, &self.payload)
    }
}

/// Codec for length-prefixed RPC frames.
#[derive(Debug, Default)]
pub struct FrameCodec {
    /// Body length of the current frame (if the header has been read).
    current_length: Option<usize>,
}

impl FrameCodec {
    /// Create a new frame codec.
    pub fn new() -> Self {
        Self {
            current_length: None,
        }
    }
}

impl Decoder for FrameCodec {
    type Item = RawFrame;
    type Error = P2pError;

    fn decode(&mut self, src: &mut BytesMut) -> P2pResult<Option<Self::Item>> {
        let length = match self.current_length {
            Some(length) => length,
            None => {
                if src.len() < HEADER_SIZE {
                    return Ok(None);
                }

                let mut magic = [0u8; 4];
                magic.copy_from_slice(&src[0..4]);
                if magic != FRAME_MAGIC {
                    return Err(P2pError::InvalidMagic {
                        expected: FRAME_MAGIC,
                        actual: magic,
                    });
                }

                let mut raw_len = [0u8; 4];
                raw_len.copy_from_slice(&src[4..8]);
                let length = u32::from_be_bytes(raw_len) as usize;

                if length > MAX_FRAME_SIZE {
                    return Err(P2pError::FrameTooLarge {
                        size: length,
                        max: MAX_FRAME_SIZE,
                    });
                }
                // A body must at least carry the kind byte.
                if length == 0 {
                    return Err(P2pError::Decode(DecodeError::Truncated));
                }

                self.current_length = Some(length);
                length
            }
        };

        if src.len() < HEADER_SIZE + length {
            src.reserve(HEADER_SIZE + length - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let mut body = src.split_to(length);
        self.current_length = None;

        let kind = body.get_u8();
        Ok(Some(RawFrame {
            kind,
            payload: body.freeze(),
        }))
    }
}

impl Encoder<RpcMessage> for FrameCodec {
    type Error = P2pError;

    fn encode(&mut self, message: RpcMessage, dst: &mut BytesMut) -> P2pResult<()> {
        let payload = message.encode_payload();
        let length = payload.len() + 1;

        if length > MAX_FRAME_SIZE {
            return Err(P2pError::FrameTooLarge {
                size: length,
                max: MAX_FRAME_SIZE,
            });
        }

        dst.reserve(HEADER_SIZE + length);
        dst.put_slice(&FRAME_MAGIC);
        dst.put_u32(length as u32);
        dst.put_u8(message.kind());
        dst.put_slice(&payload);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Goodbye, SendMessage};
    use warden_core::PeerMessage;

    fn decode_one(codec: &mut FrameCodec, buf: &mut BytesMut) -> RpcMessage {
        codec.decode(buf).unwrap().unwrap().into_message().unwrap()
    }

    #[test]
    fn test_roundtrip_send_message() {
        let mut codec = FrameCodec::new();
        let original = RpcMessage::SendMessage(SendMessage {
            to_agent_id: "agent-2".into(),
            content: "hi".into(),
        });

        let mut buf = BytesMut::new();
        codec.encode(original.clone(), &mut buf).unwrap();

        assert_eq!(&buf[0..4], b"WRDN");
        assert_eq!(decode_one(&mut codec, &mut buf), original);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_empty_payload_frame() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(RpcMessage::Goodbye(Goodbye::default()), &mut buf)
            .unwrap();

        // header + kind byte only
        assert_eq!(buf.len(), HEADER_SIZE + 1);
        assert_eq!(
            decode_one(&mut codec, &mut buf),
            RpcMessage::Goodbye(Goodbye::default())
        );
    }

    #[test]
    fn test_partial_header() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        buf.put_slice(&FRAME_MAGIC);

        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_partial_body_then_rest() {
        let mut codec = FrameCodec::new();
        let mut full = BytesMut::new();
        let original = RpcMessage::Inbound(PeerMessage::new("peer", "0xabc"));
        codec.encode(original.clone(), &mut full).unwrap();

        let mut buf = BytesMut::new();
        buf.put_slice(&full[..full.len() - 3]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.put_slice(&full[full.len() - 3..]);
        assert_eq!(decode_one(&mut codec, &mut buf), original);
    }

    #[test]
    fn test_invalid_magic() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        buf.put_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
        buf.put_u32(1);
        buf.put_u8(7);

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(P2pError::InvalidMagic { .. })));
    }

    #[test]
    fn test_frame_too_large() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        buf.put_slice(&FRAME_MAGIC);
        buf.put_u32((MAX_FRAME_SIZE + 1) as u32);

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(P2pError::FrameTooLarge { .. })));
    }

    #[test]
    fn test_encode_rejects_oversize() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        let huge = RpcMessage::SendMessage(SendMessage {
            to_agent_id: "x".into(),
            content: "a".repeat(MAX_FRAME_SIZE),
        });

        let result = codec.encode(huge, &mut buf);
        assert!(matches!(result, Err(P2pError::FrameTooLarge { .. })));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_unknown_kind_is_frame_level() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        buf.put_slice(&FRAME_MAGIC);
        buf.put_u32(1);
        buf.put_u8(99);
        codec
            .encode(RpcMessage::Goodbye(Goodbye { reason: "done".into() }), &mut buf)
            .unwrap();

        let bad = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(bad.kind, 99);
        assert_eq!(bad.into_message(), Err(DecodeError::UnknownMessageKind(99)));

        // The following frame is still readable.
        assert_eq!(
            decode_one(&mut codec, &mut buf),
            RpcMessage::Goodbye(Goodbye { reason: "done".into() })
        );
    }

    #[test]
    fn test_multiple_frames() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();

        let first = RpcMessage::Inbound(PeerMessage::new("a", "1"));
        let second = RpcMessage::Inbound(PeerMessage::new("b", "2"));
        codec.encode(first.clone(), &mut buf).unwrap();
        codec.encode(second.clone(), &mut buf).unwrap();

        assert_eq!(decode_one(&mut codec, &mut buf), first);
        assert_eq!(decode_one(&mut codec, &mut buf), second);
        assert!(buf.is_empty());
    }
}
