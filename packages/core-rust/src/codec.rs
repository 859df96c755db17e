//! Length-prefixed frame codec for the legacy TCP link.
//!
//! Each frame is a 2-byte big-endian length prefix followed by that many
//! bytes of fixed-field payload. The codec is [`tokio_util::codec`]
//! compatible and validates the announced length before allocating.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::WireError;

/// Length of the frame header (2 bytes, big-endian payload length).
const HEADER_LEN: usize = 2;

/// Upper bound on a frame payload. The full recognized envelope is 53 bytes;
/// the cap leaves headroom without letting a hostile prefix force a large
/// allocation.
pub const MAX_FRAME_SIZE: usize = 1024;

/// Frame codec for use with [`tokio_util::codec::Framed`] over a TCP stream.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    /// Creates a codec with the default maximum frame size.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    /// Creates a codec with a custom maximum frame size.
    #[must_use]
    pub const fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = WireError;

    /// Decodes one frame from the input buffer.
    ///
    /// The announced length is validated before any allocation. Zero-length
    /// frames are rejected: an empty payload can never parse to a message.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, WireError> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let length = usize::from(u16::from_be_bytes([src[0], src[1]]));
        if length == 0 {
            return Err(WireError::EmptyFrame);
        }
        if length > self.max_frame_size {
            return Err(WireError::FrameTooLarge {
                len: length,
                max: self.max_frame_size,
            });
        }

        let total = HEADER_LEN + length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        Ok(Some(src.split_to(length).freeze()))
    }
}

impl Encoder<&[u8]> for FrameCodec {
    type Error = WireError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), WireError> {
        if item.is_empty() {
            return Err(WireError::EmptyFrame);
        }
        if item.len() > self.max_frame_size {
            return Err(WireError::FrameTooLarge {
                len: item.len(),
                max: self.max_frame_size,
            });
        }

        dst.reserve(HEADER_LEN + item.len());
        #[allow(clippy::cast_possible_truncation)] // bounded by max_frame_size
        dst.put_u16(item.len() as u16);
        dst.extend_from_slice(item);
        Ok(())
    }
}

impl Encoder<Vec<u8>> for FrameCodec {
    type Error = WireError;

    fn encode(&mut self, item: Vec<u8>, dst: &mut BytesMut) -> Result<(), WireError> {
        self.encode(item.as_slice(), dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let mut codec = FrameCodec::new();
        let payload = b"0100411111111111111111".as_slice();

        let mut buf = BytesMut::new();
        codec.encode(payload, &mut buf).unwrap();

        assert_eq!(buf.len(), HEADER_LEN + payload.len());
        assert_eq!(&buf[..2], &[0, 22]);

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&decoded[..], payload);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_waits_for_full_header() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0u8][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn decode_waits_for_full_payload() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0u8, 10, 1, 2, 3][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn decode_rejects_zero_length_frame() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0u8, 0, 1, 2][..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(WireError::EmptyFrame)
        ));
    }

    #[test]
    fn decode_rejects_oversized_frame() {
        let mut codec = FrameCodec::with_max_size(64);
        let mut buf = BytesMut::new();
        buf.put_u16(65);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(WireError::FrameTooLarge { len: 65, max: 64 })
        ));
    }

    #[test]
    fn decode_consumes_back_to_back_frames() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(b"first".as_slice(), &mut buf).unwrap();
        codec.encode(b"second".as_slice(), &mut buf).unwrap();

        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"first");
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"second");
        assert!(buf.is_empty());
    }

    #[test]
    fn encode_rejects_empty_payload() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        assert!(matches!(
            codec.encode(b"".as_slice(), &mut buf),
            Err(WireError::EmptyFrame)
        ));
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let mut codec = FrameCodec::with_max_size(4);
        let mut buf = BytesMut::new();
        assert!(matches!(
            codec.encode(b"12345".as_slice(), &mut buf),
            Err(WireError::FrameTooLarge { len: 5, max: 4 })
        ));
    }
}
