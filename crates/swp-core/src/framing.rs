//! Length-prefixed frame codec.
//!
//! Each frame is a 4-byte big-endian length prefix followed by exactly that
//! many body bytes:
//!
//! ```text
//! +----------------------------+------------------+
//! | Length (4 bytes, BE)       | Body             |
//! +----------------------------+------------------+
//! ```
//!
//! The frame length is validated BEFORE allocation so a hostile length
//! prefix cannot drive memory exhaustion. Zero-length frames and frames
//! larger than the configured maximum are rejected with `INVALID_FRAME`.
//!
//! [`FrameCodec`] plugs into [`tokio_util::codec::Framed`] for the daemon's
//! async connection loop; [`read_frame`]/[`write_frame`] operate on plain
//! byte slices for the conformance runner, which replays recorded frames
//! from fixture files.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{ProtocolError, ProtocolResult};
use crate::limits::MAX_FRAME_BYTES;

/// Length of the frame header (u32 length prefix).
const HEADER_LEN: usize = 4;

/// Frame codec implementing length-prefixed binary framing.
///
/// # Invariants
///
/// - A frame body is between 1 and `max_frame_bytes` bytes.
/// - The length prefix is always 4 bytes, big-endian.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_bytes: u32,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec {
    /// Creates a codec with the default maximum frame size.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_frame_bytes: MAX_FRAME_BYTES,
        }
    }

    /// Creates a codec with a custom maximum frame size.
    #[must_use]
    pub const fn with_max_frame_bytes(max_frame_bytes: u32) -> Self {
        Self { max_frame_bytes }
    }

    /// Maximum frame body length accepted by this codec.
    #[must_use]
    pub const fn max_frame_bytes(&self) -> u32 {
        self.max_frame_bytes
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> ProtocolResult<Option<Bytes>> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]);
        if length == 0 {
            return Err(ProtocolError::invalid_frame("zero-length frame"));
        }
        // Validate before allocating or reserving.
        if length > self.max_frame_bytes {
            return Err(ProtocolError::invalid_frame(format!(
                "frame length {length} exceeds max {}",
                self.max_frame_bytes
            )));
        }

        let total = HEADER_LEN + length as usize;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        Ok(Some(src.split_to(length as usize).freeze()))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> ProtocolResult<()> {
        encode_into(&item, self.max_frame_bytes, dst)
    }
}

impl Encoder<Vec<u8>> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Vec<u8>, dst: &mut BytesMut) -> ProtocolResult<()> {
        encode_into(&item, self.max_frame_bytes, dst)
    }
}

fn encode_into(body: &[u8], max_frame_bytes: u32, dst: &mut BytesMut) -> ProtocolResult<()> {
    let Ok(length) = u32::try_from(body.len()) else {
        return Err(ProtocolError::invalid_frame("frame length exceeds u32"));
    };
    if length == 0 {
        return Err(ProtocolError::invalid_frame("zero-length frame"));
    }
    if length > max_frame_bytes {
        return Err(ProtocolError::invalid_frame(format!(
            "frame length {length} exceeds max {max_frame_bytes}"
        )));
    }
    dst.reserve(HEADER_LEN + body.len());
    dst.put_u32(length);
    dst.extend_from_slice(body);
    Ok(())
}

/// Reads one frame from the front of `input`, returning the body and the
/// remaining bytes.
///
/// # Errors
///
/// `INVALID_FRAME` on a short header, a zero or oversized length prefix, or
/// a body shorter than declared.
pub fn read_frame(input: &[u8], max_frame_bytes: u32) -> ProtocolResult<(&[u8], &[u8])> {
    if input.len() < HEADER_LEN {
        return Err(ProtocolError::invalid_frame("short frame header"));
    }
    let length = u32::from_be_bytes([input[0], input[1], input[2], input[3]]);
    if length == 0 {
        return Err(ProtocolError::invalid_frame("zero-length frame"));
    }
    if length > max_frame_bytes {
        return Err(ProtocolError::invalid_frame(format!(
            "frame length {length} exceeds max {max_frame_bytes}"
        )));
    }
    let rest = &input[HEADER_LEN..];
    if rest.len() < length as usize {
        return Err(ProtocolError::invalid_frame(format!(
            "frame body {} bytes, declared {length}",
            rest.len()
        )));
    }
    Ok(rest.split_at(length as usize))
}

/// Appends one framed body to `out`.
///
/// # Errors
///
/// `INVALID_FRAME` when the body is empty or exceeds `max_frame_bytes`.
pub fn write_frame(out: &mut Vec<u8>, body: &[u8], max_frame_bytes: u32) -> ProtocolResult<()> {
    let Ok(length) = u32::try_from(body.len()) else {
        return Err(ProtocolError::invalid_frame("frame length exceeds u32"));
    };
    if length == 0 {
        return Err(ProtocolError::invalid_frame("zero-length frame"));
    }
    if length > max_frame_bytes {
        return Err(ProtocolError::invalid_frame(format!(
            "frame length {length} exceeds max {max_frame_bytes}"
        )));
    }
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(body);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn codec_roundtrip() {
        let mut codec = FrameCodec::new();
        let body = Bytes::from_static(b"hello world");

        let mut buf = BytesMut::new();
        codec.encode(body.clone(), &mut buf).unwrap();
        assert_eq!(&buf[..4], &[0, 0, 0, 11]);

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, body);
        assert!(buf.is_empty());
    }

    #[test]
    fn codec_waits_for_partial_input() {
        let mut codec = FrameCodec::new();

        let mut buf = BytesMut::from(&[0u8, 0, 0][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        // Header declares 10 bytes, only 5 present.
        let mut buf = BytesMut::from(&[0u8, 0, 0, 10, 1, 2, 3, 4, 5][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 9);
    }

    #[test]
    fn codec_rejects_zero_length() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0u8, 0, 0, 0][..]);
        let err = codec.decode(&mut buf).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFrame);
    }

    #[test]
    fn codec_rejects_oversized_prefix_before_body_arrives() {
        let mut codec = FrameCodec::with_max_frame_bytes(1024);
        let mut buf = BytesMut::new();
        buf.put_u32(2048);
        buf.extend_from_slice(&[0u8; 16]);
        let err = codec.decode(&mut buf).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFrame);
    }

    #[test]
    fn codec_decodes_back_to_back_frames() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(Bytes::from_static(b"first"), &mut buf).unwrap();
        codec
            .encode(Bytes::from_static(b"second"), &mut buf)
            .unwrap();

        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), "first");
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), "second");
        assert!(buf.is_empty());
    }

    #[test]
    fn slice_roundtrip() {
        let mut out = Vec::new();
        write_frame(&mut out, b"abc", MAX_FRAME_BYTES).unwrap();
        write_frame(&mut out, b"defg", MAX_FRAME_BYTES).unwrap();

        let (first, rest) = read_frame(&out, MAX_FRAME_BYTES).unwrap();
        assert_eq!(first, b"abc");
        let (second, rest) = read_frame(rest, MAX_FRAME_BYTES).unwrap();
        assert_eq!(second, b"defg");
        assert!(rest.is_empty());
    }

    #[test]
    fn slice_read_rejects_violations() {
        // Short header.
        assert!(read_frame(&[0, 0, 1], MAX_FRAME_BYTES).is_err());
        // Zero length.
        assert!(read_frame(&[0, 0, 0, 0], MAX_FRAME_BYTES).is_err());
        // Declared longer than the max.
        let over = (MAX_FRAME_BYTES + 1).to_be_bytes();
        assert!(read_frame(&over, MAX_FRAME_BYTES).is_err());
        // Body shorter than declared.
        assert!(read_frame(&[0, 0, 0, 4, 1, 2], MAX_FRAME_BYTES).is_err());
    }

    #[test]
    fn slice_write_rejects_violations() {
        let mut out = Vec::new();
        assert!(write_frame(&mut out, b"", MAX_FRAME_BYTES).is_err());
        assert!(write_frame(&mut out, &[0u8; 8], 4).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn frame_at_exact_limit_accepted() {
        let mut codec = FrameCodec::with_max_frame_bytes(64);
        let body = Bytes::from(vec![0xab; 64]);
        let mut buf = BytesMut::new();
        codec.encode(body, &mut buf).unwrap();
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.len(), 64);
    }
}
