use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::error::{FrameError, Result};

/// Frame header: a single body-length byte.
pub const LENGTH_PREFIX_SIZE: usize = 1;

/// Largest body the length prefix can describe.
pub const MAX_BODY_LEN: usize = u8::MAX as usize;

const NUL: u8 = 0;

/// A decoded frame body (JSON text, terminator and pad stripped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub body: Bytes,
}

impl Frame {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self { body: body.into() }
    }

    /// Body as UTF-8 text, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Encode a body into the wire format.
///
/// ```text
/// ┌──────────┬───────────────────────┐
/// │ Len (1B) │ Body (Len bytes)      │
/// └──────────┴───────────────────────┘
/// ```
pub fn encode_frame(body: &[u8], dst: &mut BytesMut) -> Result<()> {
    if body.len() > MAX_BODY_LEN {
        return Err(FrameError::BodyTooLarge {
            size: body.len(),
            max: MAX_BODY_LEN,
        });
    }
    dst.reserve(LENGTH_PREFIX_SIZE + body.len());
    dst.put_u8(body.len() as u8);
    dst.put_slice(body);
    Ok(())
}

/// Decode one frame from a buffer.
///
/// Returns `Ok(None)` until `1 + len` bytes are buffered. The body ends at the
/// first null byte inside the declared length, or at the declared end. A null
/// pad byte directly after the frame is consumed with it.
pub fn decode_frame(src: &mut BytesMut) -> Result<Option<Frame>> {
    let Some(&declared) = src.first() else {
        return Ok(None); // Need more data
    };

    let total = LENGTH_PREFIX_SIZE + usize::from(declared);
    if src.len() < total {
        return Ok(None); // Need more data
    }

    let body_end = src[LENGTH_PREFIX_SIZE..total]
        .iter()
        .position(|&b| b == NUL)
        .map_or(total, |n| LENGTH_PREFIX_SIZE + n);

    let mut frame = src.split_to(total);
    frame.truncate(body_end);
    frame.advance(LENGTH_PREFIX_SIZE);

    if src.first() == Some(&NUL) {
        src.advance(1);
    }

    Ok(Some(Frame {
        body: frame.freeze(),
    }))
}

/// `tokio_util` codec for the device protocol.
///
/// Beyond [`decode_frame`], it remembers when a frame ended exactly at a
/// segment boundary so a pad byte arriving in the next segment is still
/// discarded rather than read as an empty frame.
#[derive(Debug, Default)]
pub struct DeviceCodec {
    pad_pending: bool,
}

impl DeviceCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for DeviceCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if self.pad_pending && !src.is_empty() {
            if src[0] == NUL {
                src.advance(1);
            }
            self.pad_pending = false;
        }

        let frame = decode_frame(src)?;
        if let Some(frame) = &frame {
            trace!(len = frame.body.len(), "decoded device frame");
            self.pad_pending = src.is_empty();
        }
        Ok(frame)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() || src[..] == [NUL] => {
                src.clear();
                Ok(None)
            }
            None => Err(FrameError::ConnectionClosed {
                buffered: src.len(),
            }),
        }
    }
}

impl Encoder<Bytes> for DeviceCodec {
    type Error = FrameError;

    fn encode(&mut self, body: Bytes, dst: &mut BytesMut) -> Result<()> {
        encode_frame(&body, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"uri":"/beginConfigReply","err":0}"#;

    fn wire(body: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_frame(body, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut buf = wire(BODY);
        assert_eq!(buf.len(), LENGTH_PREFIX_SIZE + BODY.len());
        assert_eq!(buf[0] as usize, BODY.len());

        let frame = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(frame.body.as_ref(), BODY);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_incomplete() {
        let mut buf = wire(BODY);
        buf.truncate(10);
        assert!(decode_frame(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 10);

        let mut empty = BytesMut::new();
        assert!(decode_frame(&mut empty).unwrap().is_none());
    }

    #[test]
    fn test_exact_length_is_complete() {
        // 1 + len bytes, nothing more, is a whole frame.
        let mut buf = BytesMut::from(&[3u8, b'{', b'}', b' '][..]);
        let frame = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(frame.body.as_ref(), b"{} ");
    }

    #[test]
    fn test_null_terminator_inside_declared_length() {
        let mut buf = BytesMut::from(&[6u8, b'{', b'}', 0, b'x', b'x', b'x'][..]);
        let frame = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(frame.body.as_ref(), b"{}");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_null_after_declared_length_is_pad() {
        let mut buf = BytesMut::from(&[2u8, b'{', b'}', 0, 2, b'[', b']'][..]);
        let first = decode_frame(&mut buf).unwrap().unwrap();
        let second = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(first.body.as_ref(), b"{}");
        assert_eq!(second.body.as_ref(), b"[]");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_body_too_large() {
        let mut buf = BytesMut::new();
        let body = vec![b'x'; MAX_BODY_LEN + 1];
        let err = encode_frame(&body, &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::BodyTooLarge { size: 256, max: 255 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_split_at_every_boundary_matches_whole() {
        let mut whole = wire(BODY);
        whole.put_u8(NUL);
        let expected = decode_frame(&mut whole.clone()).unwrap().unwrap();

        for split in 1..whole.len() {
            let mut codec = DeviceCodec::new();
            let mut buf = BytesMut::from(&whole[..split]);
            let early = codec.decode(&mut buf).unwrap();

            buf.extend_from_slice(&whole[split..]);
            let frame = match early {
                Some(frame) => frame,
                None => codec.decode(&mut buf).unwrap().expect("frame after second segment"),
            };
            assert_eq!(frame, expected, "split at {split}");

            // Pad that arrived late must not surface as a frame.
            assert!(codec.decode(&mut buf).unwrap().is_none(), "split at {split}");
            assert!(buf.is_empty(), "split at {split}");
        }
    }

    #[test]
    fn test_codec_drops_pad_from_next_segment() {
        let mut codec = DeviceCodec::new();
        let mut buf = wire(b"{}");
        assert!(codec.decode(&mut buf).unwrap().is_some());

        buf.extend_from_slice(&[NUL]);
        buf.extend_from_slice(&wire(b"[]"));
        let next = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(next.body.as_ref(), b"[]");
    }

    #[test]
    fn test_decode_eof_with_partial_frame() {
        let mut codec = DeviceCodec::new();
        let mut buf = wire(BODY);
        buf.truncate(5);
        let err = codec.decode_eof(&mut buf).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed { buffered: 5 }));
    }

    #[test]
    fn test_decode_eof_clean() {
        let mut codec = DeviceCodec::new();
        let mut buf = BytesMut::new();
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }
}
