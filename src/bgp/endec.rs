//! Stream framing and decoding of received BGP messages.
//!
//! Outbound messages are fully assembled by [`super::builders`] as raw wire
//! bytes (including `send_bgp_raw`, which must be able to put arbitrary,
//! possibly unframed, bytes on the wire) and written directly to the
//! socket. Only the receive direction goes through a [`tokio_util`] codec,
//! since it is the only direction that needs to frame a byte stream into
//! discrete messages.

// SPDX-License-Identifier: AGPL-3.0-or-later

use super::{BgpMessage, Error, MessageType, HEADER_LEN, MARKER, MAX_MESSAGE_LEN};
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;

/// Result of attempting to extract one frame from a buffer.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameResult {
    /// Not enough bytes buffered yet; the caller must read more and retry.
    /// No bytes are consumed.
    Incomplete,
    /// A complete frame of this many bytes (including the header) is
    /// available at the front of the buffer.
    Complete(usize),
}

/// Determine whether `buf` holds one complete BGP message.
///
/// Never consumes from `buf`; the caller decides how to split it once a
/// length is known. Returns [`Error::TooShort`] if the advertised length is
/// below the 19-byte header size, which is the only condition under which
/// framing itself can fail.
pub fn frame(buf: &[u8]) -> Result<FrameResult, Error> {
    if buf.len() < HEADER_LEN {
        return Ok(FrameResult::Incomplete);
    }
    let length = u16::from_be_bytes([buf[16], buf[17]]);
    if (length as usize) < HEADER_LEN {
        return Err(Error::TooShort(length));
    }
    if buf.len() < length as usize {
        return Ok(FrameResult::Incomplete);
    }
    if length as usize > MAX_MESSAGE_LEN {
        log::warn!(
            "BGP message length {length} exceeds the conformant maximum of {MAX_MESSAGE_LEN}, framing anyway"
        );
    }
    Ok(FrameResult::Complete(length as usize))
}

/// Decodes a byte stream into [`BgpMessage`]s.
#[derive(Copy, Clone, Debug, Default)]
pub struct BgpCodec;

impl Decoder for BgpCodec {
    type Item = BgpMessage;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let length = match frame(src)? {
            FrameResult::Incomplete => return Ok(None),
            FrameResult::Complete(n) => n,
        };
        let mut raw: Bytes = src.split_to(length).freeze();
        let marker = raw.split_to(16);
        if marker.as_ref() != MARKER {
            log::debug!("non-standard BGP marker in received message: {marker:?}");
        }
        raw.advance(2); // length field, already accounted for
        let msg_type = MessageType::from_u8(raw[0]);
        raw.advance(1);
        Ok(Some(BgpMessage {
            msg_type,
            body: raw,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(length: u16, msg_type: u8) -> Vec<u8> {
        let mut buf = MARKER.to_vec();
        buf.extend_from_slice(&length.to_be_bytes());
        buf.push(msg_type);
        buf
    }

    #[test]
    fn incomplete_on_short_buffer() {
        let buf = [0xffu8; 10];
        assert_eq!(frame(&buf).unwrap(), FrameResult::Incomplete);
    }

    #[test]
    fn incomplete_when_body_not_yet_arrived() {
        let mut buf = header(25, 2);
        buf.truncate(buf.len() - 2); // header claims 25 bytes, only 17 present
        assert_eq!(frame(&buf).unwrap(), FrameResult::Incomplete);
    }

    #[test]
    fn errors_on_length_below_header_size() {
        let buf = header(16, 4);
        match frame(&buf) {
            Err(Error::TooShort(16)) => {}
            other => panic!("expected TooShort(16), got {other:?}"),
        }
    }

    #[test]
    fn complete_keepalive() {
        let buf = header(19, 4);
        assert_eq!(frame(&buf).unwrap(), FrameResult::Complete(19));
    }

    #[test]
    fn frame_never_consumes_the_buffer() {
        let buf = header(19, 4);
        let before = buf.clone();
        let _ = frame(&buf);
        assert_eq!(buf, before);
    }

    #[test]
    fn decodes_keepalive_and_leaves_trailing_bytes() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&header(19, 4));
        buf.extend_from_slice(&[0xaa, 0xbb]); // start of a next message
        let mut codec = BgpCodec;
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg.msg_type, MessageType::Keepalive);
        assert!(msg.body.is_empty());
        assert_eq!(&buf[..], &[0xaa, 0xbb]);
    }

    #[test]
    fn unknown_type_is_delivered_not_rejected() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&header(19, 42));
        let mut codec = BgpCodec;
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg.msg_type, MessageType::Unknown(42));
    }
}
