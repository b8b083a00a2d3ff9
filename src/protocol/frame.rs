use crate::error::{GateMeshError, Result};
use crate::protocol::HEARTBEAT_FLAG;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the fixed header: `size(4) + flags(1) + route(1) + seq(8)`.
pub const HEADER_SIZE: usize = 4 + 1 + 1 + 8;

/// One parsed internal frame: header fields plus whatever body bytes
/// followed `seq` in the wire layout.
#[derive(Debug, Clone)]
pub struct Frame {
    pub flags: u8,
    pub route: u8,
    pub seq: u64,
    pub body: Bytes,
}

impl Frame {
    pub fn is_heartbeat(&self) -> bool {
        self.flags & HEARTBEAT_FLAG != 0
    }

    /// Encode a data frame: header + body, `size` computed from `body`.
    pub fn encode_data(route: u8, seq: u64, body: &[u8]) -> BytesMut {
        let size = (HEADER_SIZE - 4 + body.len()) as u32;
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + body.len());
        buf.put_u32(size);
        buf.put_u8(0);
        buf.put_u8(route);
        buf.put_u64(seq);
        buf.put_slice(body);
        buf
    }

    /// Encode a heartbeat frame: header only, heartbeat flag set, no body.
    pub fn encode_heartbeat(route: u8, seq: u64) -> BytesMut {
        let size = (HEADER_SIZE - 4) as u32;
        let mut buf = BytesMut::with_capacity(HEADER_SIZE);
        buf.put_u32(size);
        buf.put_u8(HEARTBEAT_FLAG);
        buf.put_u8(route);
        buf.put_u64(seq);
        buf
    }

    /// Decode a complete frame (header already-known `size` bytes plus the
    /// leading 4-byte size field) from a contiguous buffer.
    pub fn decode(mut data: Bytes) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(GateMeshError::InvalidMessage);
        }
        let _size = data.get_u32();
        let flags = data.get_u8();
        let route = data.get_u8();
        let seq = data.get_u64();
        Ok(Frame {
            flags,
            route,
            seq,
            body: data,
        })
    }

    /// Read one length-prefixed frame from an async stream.
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame> {
        let size = reader.read_u32().await?;
        let mut rest = vec![0u8; size as usize];
        reader.read_exact(&mut rest).await?;
        if rest.len() < HEADER_SIZE - 4 {
            return Err(GateMeshError::InvalidMessage);
        }
        let mut rest = Bytes::from(rest);
        let flags = rest.get_u8();
        let route = rest.get_u8();
        let seq = rest.get_u64();
        Ok(Frame {
            flags,
            route,
            seq,
            body: rest,
        })
    }

    /// Write this frame's already-encoded bytes to an async stream.
    pub async fn write_to<W: AsyncWrite + Unpin>(buf: &[u8], writer: &mut W) -> Result<()> {
        writer.write_all(buf).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let body = b"hello world";
        let encoded = Frame::encode_data(9, 42, body);
        assert_eq!(encoded.len(), 4 + HEADER_SIZE - 4 + body.len());

        let frame = Frame::decode(encoded.freeze()).unwrap();
        assert_eq!(frame.route, 9);
        assert_eq!(frame.seq, 42);
        assert_eq!(&frame.body[..], body);
        assert!(!frame.is_heartbeat());
    }

    #[test]
    fn heartbeat_frame_has_no_body_and_flag_set() {
        let encoded = Frame::encode_heartbeat(0, 1);
        let frame = Frame::decode(encoded.freeze()).unwrap();
        assert!(frame.is_heartbeat());
        assert_eq!(frame.body.len(), 0);
    }

    #[test]
    fn frame_length_matches_declared_size() {
        let encoded = Frame::encode_data(1, 1, b"xyz").freeze();
        let declared = u32::from_be_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]);
        assert_eq!(encoded.len(), 4 + declared as usize);
    }
}
