//! Pluggable packer contract.
//!
//! The wire layout is fixed (see [`super`] module docs), but *how* a frame
//! is produced and recognised is kept behind a trait so an alternate
//! transport (e.g. one that wants per-frame compression) can swap in its
//! own packer without touching connection or dispatcher code. [`DefaultPacker`]
//! is the only implementation shipped here and is what every transport uses
//! unless told otherwise.

use crate::error::Result;
use crate::protocol::frame::{Frame, HEADER_SIZE};
use bytes::{Bytes, BytesMut};

/// Message packing/unpacking strategy shared by every connection on a
/// transport. Implementations must be stateless with respect to any single
/// connection — a packer is shared across the whole process.
pub trait ClientPacker: Send + Sync {
    /// Parse one complete frame out of `data`, which holds at least one
    /// full length-prefixed frame starting at offset 0. Returns the parsed
    /// frame and the number of bytes it consumed, so callers buffering a
    /// byte stream (TCP) can advance past it and retry on the remainder.
    /// Returns `Ok(None)` if `data` doesn't yet hold a complete frame.
    fn read_buffer(&self, data: &[u8]) -> Result<Option<(Frame, usize)>>;

    /// Encode a data frame ready to push onto a write queue or socket.
    fn pack_buffer(&self, route: u8, seq: u64, body: &[u8]) -> BytesMut;

    /// Alias for `pack_buffer` at the message (business payload) level.
    fn pack_message(&self, route: u8, seq: u64, body: &[u8]) -> BytesMut {
        self.pack_buffer(route, seq, body)
    }

    /// Parse a single complete, already-delimited frame (e.g. one
    /// WebSocket binary message).
    fn unpack_message(&self, data: Bytes) -> Result<Frame>;

    fn pack_heartbeat(&self, route: u8, seq: u64) -> BytesMut;

    fn check_heartbeat(&self, frame: &Frame) -> bool;
}

/// The packer every transport in this crate uses: the plain fixed header
/// described in the module docs, no compression, no framing tricks.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPacker;

impl ClientPacker for DefaultPacker {
    fn read_buffer(&self, data: &[u8]) -> Result<Option<(Frame, usize)>> {
        if data.len() < 4 {
            return Ok(None);
        }
        let declared = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        let total = 4 + declared;
        if data.len() < total {
            return Ok(None);
        }
        let frame = Frame::decode(Bytes::copy_from_slice(&data[..total]))?;
        Ok(Some((frame, total)))
    }

    fn pack_buffer(&self, route: u8, seq: u64, body: &[u8]) -> BytesMut {
        Frame::encode_data(route, seq, body)
    }

    fn unpack_message(&self, data: Bytes) -> Result<Frame> {
        Frame::decode(data)
    }

    fn pack_heartbeat(&self, route: u8, seq: u64) -> BytesMut {
        Frame::encode_heartbeat(route, seq)
    }

    fn check_heartbeat(&self, frame: &Frame) -> bool {
        frame.is_heartbeat()
    }
}
