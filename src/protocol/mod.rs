//! Internal wire protocol for intra-cluster communication.
//!
//! Every frame shares one fixed header:
//!
//! ```text
//! +---------+---------+---------+---------+
//! | size    | flags   | route   | seq     |
//! | u32 BE  | u8      | u8      | u64 BE  |
//! +---------+---------+---------+---------+
//! ```
//!
//! `size` counts bytes following itself (flags + route + seq + body).
//! `flags` bit 0 marks a heartbeat frame (no body); all other bits are
//! reserved and must be preserved, not rejected, by decoders. `route` is
//! the numeric [`Opcode`] for this frame, not the client-level application
//! route (that lives inside the `Deliver`/`Trigger` payload).
//!
//! This module intentionally treats encryption of the intra-cluster
//! protocol as out of scope: the network between Gate and Node is trusted.

pub mod codec;
pub mod frame;
pub mod opcode;
pub mod packer;

pub use codec::*;
pub use frame::{Frame, HEADER_SIZE};
pub use opcode::Opcode;
pub use packer::{ClientPacker, DefaultPacker};

/// Single bit distinguishing data frames from heartbeat frames.
pub const HEARTBEAT_FLAG: u8 = 0b0000_0001;

/// `kind` discriminator for a session target, per spec 4.1/6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionKind {
    User = 0,
    Gate = 1,
}

impl SessionKind {
    pub fn from_u8(v: u8) -> crate::error::Result<Self> {
        match v {
            0 => Ok(SessionKind::User),
            1 => Ok(SessionKind::Gate),
            _ => Err(crate::error::GateMeshError::InvalidMessage),
        }
    }
}

/// Transport-level error code carried in the `code: u16` field of every
/// response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Code {
    Ok = 0,
    NotFoundSession = 1,
    NotFoundRoute = 2,
    NotFoundEndpoint = 3,
    NotFoundUser = 4,
    Unauthorized = 5,
    InvalidMessage = 6,
    Internal = 7,
}

impl Code {
    pub fn from_u16(v: u16) -> Self {
        match v {
            0 => Code::Ok,
            1 => Code::NotFoundSession,
            2 => Code::NotFoundRoute,
            3 => Code::NotFoundEndpoint,
            4 => Code::NotFoundUser,
            5 => Code::Unauthorized,
            6 => Code::InvalidMessage,
            _ => Code::Internal,
        }
    }
}
