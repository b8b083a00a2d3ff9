/// Numeric opcode carried in the frame header's `route` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Bind = 1,
    Unbind = 2,
    GetIP = 3,
    GetState = 4,
    SetState = 5,
    Subscribe = 6,
    Unsubscribe = 7,
    Multicast = 8,
    Deliver = 9,
    Trigger = 10,
}

impl Opcode {
    pub fn from_u8(v: u8) -> crate::error::Result<Self> {
        Ok(match v {
            1 => Opcode::Bind,
            2 => Opcode::Unbind,
            3 => Opcode::GetIP,
            4 => Opcode::GetState,
            5 => Opcode::SetState,
            6 => Opcode::Subscribe,
            7 => Opcode::Unsubscribe,
            8 => Opcode::Multicast,
            9 => Opcode::Deliver,
            10 => Opcode::Trigger,
            _ => return Err(crate::error::GateMeshError::InvalidMessage),
        })
    }
}
