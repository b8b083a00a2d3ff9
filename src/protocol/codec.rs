//! Per-opcode encode/decode pairs.
//!
//! Every `encode_*` function returns one contiguous, exactly-sized frame
//! (header + body) built through [`super::frame::Frame::encode_data`].
//! Every `decode_*` function takes the frame body (everything after `seq`)
//! and returns `Err(InvalidMessage)` the moment the declared layout and the
//! observed length disagree — never a partial/garbage parse.

use crate::error::{GateMeshError, Result};
use crate::protocol::frame::Frame;
use crate::protocol::opcode::Opcode;
use crate::protocol::SessionKind;
use bytes::{Buf, BufMut, Bytes, BytesMut};

fn require_len(body: &[u8], exact: usize) -> Result<()> {
    if body.len() != exact {
        return Err(GateMeshError::InvalidMessage);
    }
    Ok(())
}

fn require_min_len(body: &[u8], min: usize) -> Result<()> {
    if body.len() < min {
        return Err(GateMeshError::InvalidMessage);
    }
    Ok(())
}

// ---------------------------------------------------------------- Bind

pub struct BindReq {
    pub uid: i64,
    pub gid: String,
}

pub fn encode_bind_req(seq: u64, uid: i64, gid: &str) -> BytesMut {
    let mut body = BytesMut::with_capacity(8 + gid.len());
    body.put_i64(uid);
    body.put_slice(gid.as_bytes());
    Frame::encode_data(Opcode::Bind as u8, seq, &body)
}

pub fn decode_bind_req(body: &[u8]) -> Result<BindReq> {
    require_min_len(body, 8)?;
    let mut buf = Bytes::copy_from_slice(body);
    let uid = buf.get_i64();
    let gid = String::from_utf8(buf.to_vec()).map_err(|_| GateMeshError::InvalidMessage)?;
    Ok(BindReq { uid, gid })
}

pub fn encode_bind_res(seq: u64, code: u16) -> BytesMut {
    let mut body = BytesMut::with_capacity(2);
    body.put_u16(code);
    Frame::encode_data(Opcode::Bind as u8, seq, &body)
}

pub fn decode_bind_res(body: &[u8]) -> Result<u16> {
    require_len(body, 2)?;
    Ok(Bytes::copy_from_slice(body).get_u16())
}

// --------------------------------------------------------------- Unbind

pub fn encode_unbind_req(seq: u64, uid: i64) -> BytesMut {
    let mut body = BytesMut::with_capacity(8);
    body.put_i64(uid);
    Frame::encode_data(Opcode::Unbind as u8, seq, &body)
}

pub fn decode_unbind_req(body: &[u8]) -> Result<i64> {
    require_len(body, 8)?;
    Ok(Bytes::copy_from_slice(body).get_i64())
}

pub fn encode_unbind_res(seq: u64, code: u16) -> BytesMut {
    let mut body = BytesMut::with_capacity(2);
    body.put_u16(code);
    Frame::encode_data(Opcode::Unbind as u8, seq, &body)
}

pub fn decode_unbind_res(body: &[u8]) -> Result<u16> {
    require_len(body, 2)?;
    Ok(Bytes::copy_from_slice(body).get_u16())
}

// ---------------------------------------------------------------- GetIP

pub struct GetIPReq {
    pub kind: SessionKind,
    pub target: i64,
}

pub fn encode_get_ip_req(seq: u64, kind: SessionKind, target: i64) -> BytesMut {
    let mut body = BytesMut::with_capacity(9);
    body.put_u8(kind as u8);
    body.put_i64(target);
    Frame::encode_data(Opcode::GetIP as u8, seq, &body)
}

pub fn decode_get_ip_req(body: &[u8]) -> Result<GetIPReq> {
    require_len(body, 9)?;
    let mut buf = Bytes::copy_from_slice(body);
    let kind = SessionKind::from_u8(buf.get_u8())?;
    let target = buf.get_i64();
    Ok(GetIPReq { kind, target })
}

pub fn encode_get_ip_res(seq: u64, code: u16, ip: &str) -> BytesMut {
    let mut body = BytesMut::with_capacity(2 + ip.len());
    body.put_u16(code);
    body.put_slice(ip.as_bytes());
    Frame::encode_data(Opcode::GetIP as u8, seq, &body)
}

pub fn decode_get_ip_res(body: &[u8]) -> Result<(u16, String)> {
    require_min_len(body, 2)?;
    let mut buf = Bytes::copy_from_slice(body);
    let code = buf.get_u16();
    let ip = String::from_utf8(buf.to_vec()).map_err(|_| GateMeshError::InvalidMessage)?;
    Ok((code, ip))
}

// ------------------------------------------------------------- GetState

pub fn encode_get_state_req(seq: u64) -> BytesMut {
    Frame::encode_data(Opcode::GetState as u8, seq, &[])
}

pub fn decode_get_state_req(body: &[u8]) -> Result<()> {
    require_len(body, 0)
}

pub fn encode_get_state_res(seq: u64, code: u16, state: u8) -> BytesMut {
    let mut body = BytesMut::with_capacity(3);
    body.put_u16(code);
    body.put_u8(state);
    Frame::encode_data(Opcode::GetState as u8, seq, &body)
}

pub fn decode_get_state_res(body: &[u8]) -> Result<(u16, u8)> {
    require_len(body, 3)?;
    let mut buf = Bytes::copy_from_slice(body);
    Ok((buf.get_u16(), buf.get_u8()))
}

// ------------------------------------------------------------- SetState

pub fn encode_set_state_req(seq: u64, state: u8) -> BytesMut {
    let mut body = BytesMut::with_capacity(1);
    body.put_u8(state);
    Frame::encode_data(Opcode::SetState as u8, seq, &body)
}

pub fn decode_set_state_req(body: &[u8]) -> Result<u8> {
    require_len(body, 1)?;
    Ok(body[0])
}

pub fn encode_set_state_res(seq: u64, code: u16) -> BytesMut {
    let mut body = BytesMut::with_capacity(2);
    body.put_u16(code);
    Frame::encode_data(Opcode::SetState as u8, seq, &body)
}

pub fn decode_set_state_res(body: &[u8]) -> Result<u16> {
    require_len(body, 2)?;
    Ok(Bytes::copy_from_slice(body).get_u16())
}

// ------------------------------------------------------- Subscribe-family

pub struct TargetsReq {
    pub kind: SessionKind,
    pub targets: Vec<i64>,
    pub channel: String,
}

fn encode_targets_req(op: Opcode, seq: u64, kind: SessionKind, targets: &[i64], channel: &str) -> BytesMut {
    let mut body = BytesMut::with_capacity(1 + 2 + targets.len() * 8 + channel.len());
    body.put_u8(kind as u8);
    body.put_u16(targets.len() as u16);
    for t in targets {
        body.put_i64(*t);
    }
    body.put_slice(channel.as_bytes());
    Frame::encode_data(op as u8, seq, &body)
}

fn decode_targets_req(body: &[u8]) -> Result<TargetsReq> {
    require_min_len(body, 3)?;
    let mut buf = Bytes::copy_from_slice(body);
    let kind = SessionKind::from_u8(buf.get_u8())?;
    let count = buf.get_u16() as usize;
    require_min_len(&buf, count * 8)?;
    let mut targets = Vec::with_capacity(count);
    for _ in 0..count {
        targets.push(buf.get_i64());
    }
    let channel = String::from_utf8(buf.to_vec()).map_err(|_| GateMeshError::InvalidMessage)?;
    Ok(TargetsReq {
        kind,
        targets,
        channel,
    })
}

pub fn encode_subscribe_req(seq: u64, kind: SessionKind, targets: &[i64], channel: &str) -> BytesMut {
    encode_targets_req(Opcode::Subscribe, seq, kind, targets, channel)
}

pub fn decode_subscribe_req(body: &[u8]) -> Result<TargetsReq> {
    decode_targets_req(body)
}

pub fn encode_subscribe_res(seq: u64, code: u16) -> BytesMut {
    let mut body = BytesMut::with_capacity(2);
    body.put_u16(code);
    Frame::encode_data(Opcode::Subscribe as u8, seq, &body)
}

pub fn decode_subscribe_res(body: &[u8]) -> Result<u16> {
    require_len(body, 2)?;
    Ok(Bytes::copy_from_slice(body).get_u16())
}

pub fn encode_unsubscribe_req(seq: u64, kind: SessionKind, targets: &[i64], channel: &str) -> BytesMut {
    encode_targets_req(Opcode::Unsubscribe, seq, kind, targets, channel)
}

pub fn decode_unsubscribe_req(body: &[u8]) -> Result<TargetsReq> {
    decode_targets_req(body)
}

pub fn encode_unsubscribe_res(seq: u64, code: u16) -> BytesMut {
    let mut body = BytesMut::with_capacity(2);
    body.put_u16(code);
    Frame::encode_data(Opcode::Unsubscribe as u8, seq, &body)
}

pub fn decode_unsubscribe_res(body: &[u8]) -> Result<u16> {
    require_len(body, 2)?;
    Ok(Bytes::copy_from_slice(body).get_u16())
}

// -------------------------------------------------------------- Multicast

pub struct MulticastReq {
    pub kind: SessionKind,
    pub targets: Vec<i64>,
    pub message: Bytes,
}

pub fn encode_multicast_req(seq: u64, kind: SessionKind, targets: &[i64], message: &[u8]) -> BytesMut {
    let mut body = BytesMut::with_capacity(1 + 2 + targets.len() * 8 + message.len());
    body.put_u8(kind as u8);
    body.put_u16(targets.len() as u16);
    for t in targets {
        body.put_i64(*t);
    }
    body.put_slice(message);
    Frame::encode_data(Opcode::Multicast as u8, seq, &body)
}

pub fn decode_multicast_req(body: &[u8]) -> Result<MulticastReq> {
    require_min_len(body, 3)?;
    let mut buf = Bytes::copy_from_slice(body);
    let kind = SessionKind::from_u8(buf.get_u8())?;
    let count = buf.get_u16() as usize;
    require_min_len(&buf, count * 8)?;
    let mut targets = Vec::with_capacity(count);
    for _ in 0..count {
        targets.push(buf.get_i64());
    }
    Ok(MulticastReq {
        kind,
        targets,
        message: buf,
    })
}

pub fn encode_multicast_res(seq: u64, code: u16, total: i64) -> BytesMut {
    let mut body = BytesMut::with_capacity(10);
    body.put_u16(code);
    body.put_i64(total);
    Frame::encode_data(Opcode::Multicast as u8, seq, &body)
}

pub fn decode_multicast_res(body: &[u8]) -> Result<(u16, i64)> {
    require_len(body, 10)?;
    let mut buf = Bytes::copy_from_slice(body);
    Ok((buf.get_u16(), buf.get_i64()))
}

// ---------------------------------------------------------------- Deliver

pub struct DeliverReq {
    pub cid: i64,
    pub uid: i64,
    pub message: Bytes,
}

pub fn encode_deliver_req(seq: u64, cid: i64, uid: i64, message: &[u8]) -> BytesMut {
    let mut body = BytesMut::with_capacity(16 + message.len());
    body.put_i64(cid);
    body.put_i64(uid);
    body.put_slice(message);
    Frame::encode_data(Opcode::Deliver as u8, seq, &body)
}

pub fn decode_deliver_req(body: &[u8]) -> Result<DeliverReq> {
    require_min_len(body, 16)?;
    let mut buf = Bytes::copy_from_slice(body);
    let cid = buf.get_i64();
    let uid = buf.get_i64();
    Ok(DeliverReq {
        cid,
        uid,
        message: buf,
    })
}

pub fn encode_deliver_res(seq: u64, code: u16) -> BytesMut {
    let mut body = BytesMut::with_capacity(2);
    body.put_u16(code);
    Frame::encode_data(Opcode::Deliver as u8, seq, &body)
}

pub fn decode_deliver_res(body: &[u8]) -> Result<u16> {
    require_len(body, 2)?;
    Ok(Bytes::copy_from_slice(body).get_u16())
}

// ---------------------------------------------------------------- Trigger

pub struct TriggerReq {
    pub event: i32,
    pub cid: i64,
    pub uid: i64,
}

pub fn encode_trigger_req(seq: u64, event: i32, cid: i64, uid: i64) -> BytesMut {
    let mut body = BytesMut::with_capacity(20);
    body.put_i32(event);
    body.put_i64(cid);
    body.put_i64(uid);
    Frame::encode_data(Opcode::Trigger as u8, seq, &body)
}

pub fn decode_trigger_req(body: &[u8]) -> Result<TriggerReq> {
    require_len(body, 20)?;
    let mut buf = Bytes::copy_from_slice(body);
    let event = buf.get_i32();
    let cid = buf.get_i64();
    let uid = buf.get_i64();
    Ok(TriggerReq { event, cid, uid })
}

pub fn encode_trigger_res(seq: u64, code: u16) -> BytesMut {
    let mut body = BytesMut::with_capacity(2);
    body.put_u16(code);
    Frame::encode_data(Opcode::Trigger as u8, seq, &body)
}

pub fn decode_trigger_res(body: &[u8]) -> Result<u16> {
    require_len(body, 2)?;
    Ok(Bytes::copy_from_slice(body).get_u16())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(framed: BytesMut) -> Bytes {
        Frame::decode(framed.freeze()).unwrap().body
    }

    #[test]
    fn bind_roundtrip() {
        let framed = encode_bind_req(7, 42, "gate-1");
        let req = decode_bind_req(&body_of(framed)).unwrap();
        assert_eq!(req.uid, 42);
        assert_eq!(req.gid, "gate-1");

        let framed = encode_bind_res(7, 0);
        assert_eq!(decode_bind_res(&body_of(framed)).unwrap(), 0);
    }

    #[test]
    fn get_state_roundtrip() {
        let framed = encode_get_state_req(1);
        decode_get_state_req(&body_of(framed)).unwrap();

        let framed = encode_get_state_res(1, 0, 3);
        assert_eq!(decode_get_state_res(&body_of(framed)).unwrap(), (0, 3));
    }

    #[test]
    fn subscribe_roundtrip_with_targets() {
        let targets = vec![1, 2, 3];
        let framed = encode_subscribe_req(5, SessionKind::User, &targets, "lobby");
        let req = decode_subscribe_req(&body_of(framed)).unwrap();
        assert_eq!(req.targets, targets);
        assert_eq!(req.channel, "lobby");
    }

    #[test]
    fn multicast_roundtrip_with_empty_targets() {
        let framed = encode_multicast_req(9, SessionKind::User, &[], b"payload");
        let req = decode_multicast_req(&body_of(framed)).unwrap();
        assert!(req.targets.is_empty());
        assert_eq!(&req.message[..], b"payload");

        let framed = encode_multicast_res(9, 0, 20);
        assert_eq!(decode_multicast_res(&body_of(framed)).unwrap(), (0, 20));
    }

    #[test]
    fn deliver_roundtrip() {
        let framed = encode_deliver_req(3, 7, 42, b"hello");
        let req = decode_deliver_req(&body_of(framed)).unwrap();
        assert_eq!(req.cid, 7);
        assert_eq!(req.uid, 42);
        assert_eq!(&req.message[..], b"hello");
    }

    #[test]
    fn trigger_roundtrip() {
        let framed = encode_trigger_req(4, 99, 7, 42);
        let req = decode_trigger_req(&body_of(framed)).unwrap();
        assert_eq!(req.event, 99);
        assert_eq!(req.cid, 7);
        assert_eq!(req.uid, 42);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let framed = encode_bind_res(1, 0).freeze();
        let mut truncated = framed[..framed.len() - 1].to_vec();
        truncated[0..4].copy_from_slice(&((truncated.len() - 4) as u32).to_be_bytes());
        let frame = Frame::decode(Bytes::from(truncated)).unwrap();
        assert!(decode_bind_res(&frame.body).is_err());
    }

    #[test]
    fn unknown_flag_bits_are_preserved_not_rejected() {
        let mut framed = encode_get_state_req(1);
        framed[4] |= 0b1000_0000;
        let frame = Frame::decode(framed.freeze()).unwrap();
        assert!(decode_get_state_req(&frame.body).is_ok());
    }
}
