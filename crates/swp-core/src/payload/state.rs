//! Content-addressed state payloads (profile 17).
//!
//! Variants: 1 = put, 2 = get, 3 = delta, 4 = err. A put is only accepted
//! when `sha256(blob) == state_id` and every declared parent already exists.

use crate::error::ProtocolResult;
use crate::wire::{decode_wrapper, encode_wrapper, fields, put_bytes_field, put_string_field};

pub const MSG_PUT: u64 = 1;
pub const MSG_GET: u64 = 2;
pub const MSG_DELTA: u64 = 3;
pub const MSG_ERR: u64 = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatePut {
    pub state_id: Vec<u8>,
    pub blob: Vec<u8>,
    pub parent_ids: Vec<Vec<u8>>,
    pub metadata: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateGet {
    pub state_id: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDelta {
    pub state_id: Vec<u8>,
    pub delta: Vec<u8>,
    pub parent_ids: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateErr {
    pub code: String,
    pub message: String,
}

pub fn encode_put(v: &StatePut) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.state_id.is_empty() {
        put_bytes_field(&mut inner, 1, &v.state_id);
    }
    if !v.blob.is_empty() {
        put_bytes_field(&mut inner, 2, &v.blob);
    }
    for parent in &v.parent_ids {
        put_bytes_field(&mut inner, 3, parent);
    }
    if !v.metadata.is_empty() {
        put_bytes_field(&mut inner, 4, &v.metadata);
    }
    encode_wrapper(MSG_PUT, &inner)
}

pub fn decode_put(payload: &[u8]) -> ProtocolResult<StatePut> {
    let inner = decode_wrapper(payload, MSG_PUT)?;
    let mut out = StatePut::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.state_id = field.bytes("state_put.state_id")?.to_vec(),
            2 => out.blob = field.bytes("state_put.blob")?.to_vec(),
            3 => out.parent_ids.push(field.bytes("state_put.parent_ids")?.to_vec()),
            4 => out.metadata = field.bytes("state_put.metadata")?.to_vec(),
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_get(v: &StateGet) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.state_id.is_empty() {
        put_bytes_field(&mut inner, 1, &v.state_id);
    }
    encode_wrapper(MSG_GET, &inner)
}

pub fn decode_get(payload: &[u8]) -> ProtocolResult<StateGet> {
    let inner = decode_wrapper(payload, MSG_GET)?;
    let mut out = StateGet::default();
    for field in fields(inner) {
        let field = field?;
        if field.number == 1 {
            out.state_id = field.bytes("state_get.state_id")?.to_vec();
        }
    }
    Ok(out)
}

pub fn encode_delta(v: &StateDelta) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.state_id.is_empty() {
        put_bytes_field(&mut inner, 1, &v.state_id);
    }
    if !v.delta.is_empty() {
        put_bytes_field(&mut inner, 2, &v.delta);
    }
    for parent in &v.parent_ids {
        put_bytes_field(&mut inner, 3, parent);
    }
    encode_wrapper(MSG_DELTA, &inner)
}

pub fn decode_delta(payload: &[u8]) -> ProtocolResult<StateDelta> {
    let inner = decode_wrapper(payload, MSG_DELTA)?;
    let mut out = StateDelta::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.state_id = field.bytes("state_delta.state_id")?.to_vec(),
            2 => out.delta = field.bytes("state_delta.delta")?.to_vec(),
            3 => out
                .parent_ids
                .push(field.bytes("state_delta.parent_ids")?.to_vec()),
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_err(v: &StateErr) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.code.is_empty() {
        put_string_field(&mut inner, 1, &v.code);
    }
    if !v.message.is_empty() {
        put_string_field(&mut inner, 2, &v.message);
    }
    encode_wrapper(MSG_ERR, &inner)
}

pub fn decode_err(payload: &[u8]) -> ProtocolResult<StateErr> {
    let inner = decode_wrapper(payload, MSG_ERR)?;
    let mut out = StateErr::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.code = field.string("state_err.code")?,
            2 => out.message = field.string("state_err.message")?,
            _ => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_roundtrip_with_parents() {
        let put = StatePut {
            state_id: vec![0xaa; 32],
            blob: b"state-blob".to_vec(),
            parent_ids: vec![vec![0x01; 32], vec![0x02; 32]],
            metadata: vec![],
        };
        let decoded = decode_put(&encode_put(&put)).unwrap();
        assert_eq!(decoded, put);
        assert_eq!(decoded.parent_ids.len(), 2);
    }
}
