//! Relayed-delivery payloads (profile 19).
//!
//! Variants: 1 = publish, 2 = ack, 3 = nack, 4 = status, 5 = err. Delivery
//! is at-least-once with duplicate detection keyed by `delivery_id`.

use crate::error::ProtocolResult;
use crate::wire::{
    decode_wrapper, encode_wrapper, fields, put_bool_field, put_bytes_field, put_string_field,
    put_varint_field,
};

pub const MSG_PUBLISH: u64 = 1;
pub const MSG_ACK: u64 = 2;
pub const MSG_NACK: u64 = 3;
pub const MSG_STATUS: u64 = 4;
pub const MSG_ERR: u64 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayPublish {
    pub delivery_id: Vec<u8>,
    pub topic: String,
    pub payload: Vec<u8>,
    pub ttl_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayAck {
    pub delivery_id: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayNack {
    pub delivery_id: Vec<u8>,
    pub retryable: bool,
    pub reason_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStatus {
    pub delivery_id: Vec<u8>,
    pub state: String,
    pub attempt_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayErr {
    pub code: String,
    pub message: String,
}

pub fn encode_publish(v: &RelayPublish) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.delivery_id.is_empty() {
        put_bytes_field(&mut inner, 1, &v.delivery_id);
    }
    if !v.topic.is_empty() {
        put_string_field(&mut inner, 2, &v.topic);
    }
    if !v.payload.is_empty() {
        put_bytes_field(&mut inner, 3, &v.payload);
    }
    if v.ttl_ms != 0 {
        put_varint_field(&mut inner, 4, v.ttl_ms);
    }
    encode_wrapper(MSG_PUBLISH, &inner)
}

pub fn decode_publish(payload: &[u8]) -> ProtocolResult<RelayPublish> {
    let inner = decode_wrapper(payload, MSG_PUBLISH)?;
    let mut out = RelayPublish::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.delivery_id = field.bytes("relay_publish.delivery_id")?.to_vec(),
            2 => out.topic = field.string("relay_publish.topic")?,
            3 => out.payload = field.bytes("relay_publish.payload")?.to_vec(),
            4 => out.ttl_ms = field.as_u64("relay_publish.ttl_ms")?,
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_ack(v: &RelayAck) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.delivery_id.is_empty() {
        put_bytes_field(&mut inner, 1, &v.delivery_id);
    }
    encode_wrapper(MSG_ACK, &inner)
}

pub fn decode_ack(payload: &[u8]) -> ProtocolResult<RelayAck> {
    let inner = decode_wrapper(payload, MSG_ACK)?;
    let mut out = RelayAck::default();
    for field in fields(inner) {
        let field = field?;
        if field.number == 1 {
            out.delivery_id = field.bytes("relay_ack.delivery_id")?.to_vec();
        }
    }
    Ok(out)
}

pub fn encode_nack(v: &RelayNack) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.delivery_id.is_empty() {
        put_bytes_field(&mut inner, 1, &v.delivery_id);
    }
    put_bool_field(&mut inner, 2, v.retryable);
    if !v.reason_code.is_empty() {
        put_string_field(&mut inner, 3, &v.reason_code);
    }
    encode_wrapper(MSG_NACK, &inner)
}

pub fn decode_nack(payload: &[u8]) -> ProtocolResult<RelayNack> {
    let inner = decode_wrapper(payload, MSG_NACK)?;
    let mut out = RelayNack::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.delivery_id = field.bytes("relay_nack.delivery_id")?.to_vec(),
            2 => out.retryable = field.as_bool("relay_nack.retryable")?,
            3 => out.reason_code = field.string("relay_nack.reason_code")?,
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_status(v: &RelayStatus) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.delivery_id.is_empty() {
        put_bytes_field(&mut inner, 1, &v.delivery_id);
    }
    if !v.state.is_empty() {
        put_string_field(&mut inner, 2, &v.state);
    }
    if v.attempt_count != 0 {
        put_varint_field(&mut inner, 3, u64::from(v.attempt_count));
    }
    encode_wrapper(MSG_STATUS, &inner)
}

pub fn decode_status(payload: &[u8]) -> ProtocolResult<RelayStatus> {
    let inner = decode_wrapper(payload, MSG_STATUS)?;
    let mut out = RelayStatus::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.delivery_id = field.bytes("relay_status.delivery_id")?.to_vec(),
            2 => out.state = field.string("relay_status.state")?,
            3 => out.attempt_count = field.as_u64("relay_status.attempt_count")? as u32,
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_err(v: &RelayErr) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.code.is_empty() {
        put_string_field(&mut inner, 1, &v.code);
    }
    if !v.message.is_empty() {
        put_string_field(&mut inner, 2, &v.message);
    }
    encode_wrapper(MSG_ERR, &inner)
}

pub fn decode_err(payload: &[u8]) -> ProtocolResult<RelayErr> {
    let inner = decode_wrapper(payload, MSG_ERR)?;
    let mut out = RelayErr::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.code = field.string("relay_err.code")?,
            2 => out.message = field.string("relay_err.message")?,
            _ => {}
        }
    }
    Ok(out)
}
