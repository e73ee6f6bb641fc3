//! Event payloads (profile 13).
//!
//! Variants: 1 = publish, 2 = subscribe, 3 = unsubscribe, 4 = batch,
//! 5 = err. Every published event must carry at least one correlation id
//! (msg_id, task_id, or rpc_id); the handler enriches missing ones from the
//! connection's observability document before validating.

use crate::error::ProtocolResult;
use crate::wire::{
    decode_wrapper, encode_wrapper, fields, put_bytes_field, put_string_field, put_varint_field,
};

pub const MSG_PUBLISH: u64 = 1;
pub const MSG_SUBSCRIBE: u64 = 2;
pub const MSG_UNSUBSCRIBE: u64 = 3;
pub const MSG_BATCH: u64 = 4;
pub const MSG_ERR: u64 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventRecord {
    pub event_id: String,
    pub event_type: String,
    pub severity: String,
    pub ts_unix_ms: u64,
    pub msg_id: Vec<u8>,
    pub task_id: Vec<u8>,
    pub rpc_id: Vec<u8>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvtPublish {
    pub event: EventRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvtSubscribe {
    pub filter: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvtUnsubscribe {
    pub subscription_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvtBatch {
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvtErr {
    pub code: String,
    pub message: String,
}

fn encode_record(v: &EventRecord) -> Vec<u8> {
    let mut out = Vec::new();
    if !v.event_id.is_empty() {
        put_string_field(&mut out, 1, &v.event_id);
    }
    if !v.event_type.is_empty() {
        put_string_field(&mut out, 2, &v.event_type);
    }
    if !v.severity.is_empty() {
        put_string_field(&mut out, 3, &v.severity);
    }
    if v.ts_unix_ms != 0 {
        put_varint_field(&mut out, 4, v.ts_unix_ms);
    }
    if !v.msg_id.is_empty() {
        put_bytes_field(&mut out, 5, &v.msg_id);
    }
    if !v.task_id.is_empty() {
        put_bytes_field(&mut out, 6, &v.task_id);
    }
    if !v.rpc_id.is_empty() {
        put_bytes_field(&mut out, 7, &v.rpc_id);
    }
    if !v.body.is_empty() {
        put_bytes_field(&mut out, 8, &v.body);
    }
    out
}

fn decode_record(inner: &[u8]) -> ProtocolResult<EventRecord> {
    let mut out = EventRecord::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.event_id = field.string("event_record.event_id")?,
            2 => out.event_type = field.string("event_record.event_type")?,
            3 => out.severity = field.string("event_record.severity")?,
            4 => out.ts_unix_ms = field.as_u64("event_record.ts_unix_ms")?,
            5 => out.msg_id = field.bytes("event_record.msg_id")?.to_vec(),
            6 => out.task_id = field.bytes("event_record.task_id")?.to_vec(),
            7 => out.rpc_id = field.bytes("event_record.rpc_id")?.to_vec(),
            8 => out.body = field.bytes("event_record.body")?.to_vec(),
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_publish(v: &EvtPublish) -> Vec<u8> {
    let mut inner = Vec::new();
    put_bytes_field(&mut inner, 1, &encode_record(&v.event));
    encode_wrapper(MSG_PUBLISH, &inner)
}

pub fn decode_publish(payload: &[u8]) -> ProtocolResult<EvtPublish> {
    let inner = decode_wrapper(payload, MSG_PUBLISH)?;
    let mut out = EvtPublish::default();
    for field in fields(inner) {
        let field = field?;
        if field.number == 1 {
            out.event = decode_record(field.bytes("evt_publish.event")?)?;
        }
    }
    Ok(out)
}

pub fn encode_subscribe(v: &EvtSubscribe) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.filter.is_empty() {
        put_string_field(&mut inner, 1, &v.filter);
    }
    encode_wrapper(MSG_SUBSCRIBE, &inner)
}

pub fn decode_subscribe(payload: &[u8]) -> ProtocolResult<EvtSubscribe> {
    let inner = decode_wrapper(payload, MSG_SUBSCRIBE)?;
    let mut out = EvtSubscribe::default();
    for field in fields(inner) {
        let field = field?;
        if field.number == 1 {
            out.filter = field.string("evt_subscribe.filter")?;
        }
    }
    Ok(out)
}

pub fn encode_unsubscribe(v: &EvtUnsubscribe) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.subscription_id.is_empty() {
        put_string_field(&mut inner, 1, &v.subscription_id);
    }
    encode_wrapper(MSG_UNSUBSCRIBE, &inner)
}

pub fn decode_unsubscribe(payload: &[u8]) -> ProtocolResult<EvtUnsubscribe> {
    let inner = decode_wrapper(payload, MSG_UNSUBSCRIBE)?;
    let mut out = EvtUnsubscribe::default();
    for field in fields(inner) {
        let field = field?;
        if field.number == 1 {
            out.subscription_id = field.string("evt_unsubscribe.subscription_id")?;
        }
    }
    Ok(out)
}

pub fn encode_batch(v: &EvtBatch) -> Vec<u8> {
    let mut inner = Vec::new();
    for event in &v.events {
        put_bytes_field(&mut inner, 1, &encode_record(event));
    }
    encode_wrapper(MSG_BATCH, &inner)
}

pub fn decode_batch(payload: &[u8]) -> ProtocolResult<EvtBatch> {
    let inner = decode_wrapper(payload, MSG_BATCH)?;
    let mut out = EvtBatch::default();
    for field in fields(inner) {
        let field = field?;
        if field.number == 1 {
            out.events
                .push(decode_record(field.bytes("evt_batch.events")?)?);
        }
    }
    Ok(out)
}

pub fn encode_err(v: &EvtErr) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.code.is_empty() {
        put_string_field(&mut inner, 1, &v.code);
    }
    if !v.message.is_empty() {
        put_string_field(&mut inner, 2, &v.message);
    }
    encode_wrapper(MSG_ERR, &inner)
}

pub fn decode_err(payload: &[u8]) -> ProtocolResult<EvtErr> {
    let inner = decode_wrapper(payload, MSG_ERR)?;
    let mut out = EvtErr::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.code = field.string("evt_err.code")?,
            2 => out.message = field.string("evt_err.message")?,
            _ => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_roundtrip_with_correlation() {
        let publish = EvtPublish {
            event: EventRecord {
                event_id: "evt-1".to_string(),
                event_type: "task.progress".to_string(),
                severity: "info".to_string(),
                ts_unix_ms: 1_720_000_000_000,
                msg_id: b"12345678".to_vec(),
                task_id: b"task-1".to_vec(),
                rpc_id: vec![],
                body: br#"{"pct":50}"#.to_vec(),
            },
        };
        assert_eq!(decode_publish(&encode_publish(&publish)).unwrap(), publish);
    }

    #[test]
    fn empty_batch_decodes() {
        let batch = EvtBatch { events: vec![] };
        assert!(decode_batch(&encode_batch(&batch)).unwrap().events.is_empty());
    }
}
