//! Observability correlation payloads (profile 18).
//!
//! Variants: 1 = set, 2 = get, 3 = doc, 4 = err. The document is the
//! singleton trace-context record used to enrich emitted events.

use crate::error::ProtocolResult;
use crate::wire::{
    decode_wrapper, encode_wrapper, fields, put_bool_field, put_bytes_field, put_string_field,
};

pub const MSG_SET: u64 = 1;
pub const MSG_GET: u64 = 2;
pub const MSG_DOC: u64 = 3;
pub const MSG_ERR: u64 = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObsSet {
    pub traceparent: String,
    pub tracestate: String,
    pub msg_id: Vec<u8>,
    pub task_id: Vec<u8>,
    pub rpc_id: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObsGet {
    pub include_current: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObsDoc {
    pub traceparent: String,
    pub tracestate: String,
    pub msg_id: Vec<u8>,
    pub task_id: Vec<u8>,
    pub rpc_id: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObsErr {
    pub code: String,
    pub message: String,
}

fn encode_doc_fields(
    traceparent: &str,
    tracestate: &str,
    msg_id: &[u8],
    task_id: &[u8],
    rpc_id: &[u8],
) -> Vec<u8> {
    let mut out = Vec::new();
    if !traceparent.is_empty() {
        put_string_field(&mut out, 1, traceparent);
    }
    if !tracestate.is_empty() {
        put_string_field(&mut out, 2, tracestate);
    }
    if !msg_id.is_empty() {
        put_bytes_field(&mut out, 3, msg_id);
    }
    if !task_id.is_empty() {
        put_bytes_field(&mut out, 4, task_id);
    }
    if !rpc_id.is_empty() {
        put_bytes_field(&mut out, 5, rpc_id);
    }
    out
}

pub fn encode_set(v: &ObsSet) -> Vec<u8> {
    let inner = encode_doc_fields(&v.traceparent, &v.tracestate, &v.msg_id, &v.task_id, &v.rpc_id);
    encode_wrapper(MSG_SET, &inner)
}

pub fn decode_set(payload: &[u8]) -> ProtocolResult<ObsSet> {
    let inner = decode_wrapper(payload, MSG_SET)?;
    let mut out = ObsSet::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.traceparent = field.string("obs_set.traceparent")?,
            2 => out.tracestate = field.string("obs_set.tracestate")?,
            3 => out.msg_id = field.bytes("obs_set.msg_id")?.to_vec(),
            4 => out.task_id = field.bytes("obs_set.task_id")?.to_vec(),
            5 => out.rpc_id = field.bytes("obs_set.rpc_id")?.to_vec(),
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_get(v: &ObsGet) -> Vec<u8> {
    let mut inner = Vec::new();
    put_bool_field(&mut inner, 1, v.include_current);
    encode_wrapper(MSG_GET, &inner)
}

pub fn decode_get(payload: &[u8]) -> ProtocolResult<ObsGet> {
    let inner = decode_wrapper(payload, MSG_GET)?;
    let mut out = ObsGet::default();
    for field in fields(inner) {
        let field = field?;
        if field.number == 1 {
            out.include_current = field.as_bool("obs_get.include_current")?;
        }
    }
    Ok(out)
}

pub fn encode_doc(v: &ObsDoc) -> Vec<u8> {
    let inner = encode_doc_fields(&v.traceparent, &v.tracestate, &v.msg_id, &v.task_id, &v.rpc_id);
    encode_wrapper(MSG_DOC, &inner)
}

pub fn decode_doc(payload: &[u8]) -> ProtocolResult<ObsDoc> {
    let inner = decode_wrapper(payload, MSG_DOC)?;
    let mut out = ObsDoc::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.traceparent = field.string("obs_doc.traceparent")?,
            2 => out.tracestate = field.string("obs_doc.tracestate")?,
            3 => out.msg_id = field.bytes("obs_doc.msg_id")?.to_vec(),
            4 => out.task_id = field.bytes("obs_doc.task_id")?.to_vec(),
            5 => out.rpc_id = field.bytes("obs_doc.rpc_id")?.to_vec(),
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_err(v: &ObsErr) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.code.is_empty() {
        put_string_field(&mut inner, 1, &v.code);
    }
    if !v.message.is_empty() {
        put_string_field(&mut inner, 2, &v.message);
    }
    encode_wrapper(MSG_ERR, &inner)
}

pub fn decode_err(payload: &[u8]) -> ProtocolResult<ObsErr> {
    let inner = decode_wrapper(payload, MSG_ERR)?;
    let mut out = ObsErr::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.code = field.string("obs_err.code")?,
            2 => out.message = field.string("obs_err.message")?,
            _ => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_roundtrip_with_trace_context() {
        let set = ObsSet {
            traceparent: "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01".to_string(),
            tracestate: "vendor=value".to_string(),
            msg_id: b"12345678".to_vec(),
            task_id: vec![],
            rpc_id: vec![],
        };
        assert_eq!(decode_set(&encode_set(&set)).unwrap(), set);
    }
}
