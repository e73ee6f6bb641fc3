//! RPC payloads with streaming (profile 12).
//!
//! Variants: 1 = req, 2 = resp, 3 = err, 4 = stream item, 5 = cancel. For a
//! streaming method the items precede exactly one terminal response in wire
//! order.

use crate::error::{ProtocolError, ProtocolResult};
use crate::wire::{
    decode_wrapper, encode_wrapper, fields, put_bool_field, put_bytes_field, put_string_field,
    put_varint_field,
};

pub const MSG_REQ: u64 = 1;
pub const MSG_RESP: u64 = 2;
pub const MSG_ERR: u64 = 3;
pub const MSG_STREAM_ITEM: u64 = 4;
pub const MSG_CANCEL: u64 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcReq {
    pub rpc_id: Vec<u8>,
    pub method: String,
    pub params: Vec<u8>,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcResp {
    pub rpc_id: Vec<u8>,
    pub result: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcErr {
    pub rpc_id: Vec<u8>,
    pub error_code: String,
    pub retryable: bool,
    pub error_message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcStreamItem {
    pub rpc_id: Vec<u8>,
    pub seq_no: u64,
    pub item: Vec<u8>,
    pub is_terminal: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcCancel {
    pub rpc_id: Vec<u8>,
    pub reason: String,
}

pub fn encode_req(v: &RpcReq) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.rpc_id.is_empty() {
        put_bytes_field(&mut inner, 1, &v.rpc_id);
    }
    if !v.method.is_empty() {
        put_string_field(&mut inner, 2, &v.method);
    }
    if !v.params.is_empty() {
        put_bytes_field(&mut inner, 3, &v.params);
    }
    if !v.idempotency_key.is_empty() {
        put_string_field(&mut inner, 4, &v.idempotency_key);
    }
    encode_wrapper(MSG_REQ, &inner)
}

/// Decodes a request payload; `method` is required.
pub fn decode_req(payload: &[u8]) -> ProtocolResult<RpcReq> {
    let inner = decode_wrapper(payload, MSG_REQ)?;
    let mut out = RpcReq::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.rpc_id = field.bytes("rpc_req.rpc_id")?.to_vec(),
            2 => out.method = field.string("rpc_req.method")?,
            3 => out.params = field.bytes("rpc_req.params")?.to_vec(),
            4 => out.idempotency_key = field.string("rpc_req.idempotency_key")?,
            _ => {}
        }
    }
    if out.method.is_empty() {
        return Err(ProtocolError::invalid_envelope("rpc_req.method required"));
    }
    Ok(out)
}

pub fn encode_resp(v: &RpcResp) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.rpc_id.is_empty() {
        put_bytes_field(&mut inner, 1, &v.rpc_id);
    }
    // Result is always present, even when empty, so a terminal response is
    // distinguishable from a bare ack.
    put_bytes_field(&mut inner, 2, &v.result);
    encode_wrapper(MSG_RESP, &inner)
}

pub fn decode_resp(payload: &[u8]) -> ProtocolResult<RpcResp> {
    let inner = decode_wrapper(payload, MSG_RESP)?;
    let mut out = RpcResp::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.rpc_id = field.bytes("rpc_resp.rpc_id")?.to_vec(),
            2 => out.result = field.bytes("rpc_resp.result")?.to_vec(),
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_err(v: &RpcErr) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.rpc_id.is_empty() {
        put_bytes_field(&mut inner, 1, &v.rpc_id);
    }
    if !v.error_code.is_empty() {
        put_string_field(&mut inner, 2, &v.error_code);
    }
    put_bool_field(&mut inner, 3, v.retryable);
    if !v.error_message.is_empty() {
        put_string_field(&mut inner, 4, &v.error_message);
    }
    encode_wrapper(MSG_ERR, &inner)
}

pub fn decode_err(payload: &[u8]) -> ProtocolResult<RpcErr> {
    let inner = decode_wrapper(payload, MSG_ERR)?;
    let mut out = RpcErr::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.rpc_id = field.bytes("rpc_err.rpc_id")?.to_vec(),
            2 => out.error_code = field.string("rpc_err.error_code")?,
            3 => out.retryable = field.as_bool("rpc_err.retryable")?,
            4 => out.error_message = field.string("rpc_err.error_message")?,
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_stream_item(v: &RpcStreamItem) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.rpc_id.is_empty() {
        put_bytes_field(&mut inner, 1, &v.rpc_id);
    }
    put_varint_field(&mut inner, 2, v.seq_no);
    put_bytes_field(&mut inner, 3, &v.item);
    put_bool_field(&mut inner, 4, v.is_terminal);
    encode_wrapper(MSG_STREAM_ITEM, &inner)
}

pub fn decode_stream_item(payload: &[u8]) -> ProtocolResult<RpcStreamItem> {
    let inner = decode_wrapper(payload, MSG_STREAM_ITEM)?;
    let mut out = RpcStreamItem::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.rpc_id = field.bytes("rpc_stream_item.rpc_id")?.to_vec(),
            2 => out.seq_no = field.as_u64("rpc_stream_item.seq_no")?,
            3 => out.item = field.bytes("rpc_stream_item.item")?.to_vec(),
            4 => out.is_terminal = field.as_bool("rpc_stream_item.is_terminal")?,
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_cancel(v: &RpcCancel) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.rpc_id.is_empty() {
        put_bytes_field(&mut inner, 1, &v.rpc_id);
    }
    if !v.reason.is_empty() {
        put_string_field(&mut inner, 2, &v.reason);
    }
    encode_wrapper(MSG_CANCEL, &inner)
}

pub fn decode_cancel(payload: &[u8]) -> ProtocolResult<RpcCancel> {
    let inner = decode_wrapper(payload, MSG_CANCEL)?;
    let mut out = RpcCancel::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.rpc_id = field.bytes("rpc_cancel.rpc_id")?.to_vec(),
            2 => out.reason = field.string("rpc_cancel.reason")?,
            _ => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_requires_method() {
        let req = RpcReq {
            rpc_id: b"rpc-1".to_vec(),
            method: String::new(),
            params: vec![],
            idempotency_key: String::new(),
        };
        assert!(decode_req(&encode_req(&req)).is_err());

        let req = RpcReq {
            method: "demo.echo".to_string(),
            ..req
        };
        assert_eq!(decode_req(&encode_req(&req)).unwrap().method, "demo.echo");
    }

    #[test]
    fn stream_item_roundtrip() {
        let item = RpcStreamItem {
            rpc_id: b"rpc-1".to_vec(),
            seq_no: 42,
            item: b"42".to_vec(),
            is_terminal: false,
        };
        assert_eq!(decode_stream_item(&encode_stream_item(&item)).unwrap(), item);
    }

    #[test]
    fn empty_result_still_decodes() {
        let resp = RpcResp {
            rpc_id: b"rpc-1".to_vec(),
            result: vec![],
        };
        let decoded = decode_resp(&encode_resp(&resp)).unwrap();
        assert!(decoded.result.is_empty());
    }

    #[test]
    fn err_retryable_flag_roundtrip() {
        let err = RpcErr {
            rpc_id: vec![],
            error_code: "cancelled".to_string(),
            retryable: true,
            error_message: "cancel received".to_string(),
        };
        let decoded = decode_err(&encode_err(&err)).unwrap();
        assert!(decoded.retryable);
        assert_eq!(decoded.error_code, "cancelled");
    }
}
