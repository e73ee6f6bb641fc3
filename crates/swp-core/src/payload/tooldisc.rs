//! Tool-catalog discovery payloads (profile 11).
//!
//! Variants: 1 = list req, 2 = list resp, 3 = get req, 4 = get resp,
//! 5 = err. List pagination uses an opaque page token that is the numeric
//! offset into the filtered result list.

use crate::error::ProtocolResult;
use crate::wire::{
    decode_wrapper, encode_wrapper, fields, put_bytes_field, put_string_field, put_varint_field,
};

pub const MSG_LIST_REQ: u64 = 1;
pub const MSG_LIST_RESP: u64 = 2;
pub const MSG_GET_REQ: u64 = 3;
pub const MSG_GET_RESP: u64 = 4;
pub const MSG_ERR: u64 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub tool_id: String,
    pub name: String,
    pub version: String,
    pub schema_ref: String,
    pub descriptor_payload: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TooldiscListReq {
    pub page_size: u32,
    pub page_token: String,
    pub filter: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TooldiscListResp {
    pub tools: Vec<ToolDescriptor>,
    pub next_page_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TooldiscGetReq {
    pub tool_id: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TooldiscGetResp {
    pub tool: ToolDescriptor,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TooldiscErr {
    pub code: String,
    pub message: String,
}

fn encode_descriptor(v: &ToolDescriptor) -> Vec<u8> {
    let mut out = Vec::new();
    if !v.tool_id.is_empty() {
        put_string_field(&mut out, 1, &v.tool_id);
    }
    if !v.name.is_empty() {
        put_string_field(&mut out, 2, &v.name);
    }
    if !v.version.is_empty() {
        put_string_field(&mut out, 3, &v.version);
    }
    if !v.schema_ref.is_empty() {
        put_string_field(&mut out, 4, &v.schema_ref);
    }
    if !v.descriptor_payload.is_empty() {
        put_bytes_field(&mut out, 5, &v.descriptor_payload);
    }
    out
}

fn decode_descriptor(inner: &[u8]) -> ProtocolResult<ToolDescriptor> {
    let mut out = ToolDescriptor::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.tool_id = field.string("tool_descriptor.tool_id")?,
            2 => out.name = field.string("tool_descriptor.name")?,
            3 => out.version = field.string("tool_descriptor.version")?,
            4 => out.schema_ref = field.string("tool_descriptor.schema_ref")?,
            5 => {
                out.descriptor_payload = field.bytes("tool_descriptor.descriptor_payload")?.to_vec();
            }
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_list_req(v: &TooldiscListReq) -> Vec<u8> {
    let mut inner = Vec::new();
    if v.page_size != 0 {
        put_varint_field(&mut inner, 1, u64::from(v.page_size));
    }
    if !v.page_token.is_empty() {
        put_string_field(&mut inner, 2, &v.page_token);
    }
    if !v.filter.is_empty() {
        put_string_field(&mut inner, 3, &v.filter);
    }
    encode_wrapper(MSG_LIST_REQ, &inner)
}

pub fn decode_list_req(payload: &[u8]) -> ProtocolResult<TooldiscListReq> {
    let inner = decode_wrapper(payload, MSG_LIST_REQ)?;
    let mut out = TooldiscListReq::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.page_size = field.as_u64("tooldisc_list_req.page_size")? as u32,
            2 => out.page_token = field.string("tooldisc_list_req.page_token")?,
            3 => out.filter = field.string("tooldisc_list_req.filter")?,
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_list_resp(v: &TooldiscListResp) -> Vec<u8> {
    let mut inner = Vec::new();
    for tool in &v.tools {
        put_bytes_field(&mut inner, 1, &encode_descriptor(tool));
    }
    if !v.next_page_token.is_empty() {
        put_string_field(&mut inner, 2, &v.next_page_token);
    }
    encode_wrapper(MSG_LIST_RESP, &inner)
}

pub fn decode_list_resp(payload: &[u8]) -> ProtocolResult<TooldiscListResp> {
    let inner = decode_wrapper(payload, MSG_LIST_RESP)?;
    let mut out = TooldiscListResp::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out
                .tools
                .push(decode_descriptor(field.bytes("tooldisc_list_resp.tools")?)?),
            2 => out.next_page_token = field.string("tooldisc_list_resp.next_page_token")?,
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_get_req(v: &TooldiscGetReq) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.tool_id.is_empty() {
        put_string_field(&mut inner, 1, &v.tool_id);
    }
    if !v.version.is_empty() {
        put_string_field(&mut inner, 2, &v.version);
    }
    encode_wrapper(MSG_GET_REQ, &inner)
}

pub fn decode_get_req(payload: &[u8]) -> ProtocolResult<TooldiscGetReq> {
    let inner = decode_wrapper(payload, MSG_GET_REQ)?;
    let mut out = TooldiscGetReq::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.tool_id = field.string("tooldisc_get_req.tool_id")?,
            2 => out.version = field.string("tooldisc_get_req.version")?,
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_get_resp(v: &TooldiscGetResp) -> Vec<u8> {
    let mut inner = Vec::new();
    put_bytes_field(&mut inner, 1, &encode_descriptor(&v.tool));
    encode_wrapper(MSG_GET_RESP, &inner)
}

pub fn decode_get_resp(payload: &[u8]) -> ProtocolResult<TooldiscGetResp> {
    let inner = decode_wrapper(payload, MSG_GET_RESP)?;
    let mut out = TooldiscGetResp::default();
    for field in fields(inner) {
        let field = field?;
        if field.number == 1 {
            out.tool = decode_descriptor(field.bytes("tooldisc_get_resp.tool")?)?;
        }
    }
    Ok(out)
}

pub fn encode_err(v: &TooldiscErr) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.code.is_empty() {
        put_string_field(&mut inner, 1, &v.code);
    }
    if !v.message.is_empty() {
        put_string_field(&mut inner, 2, &v.message);
    }
    encode_wrapper(MSG_ERR, &inner)
}

pub fn decode_err(payload: &[u8]) -> ProtocolResult<TooldiscErr> {
    let inner = decode_wrapper(payload, MSG_ERR)?;
    let mut out = TooldiscErr::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.code = field.string("tooldisc_err.code")?,
            2 => out.message = field.string("tooldisc_err.message")?,
            _ => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_resp_with_nested_descriptors() {
        let resp = TooldiscListResp {
            tools: vec![
                ToolDescriptor {
                    tool_id: "echo".to_string(),
                    name: "Echo".to_string(),
                    version: "1.0.0".to_string(),
                    schema_ref: "swp://schemas/tools/echo/v1".to_string(),
                    descriptor_payload: vec![],
                },
                ToolDescriptor {
                    tool_id: "count".to_string(),
                    name: "Counter".to_string(),
                    version: "1.0.0".to_string(),
                    schema_ref: "swp://schemas/tools/count/v1".to_string(),
                    descriptor_payload: vec![],
                },
            ],
            next_page_token: "2".to_string(),
        };
        assert_eq!(decode_list_resp(&encode_list_resp(&resp)).unwrap(), resp);
    }

    #[test]
    fn list_req_defaults() {
        let req = TooldiscListReq::default();
        let decoded = decode_list_req(&encode_list_req(&req)).unwrap();
        assert_eq!(decoded.page_size, 0);
        assert!(decoded.page_token.is_empty());
    }
}
