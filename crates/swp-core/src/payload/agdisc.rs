//! Agent-card discovery payloads (profile 10).
//!
//! Variants: 1 = get, 2 = doc, 3 = not-modified, 4 = err. Caching follows
//! the etag convention: a get whose `if_none_match` equals the current etag
//! receives a not-modified reply instead of the document.

use crate::error::ProtocolResult;
use crate::wire::{
    decode_wrapper, encode_wrapper, fields, put_bytes_field, put_string_field, put_varint_field,
};

pub const MSG_GET: u64 = 1;
pub const MSG_DOC: u64 = 2;
pub const MSG_NOT_MODIFIED: u64 = 3;
pub const MSG_ERR: u64 = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgdiscGet {
    pub agent_id: String,
    pub if_none_match: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgdiscDoc {
    pub agent_id: String,
    pub schema_revision: String,
    pub card_payload: Vec<u8>,
    pub etag: String,
    pub max_age_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgdiscNotModified {
    pub agent_id: String,
    pub etag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgdiscErr {
    pub code: String,
    pub message: String,
}

pub fn encode_get(v: &AgdiscGet) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.agent_id.is_empty() {
        put_string_field(&mut inner, 1, &v.agent_id);
    }
    if !v.if_none_match.is_empty() {
        put_string_field(&mut inner, 2, &v.if_none_match);
    }
    encode_wrapper(MSG_GET, &inner)
}

pub fn decode_get(payload: &[u8]) -> ProtocolResult<AgdiscGet> {
    let inner = decode_wrapper(payload, MSG_GET)?;
    let mut out = AgdiscGet::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.agent_id = field.string("agdisc_get.agent_id")?,
            2 => out.if_none_match = field.string("agdisc_get.if_none_match")?,
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_doc(v: &AgdiscDoc) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.agent_id.is_empty() {
        put_string_field(&mut inner, 1, &v.agent_id);
    }
    if !v.schema_revision.is_empty() {
        put_string_field(&mut inner, 2, &v.schema_revision);
    }
    if !v.card_payload.is_empty() {
        put_bytes_field(&mut inner, 3, &v.card_payload);
    }
    if !v.etag.is_empty() {
        put_string_field(&mut inner, 4, &v.etag);
    }
    if v.max_age_ms != 0 {
        put_varint_field(&mut inner, 5, v.max_age_ms);
    }
    encode_wrapper(MSG_DOC, &inner)
}

pub fn decode_doc(payload: &[u8]) -> ProtocolResult<AgdiscDoc> {
    let inner = decode_wrapper(payload, MSG_DOC)?;
    let mut out = AgdiscDoc::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.agent_id = field.string("agdisc_doc.agent_id")?,
            2 => out.schema_revision = field.string("agdisc_doc.schema_revision")?,
            3 => out.card_payload = field.bytes("agdisc_doc.card_payload")?.to_vec(),
            4 => out.etag = field.string("agdisc_doc.etag")?,
            5 => out.max_age_ms = field.as_u64("agdisc_doc.max_age_ms")?,
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_not_modified(v: &AgdiscNotModified) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.agent_id.is_empty() {
        put_string_field(&mut inner, 1, &v.agent_id);
    }
    if !v.etag.is_empty() {
        put_string_field(&mut inner, 2, &v.etag);
    }
    encode_wrapper(MSG_NOT_MODIFIED, &inner)
}

pub fn decode_not_modified(payload: &[u8]) -> ProtocolResult<AgdiscNotModified> {
    let inner = decode_wrapper(payload, MSG_NOT_MODIFIED)?;
    let mut out = AgdiscNotModified::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.agent_id = field.string("agdisc_not_modified.agent_id")?,
            2 => out.etag = field.string("agdisc_not_modified.etag")?,
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_err(v: &AgdiscErr) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.code.is_empty() {
        put_string_field(&mut inner, 1, &v.code);
    }
    if !v.message.is_empty() {
        put_string_field(&mut inner, 2, &v.message);
    }
    encode_wrapper(MSG_ERR, &inner)
}

pub fn decode_err(payload: &[u8]) -> ProtocolResult<AgdiscErr> {
    let inner = decode_wrapper(payload, MSG_ERR)?;
    let mut out = AgdiscErr::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.code = field.string("agdisc_err.code")?,
            2 => out.message = field.string("agdisc_err.message")?,
            _ => {}
        }
    }
    Ok(out)
}
