//! Credential payloads (profile 15).
//!
//! Variants: 1 = present, 2 = delegate, 3 = revoke, 4 = err. Delegation
//! chains are depth-limited and revocable.

use crate::error::ProtocolResult;
use crate::wire::{
    decode_wrapper, encode_wrapper, fields, put_bytes_field, put_string_field, put_varint_field,
};

pub const MSG_PRESENT: u64 = 1;
pub const MSG_DELEGATE: u64 = 2;
pub const MSG_REVOKE: u64 = 3;
pub const MSG_ERR: u64 = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredPresent {
    pub cred_type: String,
    pub credential: Vec<u8>,
    pub chain_id: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredDelegate {
    pub chain_id: Vec<u8>,
    pub delegation: Vec<u8>,
    pub expires_at_unix_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredRevoke {
    pub chain_id: Vec<u8>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredErr {
    pub code: String,
    pub message: String,
}

pub fn encode_present(v: &CredPresent) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.cred_type.is_empty() {
        put_string_field(&mut inner, 1, &v.cred_type);
    }
    if !v.credential.is_empty() {
        put_bytes_field(&mut inner, 2, &v.credential);
    }
    if !v.chain_id.is_empty() {
        put_bytes_field(&mut inner, 3, &v.chain_id);
    }
    encode_wrapper(MSG_PRESENT, &inner)
}

pub fn decode_present(payload: &[u8]) -> ProtocolResult<CredPresent> {
    let inner = decode_wrapper(payload, MSG_PRESENT)?;
    let mut out = CredPresent::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.cred_type = field.string("cred_present.cred_type")?,
            2 => out.credential = field.bytes("cred_present.credential")?.to_vec(),
            3 => out.chain_id = field.bytes("cred_present.chain_id")?.to_vec(),
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_delegate(v: &CredDelegate) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.chain_id.is_empty() {
        put_bytes_field(&mut inner, 1, &v.chain_id);
    }
    if !v.delegation.is_empty() {
        put_bytes_field(&mut inner, 2, &v.delegation);
    }
    if v.expires_at_unix_ms != 0 {
        put_varint_field(&mut inner, 3, v.expires_at_unix_ms);
    }
    encode_wrapper(MSG_DELEGATE, &inner)
}

pub fn decode_delegate(payload: &[u8]) -> ProtocolResult<CredDelegate> {
    let inner = decode_wrapper(payload, MSG_DELEGATE)?;
    let mut out = CredDelegate::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.chain_id = field.bytes("cred_delegate.chain_id")?.to_vec(),
            2 => out.delegation = field.bytes("cred_delegate.delegation")?.to_vec(),
            3 => out.expires_at_unix_ms = field.as_u64("cred_delegate.expires_at_unix_ms")?,
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_revoke(v: &CredRevoke) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.chain_id.is_empty() {
        put_bytes_field(&mut inner, 1, &v.chain_id);
    }
    if !v.reason.is_empty() {
        put_string_field(&mut inner, 2, &v.reason);
    }
    encode_wrapper(MSG_REVOKE, &inner)
}

pub fn decode_revoke(payload: &[u8]) -> ProtocolResult<CredRevoke> {
    let inner = decode_wrapper(payload, MSG_REVOKE)?;
    let mut out = CredRevoke::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.chain_id = field.bytes("cred_revoke.chain_id")?.to_vec(),
            2 => out.reason = field.string("cred_revoke.reason")?,
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_err(v: &CredErr) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.code.is_empty() {
        put_string_field(&mut inner, 1, &v.code);
    }
    if !v.message.is_empty() {
        put_string_field(&mut inner, 2, &v.message);
    }
    encode_wrapper(MSG_ERR, &inner)
}

pub fn decode_err(payload: &[u8]) -> ProtocolResult<CredErr> {
    let inner = decode_wrapper(payload, MSG_ERR)?;
    let mut out = CredErr::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.code = field.string("cred_err.code")?,
            2 => out.message = field.string("cred_err.message")?,
            _ => {}
        }
    }
    Ok(out)
}
