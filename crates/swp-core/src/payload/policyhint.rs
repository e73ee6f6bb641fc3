//! Policy-hint payloads (profile 16).
//!
//! Variants: 1 = set, 2 = ack, 3 = violation, 4 = err. Constraint mode is
//! one of MUST/SHOULD/MAY; an empty mode defaults to MAY at the handler.

use crate::error::ProtocolResult;
use crate::wire::{decode_wrapper, encode_wrapper, fields, put_bytes_field, put_string_field};

pub const MSG_SET: u64 = 1;
pub const MSG_ACK: u64 = 2;
pub const MSG_VIOLATION: u64 = 3;
pub const MSG_ERR: u64 = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraint {
    pub key: String,
    pub value: String,
    pub mode: String,
    pub scope_ref: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyHintSet {
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyHintAck {
    pub ack_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyViolation {
    pub key: String,
    pub scope_ref: String,
    pub reason_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyErr {
    pub code: String,
    pub message: String,
}

fn encode_constraint(v: &Constraint) -> Vec<u8> {
    let mut out = Vec::new();
    if !v.key.is_empty() {
        put_string_field(&mut out, 1, &v.key);
    }
    if !v.value.is_empty() {
        put_string_field(&mut out, 2, &v.value);
    }
    if !v.mode.is_empty() {
        put_string_field(&mut out, 3, &v.mode);
    }
    if !v.scope_ref.is_empty() {
        put_string_field(&mut out, 4, &v.scope_ref);
    }
    out
}

fn decode_constraint(inner: &[u8]) -> ProtocolResult<Constraint> {
    let mut out = Constraint::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.key = field.string("constraint.key")?,
            2 => out.value = field.string("constraint.value")?,
            3 => out.mode = field.string("constraint.mode")?,
            4 => out.scope_ref = field.string("constraint.scope_ref")?,
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_set(v: &PolicyHintSet) -> Vec<u8> {
    let mut inner = Vec::new();
    for constraint in &v.constraints {
        put_bytes_field(&mut inner, 1, &encode_constraint(constraint));
    }
    encode_wrapper(MSG_SET, &inner)
}

pub fn decode_set(payload: &[u8]) -> ProtocolResult<PolicyHintSet> {
    let inner = decode_wrapper(payload, MSG_SET)?;
    let mut out = PolicyHintSet::default();
    for field in fields(inner) {
        let field = field?;
        if field.number == 1 {
            out.constraints
                .push(decode_constraint(field.bytes("policy_hint_set.constraints")?)?);
        }
    }
    Ok(out)
}

pub fn encode_ack(v: &PolicyHintAck) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.ack_id.is_empty() {
        put_string_field(&mut inner, 1, &v.ack_id);
    }
    encode_wrapper(MSG_ACK, &inner)
}

pub fn decode_ack(payload: &[u8]) -> ProtocolResult<PolicyHintAck> {
    let inner = decode_wrapper(payload, MSG_ACK)?;
    let mut out = PolicyHintAck::default();
    for field in fields(inner) {
        let field = field?;
        if field.number == 1 {
            out.ack_id = field.string("policy_hint_ack.ack_id")?;
        }
    }
    Ok(out)
}

pub fn encode_violation(v: &PolicyViolation) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.key.is_empty() {
        put_string_field(&mut inner, 1, &v.key);
    }
    if !v.scope_ref.is_empty() {
        put_string_field(&mut inner, 2, &v.scope_ref);
    }
    if !v.reason_code.is_empty() {
        put_string_field(&mut inner, 3, &v.reason_code);
    }
    encode_wrapper(MSG_VIOLATION, &inner)
}

pub fn decode_violation(payload: &[u8]) -> ProtocolResult<PolicyViolation> {
    let inner = decode_wrapper(payload, MSG_VIOLATION)?;
    let mut out = PolicyViolation::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.key = field.string("policy_violation.key")?,
            2 => out.scope_ref = field.string("policy_violation.scope_ref")?,
            3 => out.reason_code = field.string("policy_violation.reason_code")?,
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_err(v: &PolicyErr) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.code.is_empty() {
        put_string_field(&mut inner, 1, &v.code);
    }
    if !v.message.is_empty() {
        put_string_field(&mut inner, 2, &v.message);
    }
    encode_wrapper(MSG_ERR, &inner)
}

pub fn decode_err(payload: &[u8]) -> ProtocolResult<PolicyErr> {
    let inner = decode_wrapper(payload, MSG_ERR)?;
    let mut out = PolicyErr::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.code = field.string("policy_err.code")?,
            2 => out.message = field.string("policy_err.message")?,
            _ => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_roundtrip_with_multiple_constraints() {
        let set = PolicyHintSet {
            constraints: vec![
                Constraint {
                    key: "region".to_string(),
                    value: "eu-west-1".to_string(),
                    mode: "MUST".to_string(),
                    scope_ref: "task-1".to_string(),
                },
                Constraint {
                    key: "cost_limit".to_string(),
                    value: "100".to_string(),
                    mode: String::new(),
                    scope_ref: String::new(),
                },
            ],
        };
        assert_eq!(decode_set(&encode_set(&set)).unwrap(), set);
    }

    #[test]
    fn violation_roundtrip() {
        let violation = PolicyViolation {
            key: "unknown_key".to_string(),
            scope_ref: String::new(),
            reason_code: "UNKNOWN_KEY".to_string(),
        };
        assert_eq!(
            decode_violation(&encode_violation(&violation)).unwrap(),
            violation
        );
    }
}
