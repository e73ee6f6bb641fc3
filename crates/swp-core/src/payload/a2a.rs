//! A2A task-lifecycle payloads (profile 2).
//!
//! Variants: 1 = handshake, 2 = task, 3 = event, 4 = result.

use crate::error::ProtocolResult;
use crate::wire::{
    decode_wrapper, encode_wrapper, fields, put_bytes_field, put_string_field, put_varint_field,
};

pub const MSG_HANDSHAKE: u64 = 1;
pub const MSG_TASK: u64 = 2;
pub const MSG_EVENT: u64 = 3;
pub const MSG_RESULT: u64 = 4;

/// Agent introduction opening an A2A exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Handshake {
    pub agent_id: String,
    pub capabilities: Vec<String>,
}

/// Task submission; the first TASK for a `task_id` creates the record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Task {
    pub task_id: Vec<u8>,
    pub kind: String,
    pub input: Vec<u8>,
}

/// Progress event attached to a live task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    pub task_id: Vec<u8>,
    pub message: String,
    pub event_payload: Vec<u8>,
}

/// Terminal result for a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskResult {
    pub task_id: Vec<u8>,
    pub ok: bool,
    pub output: Vec<u8>,
    pub error_message: String,
}

pub fn encode_handshake(v: &Handshake) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.agent_id.is_empty() {
        put_string_field(&mut inner, 1, &v.agent_id);
    }
    for cap in &v.capabilities {
        put_string_field(&mut inner, 2, cap);
    }
    encode_wrapper(MSG_HANDSHAKE, &inner)
}

pub fn decode_handshake(payload: &[u8]) -> ProtocolResult<Handshake> {
    let inner = decode_wrapper(payload, MSG_HANDSHAKE)?;
    let mut out = Handshake::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.agent_id = field.string("a2a_handshake.agent_id")?,
            2 => out
                .capabilities
                .push(field.string("a2a_handshake.capabilities")?),
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_task(v: &Task) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.task_id.is_empty() {
        put_bytes_field(&mut inner, 1, &v.task_id);
    }
    if !v.kind.is_empty() {
        put_string_field(&mut inner, 2, &v.kind);
    }
    if !v.input.is_empty() {
        put_bytes_field(&mut inner, 3, &v.input);
    }
    encode_wrapper(MSG_TASK, &inner)
}

pub fn decode_task(payload: &[u8]) -> ProtocolResult<Task> {
    let inner = decode_wrapper(payload, MSG_TASK)?;
    let mut out = Task::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.task_id = field.bytes("a2a_task.task_id")?.to_vec(),
            2 => out.kind = field.string("a2a_task.kind")?,
            3 => out.input = field.bytes("a2a_task.input")?.to_vec(),
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_event(v: &Event) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.task_id.is_empty() {
        put_bytes_field(&mut inner, 1, &v.task_id);
    }
    if !v.message.is_empty() {
        put_string_field(&mut inner, 2, &v.message);
    }
    if !v.event_payload.is_empty() {
        put_bytes_field(&mut inner, 3, &v.event_payload);
    }
    encode_wrapper(MSG_EVENT, &inner)
}

pub fn decode_event(payload: &[u8]) -> ProtocolResult<Event> {
    let inner = decode_wrapper(payload, MSG_EVENT)?;
    let mut out = Event::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.task_id = field.bytes("a2a_event.task_id")?.to_vec(),
            2 => out.message = field.string("a2a_event.message")?,
            3 => out.event_payload = field.bytes("a2a_event.event_payload")?.to_vec(),
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_result(v: &TaskResult) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.task_id.is_empty() {
        put_bytes_field(&mut inner, 1, &v.task_id);
    }
    if v.ok {
        put_varint_field(&mut inner, 2, 1);
    }
    if !v.output.is_empty() {
        put_bytes_field(&mut inner, 3, &v.output);
    }
    if !v.error_message.is_empty() {
        put_string_field(&mut inner, 4, &v.error_message);
    }
    encode_wrapper(MSG_RESULT, &inner)
}

pub fn decode_result(payload: &[u8]) -> ProtocolResult<TaskResult> {
    let inner = decode_wrapper(payload, MSG_RESULT)?;
    let mut out = TaskResult::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.task_id = field.bytes("a2a_result.task_id")?.to_vec(),
            2 => out.ok = field.as_bool("a2a_result.ok")?,
            3 => out.output = field.bytes("a2a_result.output")?.to_vec(),
            4 => out.error_message = field.string("a2a_result.error_message")?,
            _ => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::put_varint_field;

    #[test]
    fn task_roundtrip() {
        let task = Task {
            task_id: b"task-001".to_vec(),
            kind: "demo.run".to_string(),
            input: b"{\"n\":1}".to_vec(),
        };
        assert_eq!(decode_task(&encode_task(&task)).unwrap(), task);
    }

    #[test]
    fn result_bool_survives() {
        let res = TaskResult {
            task_id: b"task-001".to_vec(),
            ok: true,
            output: b"ok".to_vec(),
            error_message: String::new(),
        };
        let decoded = decode_result(&encode_result(&res)).unwrap();
        assert!(decoded.ok);
        assert_eq!(decoded.output, b"ok");
    }

    #[test]
    fn wrong_variant_rejected() {
        let task = encode_task(&Task::default());
        assert!(decode_event(&task).is_err());
    }

    #[test]
    fn wrong_wire_type_on_kind_rejected() {
        let mut inner = Vec::new();
        put_varint_field(&mut inner, 2, 7); // kind must be length-delimited
        let payload = crate::wire::encode_wrapper(MSG_TASK, &inner);
        assert!(decode_task(&payload).is_err());
    }

    #[test]
    fn handshake_capabilities_accumulate() {
        let hs = Handshake {
            agent_id: "agent.demo".to_string(),
            capabilities: vec!["echo".to_string(), "count".to_string()],
        };
        assert_eq!(decode_handshake(&encode_handshake(&hs)).unwrap(), hs);
    }
}
