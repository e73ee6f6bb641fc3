//! A2A handler (profile 2): agent-to-agent task lifecycle.
//!
//! Lifecycle invariants:
//!
//! - A handshake requires a non-empty `agent_id`.
//! - The first TASK for a `task_id` creates the record; an identical
//!   duplicate is idempotent, a divergent one is a violation.
//! - Events require a known, non-terminal task.
//! - A result makes the task terminal; identical repeats are idempotent,
//!   divergent repeats are violations.
//! - Tasks whose kind starts with `unsupported`, or whose input contains
//!   `malformed`, are answered with a synthetic failing result.

use std::sync::Arc;

use swp_core::payload::a2a::{self, TaskResult};
use swp_core::{
    Clock, Envelope, ProfileHandler, ProfileId, ProtocolError, ProtocolResult, RequestContext,
};
use tracing::debug;

use super::reply_envelope;
use crate::backends::{A2aError, RuntimeBackends};
use crate::telemetry;

pub struct A2aHandler {
    backends: RuntimeBackends,
    clock: Arc<dyn Clock>,
}

impl A2aHandler {
    #[must_use]
    pub fn new(backends: RuntimeBackends, clock: Arc<dyn Clock>) -> Self {
        Self { backends, clock }
    }

    fn failing_result(
        &self,
        ctx: &RequestContext,
        env: &Envelope,
        task_id: &[u8],
        error_message: &str,
    ) -> Vec<Envelope> {
        telemetry::emit_profile_event(
            &self.backends,
            ctx,
            env,
            &self.clock,
            "a2a.task.rejected",
            "warn",
            serde_json::json!({ "error": error_message }),
            task_id,
            &[],
        );
        let payload = a2a::encode_result(&TaskResult {
            task_id: task_id.to_vec(),
            ok: false,
            output: Vec::new(),
            error_message: error_message.to_string(),
        });
        vec![reply_envelope(
            ProfileId::A2A,
            &env.msg_id,
            a2a::MSG_RESULT,
            self.clock.now_unix_ms(),
            payload,
        )]
    }
}

impl ProfileHandler for A2aHandler {
    fn handle(&self, ctx: &RequestContext, env: &Envelope) -> ProtocolResult<Vec<Envelope>> {
        match env.msg_type {
            a2a::MSG_HANDSHAKE => {
                let hs = a2a::decode_handshake(&env.payload)
                    .map_err(|e| e.context("invalid A2A handshake payload"))?;
                if hs.agent_id.trim().is_empty() {
                    return Err(ProtocolError::invalid_envelope("agent_id required"));
                }
                debug!(agent_id = %hs.agent_id, "a2a handshake");
                Ok(vec![])
            }

            a2a::MSG_TASK => {
                let task = a2a::decode_task(&env.payload)
                    .map_err(|e| e.context("invalid A2A task payload"))?;
                if task.task_id.is_empty() {
                    return Err(ProtocolError::invalid_envelope("task_id required"));
                }
                if task.kind.trim().is_empty() {
                    return Err(ProtocolError::invalid_envelope("task kind required"));
                }

                let created = self
                    .backends
                    .a2a
                    .upsert_task(&task.task_id, &task.kind, &task.input)
                    .map_err(|_| {
                        ProtocolError::invalid_envelope("conflicting duplicate task_id")
                    })?;
                if !created {
                    // Idempotent duplicate.
                    return Ok(vec![]);
                }

                if task.kind.to_ascii_lowercase().starts_with("unsupported") {
                    return Ok(self.failing_result(ctx, env, &task.task_id, "unsupported capability"));
                }
                if contains_ignore_case(&task.input, b"malformed") {
                    return Ok(self.failing_result(ctx, env, &task.task_id, "malformed task input"));
                }
                Ok(vec![])
            }

            a2a::MSG_EVENT => {
                let event = a2a::decode_event(&env.payload)
                    .map_err(|e| e.context("invalid A2A event payload"))?;
                if event.task_id.is_empty() {
                    return Err(ProtocolError::invalid_envelope("task_id required"));
                }
                if event.message.trim().is_empty() && event.event_payload.is_empty() {
                    return Err(ProtocolError::invalid_envelope("event content required"));
                }
                let task = self
                    .backends
                    .a2a
                    .get_task(&event.task_id)
                    .ok_or_else(|| ProtocolError::invalid_envelope("unknown task_id"))?;
                if task.terminal {
                    return Err(ProtocolError::invalid_envelope("event after terminal result"));
                }
                Ok(vec![])
            }

            a2a::MSG_RESULT => {
                let result = a2a::decode_result(&env.payload)
                    .map_err(|e| e.context("invalid A2A result payload"))?;
                if result.task_id.is_empty() {
                    return Err(ProtocolError::invalid_envelope("task_id required"));
                }
                self.backends
                    .a2a
                    .set_terminal(&result.task_id, result.ok, &result.output, &result.error_message)
                    .map_err(|e| match e {
                        A2aError::UnknownTask => {
                            ProtocolError::invalid_envelope("unknown task_id")
                        }
                        A2aError::TerminalConflict => ProtocolError::invalid_envelope(
                            "conflicting duplicate terminal result",
                        ),
                        A2aError::TaskConflict => {
                            ProtocolError::internal("unexpected task conflict on terminal")
                        }
                    })?;
                Ok(vec![])
            }

            other => Err(ProtocolError::new(
                swp_core::ErrorCode::UnsupportedMsgType,
                format!("invalid A2A msg_type {other}"),
            )),
        }
    }
}

fn contains_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    let haystack = haystack.to_ascii_lowercase();
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}
