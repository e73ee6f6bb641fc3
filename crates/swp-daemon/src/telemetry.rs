//! Lifecycle event emission.
//!
//! Handlers publish internal events through the events backend so profile
//! activity shows up on the same bus application events use. Emission is
//! best-effort: a publish failure is logged and never fails the request.

use std::sync::Arc;

use serde_json::Value;
use swp_core::error::canonical_code;
use swp_core::payload::events::EventRecord;
use swp_core::{Clock, Envelope, RequestContext};
use tracing::warn;

use crate::backends::RuntimeBackends;

/// Publishes a profile lifecycle event enriched with correlation ids.
///
/// The body gains `profile_id`, and when it carries a `code` member the
/// canonical form is added as `canonical_code`. Missing task/rpc ids are
/// filled from the request correlation snapshot, then from the current
/// observability document.
#[allow(clippy::too_many_arguments)]
pub fn emit_profile_event(
    backends: &RuntimeBackends,
    ctx: &RequestContext,
    env: &Envelope,
    clock: &Arc<dyn Clock>,
    event_type: &str,
    severity: &str,
    mut body: Value,
    task_id: &[u8],
    rpc_id: &[u8],
) {
    let now = clock.now_unix_ms();

    if let Value::Object(ref mut map) = body {
        map.insert("profile_id".to_string(), Value::from(env.profile_id));
        if let Some(code) = map.get("code").and_then(Value::as_str) {
            if let Some(canonical) = canonical_code(code) {
                map.insert("canonical_code".to_string(), Value::from(canonical));
            }
        }
    }
    let body_bytes = serde_json::to_vec(&body).unwrap_or_default();

    let mut event = EventRecord {
        event_id: format!("{event_type}-{now}-{}", hex_prefix(&env.msg_id)),
        event_type: event_type.to_string(),
        severity: severity.to_string(),
        ts_unix_ms: now,
        msg_id: env.msg_id.clone(),
        task_id: task_id.to_vec(),
        rpc_id: rpc_id.to_vec(),
        body: body_bytes,
    };

    if event.task_id.is_empty() && !ctx.correlation.task_id.is_empty() {
        event.task_id = ctx.correlation.task_id.clone();
    }
    if event.rpc_id.is_empty() && !ctx.correlation.rpc_id.is_empty() {
        event.rpc_id = ctx.correlation.rpc_id.clone();
    }

    if event.task_id.is_empty() || event.rpc_id.is_empty() {
        let doc = backends.obs.get_doc();
        if event.task_id.is_empty() && !doc.task_id.is_empty() {
            event.task_id = doc.task_id;
        }
        if event.rpc_id.is_empty() && !doc.rpc_id.is_empty() {
            event.rpc_id = doc.rpc_id;
        }
    }

    if let Err(err) = backends.events.publish(event) {
        warn!(%err, event_type, "telemetry publish failed");
    }
}

fn hex_prefix(bytes: &[u8]) -> String {
    bytes.iter().take(4).map(|b| format!("{b:02x}")).collect()
}
