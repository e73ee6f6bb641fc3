//! Observability handler (profile 18).
//!
//! Set validates the traceparent (four dash-separated fields) and replaces
//! the connection-visible trace document; get answers with the current
//! document.

use std::sync::Arc;

use swp_core::payload::obs::{self, ObsDoc};
use swp_core::{
    Clock, Envelope, ErrorCode, ProfileHandler, ProfileId, ProtocolError, ProtocolResult,
    RequestContext,
};

use super::reply_envelope;
use crate::backends::RuntimeBackends;

pub struct ObsHandler {
    backends: RuntimeBackends,
    clock: Arc<dyn Clock>,
}

impl ObsHandler {
    #[must_use]
    pub fn new(backends: RuntimeBackends, clock: Arc<dyn Clock>) -> Self {
        Self { backends, clock }
    }
}

impl ProfileHandler for ObsHandler {
    fn handle(&self, _ctx: &RequestContext, env: &Envelope) -> ProtocolResult<Vec<Envelope>> {
        match env.msg_type {
            obs::MSG_SET => {
                let set = obs::decode_set(&env.payload)
                    .map_err(|e| e.context("invalid OBS set payload"))?;
                validate_traceparent(&set.traceparent)?;
                self.backends.obs.set_doc(ObsDoc {
                    traceparent: set.traceparent,
                    tracestate: set.tracestate,
                    msg_id: set.msg_id,
                    task_id: set.task_id,
                    rpc_id: set.rpc_id,
                });
                Ok(vec![])
            }

            obs::MSG_GET => {
                obs::decode_get(&env.payload)
                    .map_err(|e| e.context("invalid OBS get payload"))?;
                let doc = self.backends.obs.get_doc();
                Ok(vec![reply_envelope(
                    ProfileId::OBS,
                    &env.msg_id,
                    obs::MSG_DOC,
                    self.clock.now_unix_ms(),
                    obs::encode_doc(&doc),
                )])
            }

            // Doc and err replies are server-emitted only.
            obs::MSG_DOC | obs::MSG_ERR => Err(ProtocolError::invalid_envelope(format!(
                "invalid OBS msg_type {}",
                env.msg_type
            ))),

            other => Err(ProtocolError::new(
                ErrorCode::UnsupportedMsgType,
                format!("invalid OBS msg_type {other}"),
            )),
        }
    }
}

/// Requires the dash-separated four-field traceparent shape.
fn validate_traceparent(traceparent: &str) -> ProtocolResult<()> {
    let trimmed = traceparent.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::invalid_envelope("traceparent required"));
    }
    if trimmed.split('-').count() != 4 {
        return Err(ProtocolError::invalid_envelope("invalid traceparent format"));
    }
    Ok(())
}
