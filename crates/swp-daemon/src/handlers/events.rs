//! Events handler (profile 13).
//!
//! Publish enriches the record before validation: a zero timestamp gets the
//! current clock, a missing msg_id gets the inbound one, and missing
//! task/rpc ids are filled from the request correlation snapshot and then
//! the observability document. Validation requires event_id, event_type, a
//! known severity, and at least one correlation id. Subscribe is answered
//! with a batch; unsubscribe is acknowledged by the absence of a reply.

use std::sync::Arc;

use swp_core::payload::events::{self, EventRecord, EvtBatch};
use swp_core::{
    Clock, Envelope, ErrorCode, ProfileHandler, ProfileId, ProtocolError, ProtocolResult,
    RequestContext,
};

use super::reply_envelope;
use crate::backends::RuntimeBackends;

/// Severities a published event may carry.
const SEVERITIES: [&str; 4] = ["debug", "info", "warn", "error"];

pub struct EventsHandler {
    backends: RuntimeBackends,
    clock: Arc<dyn Clock>,
}

impl EventsHandler {
    #[must_use]
    pub fn new(backends: RuntimeBackends, clock: Arc<dyn Clock>) -> Self {
        Self { backends, clock }
    }

    fn enrich(&self, ctx: &RequestContext, env: &Envelope, mut event: EventRecord) -> EventRecord {
        if event.ts_unix_ms == 0 {
            event.ts_unix_ms = self.clock.now_unix_ms();
        }
        if event.msg_id.is_empty() {
            event.msg_id = if ctx.msg_id.is_empty() {
                env.msg_id.clone()
            } else {
                ctx.msg_id.clone()
            };
        }
        if event.task_id.is_empty() && !ctx.correlation.task_id.is_empty() {
            event.task_id = ctx.correlation.task_id.clone();
        }
        if event.rpc_id.is_empty() && !ctx.correlation.rpc_id.is_empty() {
            event.rpc_id = ctx.correlation.rpc_id.clone();
        }

        if event.msg_id.is_empty() || event.task_id.is_empty() || event.rpc_id.is_empty() {
            let doc = self.backends.obs.get_doc();
            if event.msg_id.is_empty() && !doc.msg_id.is_empty() {
                event.msg_id = doc.msg_id;
            }
            if event.task_id.is_empty() && !doc.task_id.is_empty() {
                event.task_id = doc.task_id;
            }
            if event.rpc_id.is_empty() && !doc.rpc_id.is_empty() {
                event.rpc_id = doc.rpc_id;
            }
        }
        event
    }
}

impl ProfileHandler for EventsHandler {
    fn handle(&self, ctx: &RequestContext, env: &Envelope) -> ProtocolResult<Vec<Envelope>> {
        match env.msg_type {
            events::MSG_PUBLISH => {
                let publish = events::decode_publish(&env.payload)
                    .map_err(|e| e.context("invalid EVENTS publish payload"))?;
                let event = self.enrich(ctx, env, publish.event);
                validate_event(&event)?;
                self.backends
                    .events
                    .publish(event)
                    .map_err(|e| ProtocolError::internal(e.to_string()))?;
                Ok(vec![])
            }

            events::MSG_SUBSCRIBE => {
                let subscribe = events::decode_subscribe(&env.payload)
                    .map_err(|e| e.context("invalid EVENTS subscribe payload"))?;
                let batch = self
                    .backends
                    .events
                    .subscribe(&subscribe.filter)
                    .map_err(|e| ProtocolError::internal(e.to_string()))?;
                let payload = events::encode_batch(&EvtBatch { events: batch });
                Ok(vec![reply_envelope(
                    ProfileId::EVENTS,
                    &env.msg_id,
                    events::MSG_BATCH,
                    self.clock.now_unix_ms(),
                    payload,
                )])
            }

            events::MSG_UNSUBSCRIBE => {
                let unsubscribe = events::decode_unsubscribe(&env.payload)
                    .map_err(|e| e.context("invalid EVENTS unsubscribe payload"))?;
                self.backends
                    .events
                    .unsubscribe(&unsubscribe.subscription_id)
                    .map_err(|e| ProtocolError::internal(e.to_string()))?;
                Ok(vec![])
            }

            // Server-emitted variants are not accepted inbound.
            events::MSG_BATCH | events::MSG_ERR => Err(ProtocolError::invalid_envelope(format!(
                "invalid EVENTS msg_type {}",
                env.msg_type
            ))),

            other => Err(ProtocolError::new(
                ErrorCode::UnsupportedMsgType,
                format!("invalid EVENTS msg_type {other}"),
            )),
        }
    }
}

fn validate_event(event: &EventRecord) -> ProtocolResult<()> {
    if event.event_id.trim().is_empty() {
        return Err(ProtocolError::invalid_envelope("event_id required"));
    }
    if event.event_type.trim().is_empty() {
        return Err(ProtocolError::invalid_envelope("event_type required"));
    }
    let severity = event.severity.trim().to_ascii_lowercase();
    if !SEVERITIES.contains(&severity.as_str()) {
        return Err(ProtocolError::invalid_envelope("invalid severity"));
    }
    if event.msg_id.is_empty() && event.task_id.is_empty() && event.rpc_id.is_empty() {
        return Err(ProtocolError::invalid_envelope(
            "at least one correlation key required",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testutil::{assert_reply_shape, clock, ctx_for, request, NOW_MS};
    use swp_core::payload::events::{EvtPublish, EvtSubscribe, EvtUnsubscribe};
    use swp_core::payload::obs::ObsDoc;

    fn handler_with(backends: RuntimeBackends) -> EventsHandler {
        EventsHandler::new(backends, clock())
    }

    fn publish_payload(event: EventRecord) -> Vec<u8> {
        events::encode_publish(&EvtPublish { event })
    }

    fn base_event() -> EventRecord {
        EventRecord {
            event_id: "evt-1".to_string(),
            event_type: "demo.event".to_string(),
            severity: "info".to_string(),
            ..EventRecord::default()
        }
    }

    #[test]
    fn publish_enriches_ts_and_msg_id_from_envelope() {
        let backends = RuntimeBackends::default();
        let handler = handler_with(backends.clone());
        let env = request(ProfileId::EVENTS, events::MSG_PUBLISH, publish_payload(base_event()));

        let replies = handler.handle(&ctx_for(&env), &env).unwrap();
        assert!(replies.is_empty());

        let stored = backends.events.subscribe("").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].msg_id, env.msg_id);
        assert_eq!(stored[0].ts_unix_ms, NOW_MS);
    }

    #[test]
    fn publish_enriches_task_and_rpc_from_obs_doc() {
        let backends = RuntimeBackends::default();
        backends.obs.set_doc(ObsDoc {
            traceparent: String::new(),
            tracestate: String::new(),
            msg_id: Vec::new(),
            task_id: b"task-from-doc".to_vec(),
            rpc_id: b"rpc-from-doc".to_vec(),
        });
        let handler = handler_with(backends.clone());
        let env = request(ProfileId::EVENTS, events::MSG_PUBLISH, publish_payload(base_event()));
        handler.handle(&ctx_for(&env), &env).unwrap();

        let stored = backends.events.subscribe("").unwrap();
        assert_eq!(stored[0].task_id, b"task-from-doc");
        assert_eq!(stored[0].rpc_id, b"rpc-from-doc");
    }

    #[test]
    fn invalid_severity_rejected() {
        let handler = handler_with(RuntimeBackends::default());
        let mut event = base_event();
        event.severity = "fatal".to_string();
        let env = request(ProfileId::EVENTS, events::MSG_PUBLISH, publish_payload(event));
        let err = handler.handle(&ctx_for(&env), &env).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidEnvelope);
    }

    #[test]
    fn missing_event_fields_rejected() {
        let handler = handler_with(RuntimeBackends::default());
        for strip in ["event_id", "event_type"] {
            let mut event = base_event();
            match strip {
                "event_id" => event.event_id = String::new(),
                _ => event.event_type = String::new(),
            }
            let env = request(ProfileId::EVENTS, events::MSG_PUBLISH, publish_payload(event));
            let err = handler.handle(&ctx_for(&env), &env).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidEnvelope, "missing {strip}");
        }
    }

    #[test]
    fn subscribe_returns_batch_reply() {
        let backends = RuntimeBackends::default();
        let handler = handler_with(backends.clone());

        let publish_env =
            request(ProfileId::EVENTS, events::MSG_PUBLISH, publish_payload(base_event()));
        handler.handle(&ctx_for(&publish_env), &publish_env).unwrap();

        let env = request(
            ProfileId::EVENTS,
            events::MSG_SUBSCRIBE,
            events::encode_subscribe(&EvtSubscribe {
                filter: "demo.".to_string(),
            }),
        );
        let replies = handler.handle(&ctx_for(&env), &env).unwrap();
        assert_reply_shape(&env, &replies);
        assert_eq!(replies[0].msg_type, events::MSG_BATCH);
        let batch = events::decode_batch(&replies[0].payload).unwrap();
        assert_eq!(batch.events.len(), 1);
    }

    #[test]
    fn unsubscribe_is_silent() {
        let handler = handler_with(RuntimeBackends::default());
        let env = request(
            ProfileId::EVENTS,
            events::MSG_UNSUBSCRIBE,
            events::encode_unsubscribe(&EvtUnsubscribe {
                subscription_id: "sub-1".to_string(),
            }),
        );
        assert!(handler.handle(&ctx_for(&env), &env).unwrap().is_empty());
    }
}
