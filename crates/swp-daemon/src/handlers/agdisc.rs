//! Agent-card discovery handler (profile 10).
//!
//! Get-only on the wire. An unknown agent id is answered with a profile
//! `NOT_FOUND` error message (the connection survives); a matching
//! `if_none_match` etag earns a not-modified reply instead of the document.

use std::sync::Arc;

use swp_core::payload::agdisc::{self, AgdiscErr, AgdiscNotModified};
use swp_core::{
    Clock, Envelope, ErrorCode, ProfileHandler, ProfileId, ProtocolError, ProtocolResult,
    RequestContext,
};

use super::reply_envelope;
use crate::backends::RuntimeBackends;

pub struct AgdiscHandler {
    backends: RuntimeBackends,
    clock: Arc<dyn Clock>,
}

impl AgdiscHandler {
    #[must_use]
    pub fn new(backends: RuntimeBackends, clock: Arc<dyn Clock>) -> Self {
        Self { backends, clock }
    }

    fn reply(&self, env: &Envelope, msg_type: u64, payload: Vec<u8>) -> Vec<Envelope> {
        vec![reply_envelope(
            ProfileId::AGDISC,
            &env.msg_id,
            msg_type,
            self.clock.now_unix_ms(),
            payload,
        )]
    }
}

impl ProfileHandler for AgdiscHandler {
    fn handle(&self, _ctx: &RequestContext, env: &Envelope) -> ProtocolResult<Vec<Envelope>> {
        match env.msg_type {
            agdisc::MSG_GET => {}
            // Server-emitted variants are not accepted inbound.
            agdisc::MSG_DOC | agdisc::MSG_NOT_MODIFIED | agdisc::MSG_ERR => {
                return Err(ProtocolError::invalid_envelope(format!(
                    "invalid AGDISC msg_type {}",
                    env.msg_type
                )));
            }
            other => {
                return Err(ProtocolError::new(
                    ErrorCode::UnsupportedMsgType,
                    format!("invalid AGDISC msg_type {other}"),
                ));
            }
        }

        let get = agdisc::decode_get(&env.payload)
            .map_err(|e| e.context("invalid AGDISC get payload"))?;

        let Some(card) = self.backends.agent_cards.get_agent_card(&get.agent_id) else {
            let payload = agdisc::encode_err(&AgdiscErr {
                code: "NOT_FOUND".to_string(),
                message: "agent card not found".to_string(),
            });
            return Ok(self.reply(env, agdisc::MSG_ERR, payload));
        };

        if !get.if_none_match.is_empty() && get.if_none_match == card.etag {
            let payload = agdisc::encode_not_modified(&AgdiscNotModified {
                agent_id: card.agent_id,
                etag: card.etag,
            });
            return Ok(self.reply(env, agdisc::MSG_NOT_MODIFIED, payload));
        }

        let payload = agdisc::encode_doc(&card);
        Ok(self.reply(env, agdisc::MSG_DOC, payload))
    }
}
