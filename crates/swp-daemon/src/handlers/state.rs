//! Content-addressed state handler (profile 17).
//!
//! A put is accepted only when `sha256(blob)` equals the declared state id
//! and every declared parent already exists. Get answers with the stored
//! put or a NOT_FOUND error reply; delta requires the target state to
//! exist.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use swp_core::payload::state::{self, StateErr};
use swp_core::{
    Clock, Envelope, ErrorCode, ProfileHandler, ProfileId, ProtocolError, ProtocolResult,
    RequestContext,
};

use super::reply_envelope;
use crate::backends::RuntimeBackends;

pub struct StateHandler {
    backends: RuntimeBackends,
    clock: Arc<dyn Clock>,
}

impl StateHandler {
    #[must_use]
    pub fn new(backends: RuntimeBackends, clock: Arc<dyn Clock>) -> Self {
        Self { backends, clock }
    }

    fn reply(&self, env: &Envelope, msg_type: u64, payload: Vec<u8>) -> Vec<Envelope> {
        vec![reply_envelope(
            ProfileId::STATE,
            &env.msg_id,
            msg_type,
            self.clock.now_unix_ms(),
            payload,
        )]
    }

    fn not_found(&self, env: &Envelope) -> Vec<Envelope> {
        let payload = state::encode_err(&StateErr {
            code: "NOT_FOUND".to_string(),
            message: "state not found".to_string(),
        });
        self.reply(env, state::MSG_ERR, payload)
    }
}

impl ProfileHandler for StateHandler {
    fn handle(&self, _ctx: &RequestContext, env: &Envelope) -> ProtocolResult<Vec<Envelope>> {
        match env.msg_type {
            state::MSG_PUT => {
                let put = state::decode_put(&env.payload)
                    .map_err(|e| e.context("invalid STATE put payload"))?;
                if put.state_id.is_empty() {
                    return Err(ProtocolError::invalid_envelope("state_id required"));
                }
                if put.blob.is_empty() {
                    return Err(ProtocolError::invalid_envelope("blob required"));
                }

                let digest = Sha256::digest(&put.blob);
                if digest.as_slice() != put.state_id.as_slice() {
                    return Err(ProtocolError::invalid_envelope("state_id/hash mismatch"));
                }
                for parent_id in &put.parent_ids {
                    if !self.backends.state.has_state(parent_id) {
                        return Err(ProtocolError::invalid_envelope("parent state missing"));
                    }
                }
                self.backends.state.put_state(put);
                Ok(vec![])
            }

            state::MSG_GET => {
                let get = state::decode_get(&env.payload)
                    .map_err(|e| e.context("invalid STATE get payload"))?;
                if get.state_id.is_empty() {
                    return Err(ProtocolError::invalid_envelope("state_id required"));
                }
                match self.backends.state.get_state(&get.state_id) {
                    Some(put) => Ok(self.reply(env, state::MSG_PUT, state::encode_put(&put))),
                    None => Ok(self.not_found(env)),
                }
            }

            state::MSG_DELTA => {
                let delta = state::decode_delta(&env.payload)
                    .map_err(|e| e.context("invalid STATE delta payload"))?;
                if delta.state_id.is_empty() {
                    return Err(ProtocolError::invalid_envelope("state_id required"));
                }
                if self.backends.state.has_state(&delta.state_id) {
                    Ok(vec![])
                } else {
                    Ok(self.not_found(env))
                }
            }

            // Err replies are server-emitted only.
            state::MSG_ERR => Err(ProtocolError::invalid_envelope(format!(
                "invalid STATE msg_type {}",
                env.msg_type
            ))),

            other => Err(ProtocolError::new(
                ErrorCode::UnsupportedMsgType,
                format!("invalid STATE msg_type {other}"),
            )),
        }
    }
}
