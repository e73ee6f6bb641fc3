//! Policy-hint handler (profile 16).
//!
//! Constraints carry a mode (MUST/SHOULD/MAY, defaulting to MAY). A MUST on
//! a key outside the known set is answered with VIOLATION(UNKNOWN_KEY); a
//! MUST that contradicts an existing MUST with a different value is
//! VIOLATION(CONFLICT). Anything else is persisted and acknowledged.

use std::sync::Arc;

use swp_core::payload::policyhint::{self, Constraint, PolicyHintAck, PolicyViolation};
use swp_core::{
    Clock, Envelope, ErrorCode, ProfileHandler, ProfileId, ProtocolError, ProtocolResult,
    RequestContext,
};

use super::reply_envelope;
use crate::backends::RuntimeBackends;

/// Keys the reference server recognizes for MUST constraints.
const KNOWN_KEYS: [&str; 4] = ["no_external_network", "no_pii", "cost_limit", "region"];

pub struct PolicyHintHandler {
    backends: RuntimeBackends,
    clock: Arc<dyn Clock>,
}

impl PolicyHintHandler {
    #[must_use]
    pub fn new(backends: RuntimeBackends, clock: Arc<dyn Clock>) -> Self {
        Self { backends, clock }
    }

    fn reply(&self, env: &Envelope, msg_type: u64, payload: Vec<u8>) -> Vec<Envelope> {
        vec![reply_envelope(
            ProfileId::POLICY_HINT,
            &env.msg_id,
            msg_type,
            self.clock.now_unix_ms(),
            payload,
        )]
    }

    fn violation(&self, env: &Envelope, constraint: &Constraint, reason_code: &str) -> Vec<Envelope> {
        let payload = policyhint::encode_violation(&PolicyViolation {
            key: constraint.key.clone(),
            scope_ref: constraint.scope_ref.clone(),
            reason_code: reason_code.to_string(),
        });
        self.reply(env, policyhint::MSG_VIOLATION, payload)
    }
}

impl ProfileHandler for PolicyHintHandler {
    fn handle(&self, _ctx: &RequestContext, env: &Envelope) -> ProtocolResult<Vec<Envelope>> {
        match env.msg_type {
            policyhint::MSG_SET => {
                let set = policyhint::decode_set(&env.payload)
                    .map_err(|e| e.context("invalid POLICYHINT set payload"))?;

                for constraint in &set.constraints {
                    if constraint.key.trim().is_empty() {
                        return Err(ProtocolError::invalid_envelope("constraint key required"));
                    }
                    let mut mode = constraint.mode.trim().to_ascii_uppercase();
                    if mode.is_empty() {
                        mode = "MAY".to_string();
                    }
                    if !matches!(mode.as_str(), "MUST" | "SHOULD" | "MAY") {
                        return Err(ProtocolError::invalid_envelope("invalid constraint mode"));
                    }

                    let known = KNOWN_KEYS.contains(&constraint.key.as_str());
                    if !known && mode == "MUST" {
                        return Ok(self.violation(env, constraint, "UNKNOWN_KEY"));
                    }

                    if let Some(existing) = self.backends.policy_hints.get_constraint(&constraint.key)
                    {
                        let existing_mode = existing.mode.trim().to_ascii_uppercase();
                        if existing_mode == "MUST"
                            && mode == "MUST"
                            && existing.value != constraint.value
                        {
                            return Ok(self.violation(env, constraint, "CONFLICT"));
                        }
                    }

                    self.backends.policy_hints.set_constraint(Constraint {
                        key: constraint.key.clone(),
                        value: constraint.value.clone(),
                        mode,
                        scope_ref: constraint.scope_ref.clone(),
                    });
                }

                let payload = policyhint::encode_ack(&PolicyHintAck {
                    ack_id: String::from_utf8_lossy(&env.msg_id).into_owned(),
                });
                Ok(self.reply(env, policyhint::MSG_ACK, payload))
            }

            // Peer-side copies of server replies are tolerated, silently.
            policyhint::MSG_ACK => {
                policyhint::decode_ack(&env.payload)
                    .map_err(|e| e.context("invalid POLICYHINT ack payload"))?;
                Ok(vec![])
            }
            policyhint::MSG_VIOLATION => {
                policyhint::decode_violation(&env.payload)
                    .map_err(|e| e.context("invalid POLICYHINT violation payload"))?;
                Ok(vec![])
            }

            policyhint::MSG_ERR => Err(ProtocolError::invalid_envelope(format!(
                "invalid POLICYHINT msg_type {}",
                env.msg_type
            ))),

            other => Err(ProtocolError::new(
                ErrorCode::UnsupportedMsgType,
                format!("invalid POLICYHINT msg_type {other}"),
            )),
        }
    }
}
