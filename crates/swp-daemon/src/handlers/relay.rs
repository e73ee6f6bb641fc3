//! Relay handler (profile 19): at-least-once delivery bookkeeping.
//!
//! The first publish for a `delivery_id` records `{attempts = 1, queued}`
//! and is acked; a repeat publish is answered with a status reply labeled
//! `duplicate`. ACK transitions to `acked`; NACK increments attempts and
//! moves to `retry` or `dead-letter`. Status queries report the current
//! record or a NOT_FOUND error reply.

use std::sync::Arc;

use swp_core::payload::relay::{self, RelayAck, RelayErr, RelayStatus};
use swp_core::{
    Clock, Envelope, ErrorCode, ProfileHandler, ProfileId, ProtocolError, ProtocolResult,
    RequestContext,
};

use super::reply_envelope;
use crate::backends::RuntimeBackends;
use crate::telemetry;

pub struct RelayHandler {
    backends: RuntimeBackends,
    clock: Arc<dyn Clock>,
}

impl RelayHandler {
    #[must_use]
    pub fn new(backends: RuntimeBackends, clock: Arc<dyn Clock>) -> Self {
        Self { backends, clock }
    }

    fn reply(&self, env: &Envelope, msg_type: u64, payload: Vec<u8>) -> Vec<Envelope> {
        vec![reply_envelope(
            ProfileId::RELAY,
            &env.msg_id,
            msg_type,
            self.clock.now_unix_ms(),
            payload,
        )]
    }
}

impl ProfileHandler for RelayHandler {
    fn handle(&self, ctx: &RequestContext, env: &Envelope) -> ProtocolResult<Vec<Envelope>> {
        match env.msg_type {
            relay::MSG_PUBLISH => {
                let publish = relay::decode_publish(&env.payload)
                    .map_err(|e| e.context("invalid RELAY publish payload"))?;
                if publish.delivery_id.is_empty() {
                    return Err(ProtocolError::invalid_envelope("delivery_id required"));
                }

                let (created, attempts, _state) =
                    self.backends.relay.create_delivery(&publish.delivery_id);
                if !created {
                    let payload = relay::encode_status(&RelayStatus {
                        delivery_id: publish.delivery_id,
                        state: "duplicate".to_string(),
                        attempt_count: attempts,
                    });
                    return Ok(self.reply(env, relay::MSG_STATUS, payload));
                }

                let payload = relay::encode_ack(&RelayAck {
                    delivery_id: publish.delivery_id,
                });
                Ok(self.reply(env, relay::MSG_ACK, payload))
            }

            relay::MSG_ACK => {
                let ack = relay::decode_ack(&env.payload)
                    .map_err(|e| e.context("invalid RELAY ack payload"))?;
                if ack.delivery_id.is_empty() {
                    return Err(ProtocolError::invalid_envelope("delivery_id required"));
                }
                self.backends.relay.mark_ack(&ack.delivery_id);
                Ok(vec![])
            }

            relay::MSG_NACK => {
                let nack = relay::decode_nack(&env.payload)
                    .map_err(|e| e.context("invalid RELAY nack payload"))?;
                if nack.delivery_id.is_empty() {
                    return Err(ProtocolError::invalid_envelope("delivery_id required"));
                }

                let status = self.backends.relay.mark_nack(&nack.delivery_id, nack.retryable);
                if status.state == "dead-letter" {
                    telemetry::emit_profile_event(
                        &self.backends,
                        ctx,
                        env,
                        &self.clock,
                        "relay.delivery.dead_letter",
                        "warn",
                        serde_json::json!({ "attempts": status.attempt_count }),
                        &[],
                        &[],
                    );
                }
                let payload = relay::encode_status(&RelayStatus {
                    delivery_id: nack.delivery_id,
                    state: status.state,
                    attempt_count: status.attempt_count,
                });
                Ok(self.reply(env, relay::MSG_STATUS, payload))
            }

            relay::MSG_STATUS => {
                let query = relay::decode_status(&env.payload)
                    .map_err(|e| e.context("invalid RELAY status payload"))?;
                if query.delivery_id.is_empty() {
                    return Err(ProtocolError::invalid_envelope("delivery_id required"));
                }

                match self.backends.relay.get_delivery(&query.delivery_id) {
                    Some(status) => {
                        let payload = relay::encode_status(&RelayStatus {
                            delivery_id: query.delivery_id,
                            state: status.state,
                            attempt_count: status.attempt_count,
                        });
                        Ok(self.reply(env, relay::MSG_STATUS, payload))
                    }
                    None => {
                        let payload = relay::encode_err(&RelayErr {
                            code: "NOT_FOUND".to_string(),
                            message: "delivery not found".to_string(),
                        });
                        Ok(self.reply(env, relay::MSG_ERR, payload))
                    }
                }
            }

            // Peer-side copies of error replies are tolerated, silently.
            relay::MSG_ERR => {
                relay::decode_err(&env.payload)
                    .map_err(|e| e.context("invalid RELAY err payload"))?;
                Ok(vec![])
            }

            other => Err(ProtocolError::new(
                ErrorCode::UnsupportedMsgType,
                format!("invalid RELAY msg_type {other}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testutil::{assert_reply_shape, clock, ctx_for, request};
    use swp_core::payload::relay::{RelayNack, RelayPublish};

    struct Fixture {
        handler: RelayHandler,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                handler: RelayHandler::new(RuntimeBackends::default(), clock()),
            }
        }

        fn handle(&self, msg_type: u64, payload: Vec<u8>) -> Vec<Envelope> {
            let env = request(ProfileId::RELAY, msg_type, payload);
            let replies = self.handler.handle(&ctx_for(&env), &env).unwrap();
            assert_reply_shape(&env, &replies);
            replies
        }

        fn publish(&self, delivery_id: &[u8]) -> Vec<Envelope> {
            self.handle(
                relay::MSG_PUBLISH,
                relay::encode_publish(&RelayPublish {
                    delivery_id: delivery_id.to_vec(),
                    topic: "updates".to_string(),
                    payload: b"hello".to_vec(),
                    ttl_ms: 0,
                }),
            )
        }
    }

    #[test]
    fn first_publish_acked_second_reports_duplicate() {
        let f = Fixture::new();

        let replies = f.publish(b"d1");
        assert_eq!(replies[0].msg_type, relay::MSG_ACK);

        let replies = f.publish(b"d1");
        assert_eq!(replies[0].msg_type, relay::MSG_STATUS);
        let status = relay::decode_status(&replies[0].payload).unwrap();
        assert_eq!(status.state, "duplicate");
        assert_eq!(status.attempt_count, 1);
    }

    #[test]
    fn nack_transitions_to_retry_then_dead_letter() {
        let f = Fixture::new();
        f.publish(b"d1");

        let nack = |retryable: bool| {
            relay::encode_nack(&RelayNack {
                delivery_id: b"d1".to_vec(),
                retryable,
                reason_code: String::new(),
            })
        };

        let replies = f.handle(relay::MSG_NACK, nack(true));
        let status = relay::decode_status(&replies[0].payload).unwrap();
        assert_eq!((status.attempt_count, status.state.as_str()), (2, "retry"));

        let replies = f.handle(relay::MSG_NACK, nack(false));
        let status = relay::decode_status(&replies[0].payload).unwrap();
        assert_eq!((status.attempt_count, status.state.as_str()), (3, "dead-letter"));
    }

    #[test]
    fn ack_then_status_query() {
        let f = Fixture::new();
        f.publish(b"d1");
        f.handle(
            relay::MSG_ACK,
            relay::encode_ack(&RelayAck {
                delivery_id: b"d1".to_vec(),
            }),
        );

        let replies = f.handle(
            relay::MSG_STATUS,
            relay::encode_status(&RelayStatus {
                delivery_id: b"d1".to_vec(),
                state: String::new(),
                attempt_count: 0,
            }),
        );
        let status = relay::decode_status(&replies[0].payload).unwrap();
        assert_eq!(status.state, "acked");
    }

    #[test]
    fn status_for_unknown_delivery_is_not_found() {
        let f = Fixture::new();
        let replies = f.handle(
            relay::MSG_STATUS,
            relay::encode_status(&RelayStatus {
                delivery_id: b"missing".to_vec(),
                state: String::new(),
                attempt_count: 0,
            }),
        );
        assert_eq!(replies[0].msg_type, relay::MSG_ERR);
        let err = relay::decode_err(&replies[0].payload).unwrap();
        assert_eq!(err.code, "NOT_FOUND");
    }
}
