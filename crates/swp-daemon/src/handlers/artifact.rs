//! Artifact handler (profile 14): offer, chunked transfer, integrity.
//!
//! Uploads must arrive in chunk order; the terminal chunk triggers the size
//! check against the offer's `total_size` and, for sha256 offers, the hash
//! check over the accumulated bytes. Violations are answered with an
//! ARTIFACT_ERR reply (`ORDERING`, `SIZE_MISMATCH`, `INTEGRITY_MISMATCH`);
//! the connection survives.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use swp_core::payload::artifact::{self, ArtAck, ArtChunk, ArtErr};
use swp_core::{
    Clock, Envelope, ErrorCode, ProfileHandler, ProfileId, ProtocolError, ProtocolResult,
    RequestContext,
};

use super::reply_envelope;
use crate::backends::{ArtifactError, RuntimeBackends};
use crate::telemetry;

pub struct ArtifactHandler {
    backends: RuntimeBackends,
    clock: Arc<dyn Clock>,
}

impl ArtifactHandler {
    #[must_use]
    pub fn new(backends: RuntimeBackends, clock: Arc<dyn Clock>) -> Self {
        Self { backends, clock }
    }

    fn reply(&self, env: &Envelope, msg_type: u64, payload: Vec<u8>) -> Vec<Envelope> {
        vec![reply_envelope(
            ProfileId::ARTIFACT,
            &env.msg_id,
            msg_type,
            self.clock.now_unix_ms(),
            payload,
        )]
    }

    fn err_reply(&self, ctx: &RequestContext, env: &Envelope, code: &str, message: &str) -> Vec<Envelope> {
        telemetry::emit_profile_event(
            &self.backends,
            ctx,
            env,
            &self.clock,
            "artifact.transfer.rejected",
            "warn",
            serde_json::json!({ "code": code }),
            &[],
            &[],
        );
        self.reply(
            env,
            artifact::MSG_ERR,
            artifact::encode_err(&ArtErr {
                code: code.to_string(),
                message: message.to_string(),
                retryable: false,
            }),
        )
    }
}

impl ProfileHandler for ArtifactHandler {
    fn handle(&self, ctx: &RequestContext, env: &Envelope) -> ProtocolResult<Vec<Envelope>> {
        match env.msg_type {
            artifact::MSG_OFFER => {
                let offer = artifact::decode_offer(&env.payload)
                    .map_err(|e| e.context("invalid ARTIFACT offer payload"))?;
                if offer.artifact_id.trim().is_empty() {
                    return Err(ProtocolError::invalid_envelope("artifact_id required"));
                }
                self.backends.artifact.put_offer(offer);
                Ok(vec![])
            }

            artifact::MSG_GET => {
                let get = artifact::decode_get(&env.payload)
                    .map_err(|e| e.context("invalid ARTIFACT get payload"))?;
                if get.artifact_id.trim().is_empty() {
                    return Err(ProtocolError::invalid_envelope("artifact_id required"));
                }
                let Some(record) = self.backends.artifact.get_artifact(&get.artifact_id) else {
                    return Ok(self.err_reply(ctx, env, "NOT_FOUND", "artifact not found"));
                };

                let total = record.data.len() as u64;
                let start = get.start.min(total);
                let end = if get.end == 0 || get.end > total {
                    total
                } else {
                    get.end
                };
                if start > end {
                    return Ok(self.err_reply(ctx, env, "INVALID_RANGE", "start greater than end"));
                }

                let payload = artifact::encode_chunk(&ArtChunk {
                    artifact_id: get.artifact_id.clone(),
                    chunk_index: 0,
                    offset: start,
                    data: record.data[start as usize..end as usize].to_vec(),
                    is_terminal: end == total,
                    resume_token: format!("{}:{end}", get.artifact_id),
                });
                Ok(self.reply(env, artifact::MSG_CHUNK, payload))
            }

            artifact::MSG_CHUNK => {
                let chunk = artifact::decode_chunk(&env.payload)
                    .map_err(|e| e.context("invalid ARTIFACT chunk payload"))?;
                if chunk.artifact_id.trim().is_empty() {
                    return Err(ProtocolError::invalid_envelope("artifact_id required"));
                }

                let record = match self.backends.artifact.append_chunk(&chunk) {
                    Ok(record) => record,
                    Err(ArtifactError::ChunkOrdering) => {
                        return Ok(self.err_reply(ctx, env, "ORDERING", "unexpected chunk index"));
                    }
                };

                if chunk.is_terminal {
                    if record.offer.total_size > 0
                        && record.data.len() as u64 != record.offer.total_size
                    {
                        return Ok(self.err_reply(ctx, env, "SIZE_MISMATCH", "artifact size mismatch"));
                    }
                    if !record.offer.hash.is_empty()
                        && record.offer.hash_alg.eq_ignore_ascii_case("sha256")
                    {
                        let digest = Sha256::digest(&record.data);
                        if digest.as_slice() != record.offer.hash.as_slice() {
                            return Ok(self.err_reply(
                                ctx,
                                env,
                                "INTEGRITY_MISMATCH",
                                "artifact hash mismatch",
                            ));
                        }
                    }
                }

                let payload = artifact::encode_ack(&ArtAck {
                    artifact_id: chunk.artifact_id,
                    chunk_index: chunk.chunk_index,
                });
                Ok(self.reply(env, artifact::MSG_ACK, payload))
            }

            artifact::MSG_ACK => {
                artifact::decode_ack(&env.payload)
                    .map_err(|e| e.context("invalid ARTIFACT ack payload"))?;
                Ok(vec![])
            }

            // Err replies are server-emitted only.
            artifact::MSG_ERR => Err(ProtocolError::invalid_envelope(format!(
                "invalid ARTIFACT msg_type {}",
                env.msg_type
            ))),

            other => Err(ProtocolError::new(
                ErrorCode::UnsupportedMsgType,
                format!("invalid ARTIFACT msg_type {other}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testutil::{assert_reply_shape, clock, ctx_for, request};
    use swp_core::payload::artifact::{ArtGet, ArtOffer};

    struct Fixture {
        handler: ArtifactHandler,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                handler: ArtifactHandler::new(RuntimeBackends::default(), clock()),
            }
        }

        fn handle(&self, msg_type: u64, payload: Vec<u8>) -> Vec<Envelope> {
            let env = request(ProfileId::ARTIFACT, msg_type, payload);
            let replies = self.handler.handle(&ctx_for(&env), &env).unwrap();
            assert_reply_shape(&env, &replies);
            replies
        }

        fn offer(&self, id: &str, total: u64, hash: Vec<u8>) {
            let replies = self.handle(
                artifact::MSG_OFFER,
                artifact::encode_offer(&ArtOffer {
                    artifact_id: id.to_string(),
                    total_size: total,
                    hash_alg: if hash.is_empty() { String::new() } else { "sha256".to_string() },
                    hash,
                    metadata: Vec::new(),
                }),
            );
            assert!(replies.is_empty());
        }

        fn chunk(&self, id: &str, index: u64, data: &[u8], terminal: bool) -> Envelope {
            let replies = self.handle(
                artifact::MSG_CHUNK,
                artifact::encode_chunk(&ArtChunk {
                    artifact_id: id.to_string(),
                    chunk_index: index,
                    offset: 0,
                    data: data.to_vec(),
                    is_terminal: terminal,
                    resume_token: String::new(),
                }),
            );
            assert_eq!(replies.len(), 1);
            replies.into_iter().next().unwrap()
        }
    }

    fn err_code(reply: &Envelope) -> String {
        artifact::decode_err(&reply.payload).unwrap().code
    }

    #[test]
    fn in_order_chunks_acked() {
        let f = Fixture::new();
        f.offer("a", 5, Vec::new());
        let reply = f.chunk("a", 0, b"he", false);
        assert_eq!(reply.msg_type, artifact::MSG_ACK);
        let reply = f.chunk("a", 1, b"llo", true);
        assert_eq!(reply.msg_type, artifact::MSG_ACK);
    }

    #[test]
    fn out_of_order_chunk_gets_ordering_err() {
        let f = Fixture::new();
        f.offer("a", 0, Vec::new());
        f.chunk("a", 0, b"x", false);
        let reply = f.chunk("a", 2, b"y", false);
        assert_eq!(reply.msg_type, artifact::MSG_ERR);
        assert_eq!(err_code(&reply), "ORDERING");
    }

    #[test]
    fn integrity_mismatch_detected_on_terminal_chunk() {
        let f = Fixture::new();
        let expected = Sha256::digest(b"hello").to_vec();
        f.offer("a", 5, expected);
        let reply = f.chunk("a", 0, b"world", true);
        assert_eq!(err_code(&reply), "INTEGRITY_MISMATCH");
    }

    #[test]
    fn matching_hash_acked_on_terminal_chunk() {
        let f = Fixture::new();
        let expected = Sha256::digest(b"hello").to_vec();
        f.offer("a", 5, expected);
        let reply = f.chunk("a", 0, b"hello", true);
        assert_eq!(reply.msg_type, artifact::MSG_ACK);
    }

    #[test]
    fn size_mismatch_detected_on_terminal_chunk() {
        let f = Fixture::new();
        f.offer("a", 10, Vec::new());
        let reply = f.chunk("a", 0, b"short", true);
        assert_eq!(err_code(&reply), "SIZE_MISMATCH");
    }

    #[test]
    fn get_returns_range_chunk() {
        let f = Fixture::new();
        f.offer("a", 0, Vec::new());
        f.chunk("a", 0, b"hello world", true);

        let replies = f.handle(
            artifact::MSG_GET,
            artifact::encode_get(&ArtGet {
                artifact_id: "a".to_string(),
                start: 6,
                end: 0,
                resume_token: String::new(),
            }),
        );
        assert_eq!(replies[0].msg_type, artifact::MSG_CHUNK);
        let chunk = artifact::decode_chunk(&replies[0].payload).unwrap();
        assert_eq!(chunk.data, b"world");
        assert!(chunk.is_terminal);
        assert_eq!(chunk.resume_token, "a:11");
    }

    #[test]
    fn get_invalid_range_and_missing_artifact() {
        let f = Fixture::new();
        f.offer("a", 0, Vec::new());
        f.chunk("a", 0, b"hello", true);

        let replies = f.handle(
            artifact::MSG_GET,
            artifact::encode_get(&ArtGet {
                artifact_id: "a".to_string(),
                start: 4,
                end: 2,
                resume_token: String::new(),
            }),
        );
        assert_eq!(err_code(&replies[0]), "INVALID_RANGE");

        let replies = f.handle(
            artifact::MSG_GET,
            artifact::encode_get(&ArtGet {
                artifact_id: "missing".to_string(),
                start: 0,
                end: 0,
                resume_token: String::new(),
            }),
        );
        assert_eq!(err_code(&replies[0]), "NOT_FOUND");
    }
}
