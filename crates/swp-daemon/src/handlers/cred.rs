//! Credentials handler (profile 15).
//!
//! Presented credentials are screened by type (`jwt`, `mtls`, `opaque`) and
//! by deterministic content rules; delegation grows a depth-limited chain;
//! revocation poisons the chain. Policy failures are CRED_ERR replies
//! (`UNSUPPORTED_CRED_TYPE`, `INVALID_CREDENTIAL`, `EXPIRED`, `REVOKED`,
//! `CHAIN_LIMIT`); the connection survives.

use std::sync::Arc;

use swp_core::payload::cred::{self, CredErr};
use swp_core::{
    Clock, Envelope, ErrorCode, ProfileHandler, ProfileId, ProtocolError, ProtocolResult,
    RequestContext,
};

use super::reply_envelope;
use crate::backends::RuntimeBackends;

/// Delegation chains may not exceed this depth.
pub const MAX_DELEGATION_DEPTH: u32 = 8;

pub struct CredHandler {
    backends: RuntimeBackends,
    clock: Arc<dyn Clock>,
}

impl CredHandler {
    #[must_use]
    pub fn new(backends: RuntimeBackends, clock: Arc<dyn Clock>) -> Self {
        Self { backends, clock }
    }

    fn err_reply(&self, env: &Envelope, code: &str, message: &str) -> Vec<Envelope> {
        let payload = cred::encode_err(&CredErr {
            code: code.to_string(),
            message: message.to_string(),
        });
        vec![reply_envelope(
            ProfileId::CRED,
            &env.msg_id,
            cred::MSG_ERR,
            self.clock.now_unix_ms(),
            payload,
        )]
    }
}

impl ProfileHandler for CredHandler {
    fn handle(&self, _ctx: &RequestContext, env: &Envelope) -> ProtocolResult<Vec<Envelope>> {
        let now = self.clock.now_unix_ms();

        match env.msg_type {
            cred::MSG_PRESENT => {
                let present = cred::decode_present(&env.payload)
                    .map_err(|e| e.context("invalid CRED present payload"))?;
                if present.cred_type.trim().is_empty() {
                    return Err(ProtocolError::invalid_envelope("cred_type required"));
                }
                if present.credential.is_empty() {
                    return Err(ProtocolError::invalid_envelope("credential required"));
                }
                if !is_supported_cred_type(&present.cred_type) {
                    return Ok(self.err_reply(
                        env,
                        "UNSUPPORTED_CRED_TYPE",
                        "credential type not supported",
                    ));
                }
                if contains_ignore_case(&present.credential, b"invalid") {
                    return Ok(self.err_reply(env, "INVALID_CREDENTIAL", "invalid credential"));
                }
                if contains_ignore_case(&present.credential, b"expired") {
                    return Ok(self.err_reply(env, "EXPIRED", "credential expired"));
                }

                self.backends.cred.ensure_chain(&present.chain_id);
                if self.backends.cred.is_revoked(&present.chain_id) {
                    return Ok(self.err_reply(env, "REVOKED", "credential chain revoked"));
                }
                Ok(vec![])
            }

            cred::MSG_DELEGATE => {
                let delegate = cred::decode_delegate(&env.payload)
                    .map_err(|e| e.context("invalid CRED delegate payload"))?;
                if delegate.chain_id.is_empty() {
                    return Err(ProtocolError::invalid_envelope("chain_id required"));
                }
                if delegate.delegation.is_empty() {
                    return Err(ProtocolError::invalid_envelope("delegation required"));
                }
                if delegate.expires_at_unix_ms == 0 {
                    return Err(ProtocolError::invalid_envelope("expires_at_unix_ms required"));
                }
                if delegate.expires_at_unix_ms <= now {
                    return Ok(self.err_reply(env, "EXPIRED", "delegation expired"));
                }
                if self.backends.cred.is_revoked(&delegate.chain_id) {
                    return Ok(self.err_reply(env, "REVOKED", "credential chain revoked"));
                }
                let depth = self.backends.cred.increment_chain_depth(&delegate.chain_id);
                if depth > MAX_DELEGATION_DEPTH {
                    return Ok(self.err_reply(env, "CHAIN_LIMIT", "delegation chain length exceeded"));
                }
                Ok(vec![])
            }

            cred::MSG_REVOKE => {
                let revoke = cred::decode_revoke(&env.payload)
                    .map_err(|e| e.context("invalid CRED revoke payload"))?;
                if revoke.chain_id.is_empty() {
                    return Err(ProtocolError::invalid_envelope("chain_id required"));
                }
                self.backends.cred.revoke(&revoke.chain_id);
                Ok(vec![])
            }

            // Err replies are server-emitted only.
            cred::MSG_ERR => Err(ProtocolError::invalid_envelope(format!(
                "invalid CRED msg_type {}",
                env.msg_type
            ))),

            other => Err(ProtocolError::new(
                ErrorCode::UnsupportedMsgType,
                format!("invalid CRED msg_type {other}"),
            )),
        }
    }
}

fn is_supported_cred_type(cred_type: &str) -> bool {
    matches!(
        cred_type.trim().to_ascii_lowercase().as_str(),
        "jwt" | "mtls" | "opaque"
    )
}

fn contains_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    let haystack = haystack.to_ascii_lowercase();
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testutil::{assert_reply_shape, clock, ctx_for, request, NOW_MS};
    use swp_core::payload::cred::{CredDelegate, CredPresent, CredRevoke};

    struct Fixture {
        handler: CredHandler,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                handler: CredHandler::new(RuntimeBackends::default(), clock()),
            }
        }

        fn handle(&self, msg_type: u64, payload: Vec<u8>) -> Vec<Envelope> {
            let env = request(ProfileId::CRED, msg_type, payload);
            let replies = self.handler.handle(&ctx_for(&env), &env).unwrap();
            assert_reply_shape(&env, &replies);
            replies
        }

        fn present(&self, cred_type: &str, credential: &[u8], chain: &[u8]) -> Vec<Envelope> {
            self.handle(
                cred::MSG_PRESENT,
                cred::encode_present(&CredPresent {
                    cred_type: cred_type.to_string(),
                    credential: credential.to_vec(),
                    chain_id: chain.to_vec(),
                }),
            )
        }

        fn delegate(&self, chain: &[u8], expires: u64) -> Vec<Envelope> {
            self.handle(
                cred::MSG_DELEGATE,
                cred::encode_delegate(&CredDelegate {
                    chain_id: chain.to_vec(),
                    delegation: b"grant".to_vec(),
                    expires_at_unix_ms: expires,
                }),
            )
        }
    }

    fn err_code(replies: &[Envelope]) -> String {
        cred::decode_err(&replies[0].payload).unwrap().code
    }

    #[test]
    fn valid_present_is_silent() {
        let f = Fixture::new();
        assert!(f.present("jwt", b"good-token", b"chain-1").is_empty());
    }

    #[test]
    fn screening_rules() {
        let f = Fixture::new();
        assert_eq!(err_code(&f.present("x509", b"t", b"c")), "UNSUPPORTED_CRED_TYPE");
        assert_eq!(err_code(&f.present("jwt", b"an INVALID token", b"c")), "INVALID_CREDENTIAL");
        assert_eq!(err_code(&f.present("jwt", b"expired token", b"c")), "EXPIRED");
    }

    #[test]
    fn chain_depth_limit() {
        let f = Fixture::new();
        let expires = NOW_MS + 60_000;
        // Chain starts at depth 1 (the presenting credential); seven
        // delegations reach the limit of 8.
        f.present("jwt", b"root-token", b"chain-1");
        for _ in 0..7 {
            assert!(f.delegate(b"chain-1", expires).is_empty());
        }
        assert_eq!(err_code(&f.delegate(b"chain-1", expires)), "CHAIN_LIMIT");
    }

    #[test]
    fn expired_delegation_rejected() {
        let f = Fixture::new();
        assert_eq!(err_code(&f.delegate(b"chain-1", NOW_MS)), "EXPIRED");
        assert_eq!(err_code(&f.delegate(b"chain-1", NOW_MS - 1)), "EXPIRED");
    }

    #[test]
    fn revoked_chain_rejected_on_present_and_delegate() {
        let f = Fixture::new();
        f.handle(
            cred::MSG_REVOKE,
            cred::encode_revoke(&CredRevoke {
                chain_id: b"chain-1".to_vec(),
                reason: "compromised".to_string(),
            }),
        );
        assert_eq!(err_code(&f.present("jwt", b"good", b"chain-1")), "REVOKED");
        assert_eq!(err_code(&f.delegate(b"chain-1", NOW_MS + 60_000)), "REVOKED");
    }

    #[test]
    fn required_fields_enforced() {
        let f = Fixture::new();
        let env = request(
            ProfileId::CRED,
            cred::MSG_PRESENT,
            cred::encode_present(&CredPresent::default()),
        );
        let err = f.handler.handle(&ctx_for(&env), &env).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidEnvelope);

        let env = request(
            ProfileId::CRED,
            cred::MSG_DELEGATE,
            cred::encode_delegate(&CredDelegate {
                chain_id: b"c".to_vec(),
                delegation: b"d".to_vec(),
                expires_at_unix_ms: 0,
            }),
        );
        let err = f.handler.handle(&ctx_for(&env), &env).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidEnvelope);
    }
}
