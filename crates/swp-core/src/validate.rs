//! Envelope validation policy.
//!
//! Checks run in a fixed order and the first failure wins, so conformance
//! vectors that violate several rules at once observe a deterministic code.

use std::collections::HashSet;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::envelope::Envelope;
use crate::error::{ErrorCode, ProtocolError, ProtocolResult};
use crate::limits::{Limits, DEFAULT_MAX_CLOCK_SKEW_MS, PROTOCOL_VERSION};
use crate::profile::known_profiles;

/// Envelope validator.
///
/// Immutable after construction; the daemon shares one instance across all
/// connections. Timestamp freshness is disabled by default and switched on
/// per-vector by the conformance runner.
#[derive(Debug, Clone)]
pub struct Validator {
    pub limits: Limits,
    pub known_profiles: HashSet<u64>,
    pub enforce_known_profile: bool,
    pub enforce_timestamp: bool,
    pub allow_zero_ts: bool,
    pub max_clock_skew_ms: u64,
    clock: Arc<dyn Clock>,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            known_profiles: known_profiles().into_iter().collect(),
            enforce_known_profile: true,
            enforce_timestamp: false,
            allow_zero_ts: true,
            max_clock_skew_ms: DEFAULT_MAX_CLOCK_SKEW_MS,
            clock: Arc::new(SystemClock),
        }
    }
}

impl Validator {
    /// Replaces the clock (tests drive skew cases with a manual clock).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validates a decoded envelope.
    ///
    /// Check order (first failure wins):
    ///
    /// 1. version — `UNSUPPORTED_VERSION`
    /// 2. known profile — `UNKNOWN_PROFILE`
    /// 3. non-zero msg_type — `INVALID_ENVELOPE`
    /// 4. msg_id length bounds — `INVALID_ENVELOPE`
    /// 5. payload size — `INVALID_ENVELOPE`
    /// 6. timestamp freshness (when enforced) — `INVALID_ENVELOPE`
    ///
    /// # Errors
    ///
    /// The first failed check, as above.
    pub fn validate(&self, env: &Envelope) -> ProtocolResult<()> {
        if env.version != PROTOCOL_VERSION {
            return Err(ProtocolError::new(
                ErrorCode::UnsupportedVersion,
                format!("unsupported version {}", env.version),
            ));
        }

        if self.enforce_known_profile && !self.known_profiles.contains(&env.profile_id) {
            return Err(ProtocolError::new(
                ErrorCode::UnknownProfile,
                format!("unknown profile_id {}", env.profile_id),
            ));
        }

        if env.msg_type == 0 {
            return Err(ProtocolError::invalid_envelope("msg_type must be non-zero"));
        }

        let id_len = env.msg_id.len();
        if id_len < self.limits.min_msg_id_bytes || id_len > self.limits.max_msg_id_bytes {
            return Err(ProtocolError::invalid_envelope(format!(
                "msg_id length {id_len} not in [{},{}]",
                self.limits.min_msg_id_bytes, self.limits.max_msg_id_bytes
            )));
        }

        if env.payload.len() > self.limits.max_payload_bytes as usize {
            return Err(ProtocolError::invalid_envelope(format!(
                "payload length {} exceeds max {}",
                env.payload.len(),
                self.limits.max_payload_bytes
            )));
        }

        if self.enforce_timestamp {
            if env.ts_unix_ms == 0 {
                if !self.allow_zero_ts {
                    return Err(ProtocolError::invalid_envelope(
                        "zero timestamp is not allowed",
                    ));
                }
            } else {
                let now = self.clock.now_unix_ms();
                let skew = now.abs_diff(env.ts_unix_ms);
                if skew > self.max_clock_skew_ms {
                    return Err(ProtocolError::invalid_envelope(format!(
                        "timestamp skew {skew}ms exceeds max {}ms",
                        self.max_clock_skew_ms
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const NOW_MS: u64 = 1_720_000_000_000;

    fn valid_envelope() -> Envelope {
        Envelope {
            version: PROTOCOL_VERSION,
            profile_id: 1,
            msg_type: 1,
            flags: 0,
            ts_unix_ms: NOW_MS,
            msg_id: b"12345678abcdefgh".to_vec(),
            extensions: vec![],
            payload: b"{}".to_vec(),
        }
    }

    fn validator() -> Validator {
        Validator::default().with_clock(Arc::new(ManualClock::new(NOW_MS)))
    }

    #[test]
    fn valid_envelope_passes() {
        validator().validate(&valid_envelope()).unwrap();
    }

    #[test]
    fn wrong_version_rejected_first() {
        // Version failure wins even with other violations present.
        let mut env = valid_envelope();
        env.version = 2;
        env.msg_type = 0;
        env.msg_id = vec![1];
        let err = validator().validate(&env).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedVersion);
    }

    #[test]
    fn unknown_profile_rejected() {
        let mut env = valid_envelope();
        env.profile_id = 99;
        let err = validator().validate(&env).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownProfile);

        let mut relaxed = validator();
        relaxed.enforce_known_profile = false;
        relaxed.validate(&env).unwrap();
    }

    #[test]
    fn zero_msg_type_rejected() {
        let mut env = valid_envelope();
        env.msg_type = 0;
        let err = validator().validate(&env).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidEnvelope);
    }

    #[test]
    fn msg_id_length_bounds() {
        let mut env = valid_envelope();
        env.msg_id = vec![0u8; 7];
        assert_eq!(
            validator().validate(&env).unwrap_err().code,
            ErrorCode::InvalidEnvelope
        );

        env.msg_id = vec![0u8; 8];
        validator().validate(&env).unwrap();

        env.msg_id = vec![0u8; 64];
        validator().validate(&env).unwrap();

        env.msg_id = vec![0u8; 65];
        assert_eq!(
            validator().validate(&env).unwrap_err().code,
            ErrorCode::InvalidEnvelope
        );
    }

    #[test]
    fn payload_over_limit_rejected() {
        let mut v = validator();
        v.limits.max_payload_bytes = 4;
        let mut env = valid_envelope();
        env.payload = vec![0u8; 5];
        assert_eq!(
            v.validate(&env).unwrap_err().code,
            ErrorCode::InvalidEnvelope
        );
        env.payload = vec![0u8; 4];
        v.validate(&env).unwrap();
    }

    #[test]
    fn timestamp_enforcement() {
        let mut v = validator();
        v.enforce_timestamp = true;
        v.allow_zero_ts = false;

        let mut env = valid_envelope();
        env.ts_unix_ms = 0;
        assert_eq!(
            v.validate(&env).unwrap_err().code,
            ErrorCode::InvalidEnvelope
        );

        // Within skew either direction.
        env.ts_unix_ms = NOW_MS - DEFAULT_MAX_CLOCK_SKEW_MS;
        v.validate(&env).unwrap();
        env.ts_unix_ms = NOW_MS + DEFAULT_MAX_CLOCK_SKEW_MS;
        v.validate(&env).unwrap();

        // Stale and future beyond skew.
        env.ts_unix_ms = NOW_MS - DEFAULT_MAX_CLOCK_SKEW_MS - 1;
        assert_eq!(
            v.validate(&env).unwrap_err().code,
            ErrorCode::InvalidEnvelope
        );
        env.ts_unix_ms = NOW_MS + DEFAULT_MAX_CLOCK_SKEW_MS + 1;
        assert_eq!(
            v.validate(&env).unwrap_err().code,
            ErrorCode::InvalidEnvelope
        );
    }

    #[test]
    fn zero_ts_allowed_when_configured() {
        let mut v = validator();
        v.enforce_timestamp = true;
        v.allow_zero_ts = true;
        let mut env = valid_envelope();
        env.ts_unix_ms = 0;
        v.validate(&env).unwrap();
    }

    #[test]
    fn timestamp_ignored_by_default() {
        let mut env = valid_envelope();
        env.ts_unix_ms = 1; // wildly stale, but enforcement is off
        validator().validate(&env).unwrap();
    }
}
