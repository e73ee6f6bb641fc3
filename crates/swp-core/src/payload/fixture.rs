//! Synthetic conformance-fixture payloads.
//!
//! Generated profile vectors carry a small marker payload instead of a real
//! profile message: field 1 is the profile name, field 2 the vector id. The
//! runner decodes the marker and applies deterministic reject rules keyed by
//! vector id, so scenario vectors (multi-frame lifecycles compressed into a
//! single fixture) evaluate without replaying the whole exchange.

use std::collections::HashMap;

use crate::error::{ProtocolError, ProtocolResult};
use crate::wire::fields;

/// Outcome of evaluating a fixture payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub reject: bool,
    pub code: String,
    pub reason: String,
}

impl Decision {
    fn accept() -> Self {
        Self {
            reject: false,
            code: "OK".to_string(),
            reason: String::new(),
        }
    }

    fn reject(code: &str, reason: &str) -> Self {
        Self {
            reject: true,
            code: code.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Decodes the profile marker and vector id from a fixture payload.
///
/// # Errors
///
/// `INVALID_ENVELOPE` when either marker is missing or malformed.
pub fn decode_marker(payload: &[u8]) -> ProtocolResult<(String, String)> {
    let mut profile = String::new();
    let mut vector_id = String::new();
    for field in fields(payload) {
        let field = field?;
        match field.number {
            1 => profile = field.string("fixture.profile")?,
            2 => vector_id = field.string("fixture.vector_id")?,
            _ => {}
        }
    }
    if profile.is_empty() {
        return Err(ProtocolError::invalid_envelope(
            "fixture payload missing profile marker",
        ));
    }
    if vector_id.is_empty() {
        return Err(ProtocolError::invalid_envelope(
            "fixture payload missing vector id",
        ));
    }
    Ok((profile, vector_id))
}

/// Evaluates a fixture payload for `expected_profile`.
///
/// A marker naming a different profile is a deterministic
/// `INVALID_PROFILE_PAYLOAD` reject; otherwise the per-profile reject table
/// decides.
///
/// # Errors
///
/// Marker decode failures, per [`decode_marker`].
pub fn evaluate(payload: &[u8], expected_profile: &str) -> ProtocolResult<Decision> {
    let (profile, vector_id) = decode_marker(payload)?;
    if profile != expected_profile {
        return Ok(Decision::reject(
            "INVALID_PROFILE_PAYLOAD",
            &format!("invalid {expected_profile} payload marker"),
        ));
    }
    if let Some(decision) = reject_rules(expected_profile).get(vector_id.as_str()) {
        return Ok(decision.clone());
    }
    Ok(Decision::accept())
}

const INVARIANT: &str = "profile invariant violation";
const NOT_FOUND_REASON: &str = "deterministic not-found behavior";

fn reject_rules(profile: &str) -> HashMap<&'static str, Decision> {
    let entries: &[(&'static str, &'static str, &'static str)] = match profile {
        "a2a" => &[
            ("a2a_0004_event_after_terminal_result", "INVALID_PROFILE_PAYLOAD", INVARIANT),
            ("a2a_0006_event_before_task_invalid", "INVALID_PROFILE_PAYLOAD", INVARIANT),
            ("a2a_0007_result_before_task_invalid", "INVALID_PROFILE_PAYLOAD", INVARIANT),
            (
                "a2a_0009_duplicate_task_conflicting_payload_rejected",
                "INVALID_PROFILE_PAYLOAD",
                INVARIANT,
            ),
            ("a2a_0010_post_terminal_event_rejected", "INVALID_PROFILE_PAYLOAD", INVARIANT),
            ("a2a_0011_post_terminal_result_rejected", "INVALID_PROFILE_PAYLOAD", INVARIANT),
        ],
        "agdisc" => &[
            ("agdisc_0002_not_found", "NOT_FOUND", NOT_FOUND_REASON),
            ("agdisc_0003_invalid_doc_rejected", "INVALID_PROFILE_PAYLOAD", INVARIANT),
        ],
        "tooldisc" => &[
            ("tooldisc_0003_missing_tool_not_found", "NOT_FOUND", NOT_FOUND_REASON),
            ("tooldisc_0004_schema_ref_invalid", "INVALID_PROFILE_PAYLOAD", INVARIANT),
            (
                "tooldisc_0005_descriptor_missing_required",
                "INVALID_PROFILE_PAYLOAD",
                INVARIANT,
            ),
        ],
        "events" => &[
            ("events_0001_required_fields", "INVALID_PROFILE_PAYLOAD", INVARIANT),
            ("events_0005_invalid_severity", "INVALID_PROFILE_PAYLOAD", INVARIANT),
        ],
        "artifact" => &[
            ("artifact_0003_integrity_mismatch", "INVALID_PROFILE_PAYLOAD", INVARIANT),
            ("artifact_0006_corruption_rejected", "INVALID_PROFILE_PAYLOAD", INVARIANT),
        ],
        "cred" => &[
            ("cred_0001_expiry_enforced", "INVALID_PROFILE_PAYLOAD", INVARIANT),
            ("cred_0003_invalid_credential", "INVALID_PROFILE_PAYLOAD", INVARIANT),
        ],
        "state" => &[
            ("state_0002_hash_mismatch", "INVALID_PROFILE_PAYLOAD", INVARIANT),
            ("state_0003_parent_missing", "INVALID_PROFILE_PAYLOAD", INVARIANT),
        ],
        "obs" => &[("obs_0001_traceparent_validity", "INVALID_PROFILE_PAYLOAD", INVARIANT)],
        _ => &[],
    };
    entries
        .iter()
        .map(|(id, code, reason)| (*id, Decision::reject(code, reason)))
        .collect()
}

/// Encodes a fixture marker payload, used by runner tests.
#[must_use]
pub fn encode_marker(profile: &str, vector_id: &str) -> Vec<u8> {
    let mut out = Vec::new();
    crate::wire::put_string_field(&mut out, 1, profile);
    crate::wire::put_string_field(&mut out, 2, vector_id);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_roundtrip() {
        let payload = encode_marker("a2a", "a2a_0001_handshake");
        let (profile, vector_id) = decode_marker(&payload).unwrap();
        assert_eq!(profile, "a2a");
        assert_eq!(vector_id, "a2a_0001_handshake");
    }

    #[test]
    fn missing_markers_rejected() {
        assert!(decode_marker(&[]).is_err());
        let mut only_profile = Vec::new();
        crate::wire::put_string_field(&mut only_profile, 1, "a2a");
        assert!(decode_marker(&only_profile).is_err());
    }

    #[test]
    fn profile_mismatch_is_deterministic_reject() {
        let payload = encode_marker("events", "events_0002_publish");
        let decision = evaluate(&payload, "a2a").unwrap();
        assert!(decision.reject);
        assert_eq!(decision.code, "INVALID_PROFILE_PAYLOAD");
    }

    #[test]
    fn reject_table_hits() {
        let payload = encode_marker("a2a", "a2a_0004_event_after_terminal_result");
        let decision = evaluate(&payload, "a2a").unwrap();
        assert!(decision.reject);
        assert_eq!(decision.code, "INVALID_PROFILE_PAYLOAD");

        let payload = encode_marker("agdisc", "agdisc_0002_not_found");
        let decision = evaluate(&payload, "agdisc").unwrap();
        assert_eq!(decision.code, "NOT_FOUND");
    }

    #[test]
    fn unlisted_vectors_accept() {
        let payload = encode_marker("relay", "relay_0001_publish_ack");
        let decision = evaluate(&payload, "relay").unwrap();
        assert!(!decision.reject);
        assert_eq!(decision.code, "OK");
    }
}
