//! Vector descriptor model.
//!
//! Descriptors are hand-edited JSON; unknown members are ignored and most
//! members are optional with empty defaults so older fixture sets keep
//! loading.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reference to the fixture backing a vector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureRef {
    /// Binary file holding a single framed envelope (runtime vectors).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bin_file: String,

    /// Evidence file proving a process-level property (process vectors).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub evidence_file: String,
}

/// The expected evaluation result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Expected {
    /// `accept`, `reject`, or `process_check`.
    #[serde(default)]
    pub outcome: String,

    /// `runtime` or `process`.
    #[serde(default)]
    pub evidence_type: String,

    /// Expected internal code (alias form).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,

    /// Expected canonical `ERR_*` code, when pinned explicitly.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expected_error_code: String,

    /// Free-form policy/limit overrides, e.g. `limits.max_payload_bytes`
    /// and `policy.timestamp_required`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertions: Option<Value>,

    #[serde(default)]
    pub fixture: FixtureRef,

    /// Human-readable rejection context.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rejection_reason: String,
}

/// One conformance vector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vector {
    pub vector_id: String,

    #[serde(default)]
    pub group: String,

    /// Category selects the evaluation path (`core`, `e1`, `s1`, `mcp`, or
    /// a profile name).
    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub description: String,

    pub expected: Expected,
}

impl Vector {
    /// The canonical code this vector expects, when it expects a reject.
    ///
    /// An explicit `expected_error_code` wins; otherwise the internal code
    /// is canonicalized.
    #[must_use]
    pub fn expected_canonical_code(&self) -> String {
        let pinned = self.expected.expected_error_code.trim();
        if !pinned.is_empty() {
            return pinned.to_string();
        }
        if !self.expected.outcome.eq_ignore_ascii_case("reject") {
            return String::new();
        }
        swp_core::error::canonical_code(&self.expected.code)
            .unwrap_or_default()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_parses_with_unknown_members() {
        let raw = r#"{
            "vector_id": "core_0001_valid_frame",
            "group": "core",
            "category": "core",
            "description": "valid minimal frame",
            "future_member": {"ignored": true},
            "expected": {
                "outcome": "accept",
                "evidence_type": "runtime",
                "fixture": {"bin_file": "core_0001.bin"}
            }
        }"#;
        let vector: Vector = serde_json::from_str(raw).unwrap();
        assert_eq!(vector.vector_id, "core_0001_valid_frame");
        assert_eq!(vector.expected.fixture.bin_file, "core_0001.bin");
        assert!(vector.expected_canonical_code().is_empty());
    }

    #[test]
    fn expected_canonical_code_resolution() {
        let mut vector = Vector {
            expected: Expected {
                outcome: "reject".to_string(),
                code: "INVALID_FRAME".to_string(),
                ..Expected::default()
            },
            ..Vector::default()
        };
        assert_eq!(vector.expected_canonical_code(), "ERR_INVALID_FRAME");

        vector.expected.expected_error_code = "ERR_SECURITY_POLICY".to_string();
        assert_eq!(vector.expected_canonical_code(), "ERR_SECURITY_POLICY");
    }
}
