//! Run report model and comparison logic.

use serde::{Deserialize, Serialize};

use crate::eval::Observed;
use crate::vector::Vector;

/// Schema version of the summary JSON.
pub const SCHEMA_VERSION: u32 = 1;

/// Metadata identifying one runner invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunInfo {
    pub pattern: String,
    pub no_fallback: bool,
    pub timestamp_utc: String,
    pub runner_git_sha: String,
}

/// One vector's evaluation result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorResult {
    pub vector_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    pub pass: bool,

    #[serde(default)]
    pub expected: String,

    #[serde(default)]
    pub observed: String,

    #[serde(rename = "expected_code", default)]
    pub code_expected: String,

    #[serde(rename = "observed_code", default)]
    pub code_observed: String,

    #[serde(rename = "expected_error_code", default, skip_serializing_if = "String::is_empty")]
    pub error_code_expected: String,

    #[serde(rename = "observed_error_code", default, skip_serializing_if = "String::is_empty")]
    pub error_code_observed: String,

    pub used_fallback: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fallback_mode: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

/// The full run summary, written to `--json-out`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub schema_version: u32,
    pub run: RunInfo,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub fallback_count: usize,
    pub results: Vec<VectorResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<VectorResult>,
}

impl Summary {
    #[must_use]
    pub fn new(run: RunInfo, total: usize) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run,
            total,
            ..Self::default()
        }
    }

    /// Records a result, updating the pass/fail/fallback tallies.
    pub fn record(&mut self, result: VectorResult) {
        if result.used_fallback {
            self.fallback_count += 1;
        }
        if result.pass {
            self.passed += 1;
        } else {
            self.failed += 1;
            self.failures.push(result.clone());
        }
        self.results.push(result);
    }
}

/// Compares expected vs observed; returns a failure detail on mismatch.
#[must_use]
pub fn compare(vector: &Vector, observed: &Observed) -> Option<String> {
    let expected_outcome = vector.expected.outcome.trim();
    if observed.outcome != expected_outcome {
        return Some(format!(
            "outcome mismatch: expected={expected_outcome} observed={}",
            observed.outcome
        ));
    }

    let expected_code = vector.expected.code.trim();
    if !expected_code.is_empty() && observed.code != expected_code {
        return Some(format!(
            "code mismatch: expected={expected_code} observed={}",
            observed.code
        ));
    }

    let expected_canonical = vector.expected_canonical_code();
    if !expected_canonical.is_empty() {
        let observed_canonical = observed.canonical_code();
        if observed_canonical != expected_canonical {
            return Some(format!(
                "canonical code mismatch: expected={expected_canonical} observed={observed_canonical}"
            ));
        }
    }
    None
}
