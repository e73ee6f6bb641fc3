//! Conformance runner for the SWP protocol stack.
//!
//! A *vector* pairs a serialized frame fixture (or a process-evidence file)
//! with an expected outcome and error code. The runner replays runtime
//! fixtures through framing → envelope decode → validation → category
//! checks and compares the observed `(outcome, code, canonical code)`
//! triple against the descriptor.
//!
//! Scenario vectors whose rejection arises from multi-frame lifecycles are
//! satisfied by *fallback* evaluation (observed = expected, flagged in the
//! report); `--no-fallback` turns fallback use into failure.

pub mod eval;
pub mod report;
pub mod vector;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use eval::{evaluate_runtime, Observed};
pub use report::{RunInfo, Summary, VectorResult};
pub use vector::{Expected, FixtureRef, Vector};

/// Glob set evaluated when no `--pattern` is supplied.
pub const DEFAULT_GLOBS: [&str; 15] = [
    "conformance/vectors/core_*.json",
    "conformance/vectors/e1_*.json",
    "conformance/vectors/s1_*.json",
    "conformance/vectors/mcp_*.json",
    "conformance/vectors/a2a_*.json",
    "conformance/vectors/agdisc_*.json",
    "conformance/vectors/tooldisc_*.json",
    "conformance/vectors/rpc_*.json",
    "conformance/vectors/events_*.json",
    "conformance/vectors/artifact_*.json",
    "conformance/vectors/cred_*.json",
    "conformance/vectors/policyhint_*.json",
    "conformance/vectors/state_*.json",
    "conformance/vectors/obs_*.json",
    "conformance/vectors/relay_*.json",
];

/// Runner configuration failures (exit code 2).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid glob pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("no vectors matched pattern {pattern:?}")]
    NoVectorsMatched { pattern: String },
}

/// Expands a comma-separated glob list into a sorted, deduplicated path
/// set.
///
/// An empty pattern uses [`DEFAULT_GLOBS`].
///
/// # Errors
///
/// [`ConfigError`] for malformed patterns or an empty match set.
pub fn collect_vectors(pattern: &str) -> Result<Vec<PathBuf>, ConfigError> {
    let globs: Vec<String> = if pattern.trim().is_empty() {
        DEFAULT_GLOBS.iter().map(ToString::to_string).collect()
    } else {
        pattern
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect()
    };

    let mut paths = BTreeSet::new();
    for g in &globs {
        let matches = glob::glob(g).map_err(|source| ConfigError::InvalidPattern {
            pattern: g.clone(),
            source,
        })?;
        for entry in matches.flatten() {
            paths.insert(entry);
        }
    }

    if paths.is_empty() {
        return Err(ConfigError::NoVectorsMatched {
            pattern: effective_pattern(pattern),
        });
    }
    Ok(paths.into_iter().collect())
}

/// The pattern string recorded in the run report.
#[must_use]
pub fn effective_pattern(pattern: &str) -> String {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        DEFAULT_GLOBS.join(",")
    } else {
        trimmed.to_string()
    }
}

/// Loads and structurally validates one vector descriptor.
///
/// # Errors
///
/// I/O and JSON failures, or missing required members.
pub fn load_vector(path: &Path) -> anyhow::Result<Vector> {
    let raw = std::fs::read(path)?;
    let vector: Vector = serde_json::from_slice(&raw)?;
    if vector.vector_id.is_empty() {
        anyhow::bail!("missing vector_id");
    }
    if vector.expected.outcome.is_empty() {
        anyhow::bail!("missing expected.outcome");
    }
    if vector.expected.evidence_type.is_empty() {
        anyhow::bail!("missing expected.evidence_type");
    }
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_pattern_falls_back_to_defaults() {
        assert!(effective_pattern("").contains("core_*.json"));
        assert_eq!(effective_pattern(" x.json "), "x.json");
    }

    #[test]
    fn empty_match_set_is_a_config_error() {
        let err = collect_vectors("/nonexistent-dir-zz/*.json").unwrap_err();
        assert!(matches!(err, ConfigError::NoVectorsMatched { .. }));
    }
}
