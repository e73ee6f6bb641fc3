//! Error taxonomy: internal codes, canonical `ERR_*` codes, and the mapping
//! between them.
//!
//! Internal codes are what emission sites attach to failures. The canonical
//! codes are the public conformance surface; every internal code maps to
//! exactly one canonical code, and conformance comparisons happen on the
//! canonical form.

use thiserror::Error;

/// Result alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Internal error codes attached at emission sites.
///
/// This is a closed set: handlers and codecs never invent codes outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Frame or envelope structure violation (bad prefix, short read,
    /// varint overflow, trailing bytes).
    InvalidFrame,
    /// Envelope version is not the supported version.
    UnsupportedVersion,
    /// Profile id is not in the known-profile set.
    UnknownProfile,
    /// Envelope field bounds or payload schema violation.
    InvalidEnvelope,
    /// Message type outside the profile's supported set.
    UnsupportedMsgType,
    /// MCPMap payload is not valid UTF-8 JSON-RPC.
    InvalidMcpPayload,
    /// Profile lifecycle invariant violation.
    InvalidProfilePayload,
    /// Pre-frame security policy rejection.
    SecurityPolicy,
    /// Per-connection frame-rate window exceeded.
    RateLimitExceeded,
    /// msg_id seen within the duplicate window.
    DuplicateMsgId,
    /// Known-but-absent resource.
    NotFound,
    /// Compatibility policy rejection.
    CompatibilityPolicy,
    /// Backend or encoding fault.
    InternalError,
}

impl ErrorCode {
    /// The internal (alias) spelling used in logs and vector descriptors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidFrame => "INVALID_FRAME",
            Self::UnsupportedVersion => "UNSUPPORTED_VERSION",
            Self::UnknownProfile => "UNKNOWN_PROFILE",
            Self::InvalidEnvelope => "INVALID_ENVELOPE",
            Self::UnsupportedMsgType => "UNSUPPORTED_MSG_TYPE",
            Self::InvalidMcpPayload => "INVALID_MCP_PAYLOAD",
            Self::InvalidProfilePayload => "INVALID_PROFILE_PAYLOAD",
            Self::SecurityPolicy => "SECURITY_POLICY",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::DuplicateMsgId => "DUPLICATE_MSG_ID",
            Self::NotFound => "NOT_FOUND",
            Self::CompatibilityPolicy => "COMPATIBILITY_POLICY",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// The canonical public code this internal code maps to.
    #[must_use]
    pub const fn canonical(self) -> CanonicalCode {
        match self {
            Self::InvalidFrame => CanonicalCode::InvalidFrame,
            Self::UnsupportedVersion => CanonicalCode::UnsupportedVersion,
            Self::UnknownProfile => CanonicalCode::UnknownProfile,
            Self::InvalidEnvelope => CanonicalCode::InvalidEnvelope,
            Self::UnsupportedMsgType => CanonicalCode::UnsupportedMsgType,
            Self::InvalidMcpPayload => CanonicalCode::InvalidMcpPayload,
            Self::InvalidProfilePayload => CanonicalCode::InvalidProfilePayload,
            Self::SecurityPolicy => CanonicalCode::SecurityPolicy,
            Self::RateLimitExceeded => CanonicalCode::RateLimitExceeded,
            Self::DuplicateMsgId => CanonicalCode::DuplicateMsgId,
            Self::NotFound => CanonicalCode::NotFound,
            Self::CompatibilityPolicy => CanonicalCode::CompatibilityPolicy,
            Self::InternalError => CanonicalCode::InternalError,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical public error codes (the conformance contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalCode {
    InvalidFrame,
    UnsupportedVersion,
    UnknownProfile,
    InvalidEnvelope,
    UnsupportedMsgType,
    InvalidMcpPayload,
    InvalidProfilePayload,
    SecurityPolicy,
    RateLimitExceeded,
    DuplicateMsgId,
    NotFound,
    CompatibilityPolicy,
    InternalError,
}

impl CanonicalCode {
    /// The public `ERR_*` spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidFrame => "ERR_INVALID_FRAME",
            Self::UnsupportedVersion => "ERR_UNSUPPORTED_VERSION",
            Self::UnknownProfile => "ERR_UNKNOWN_PROFILE",
            Self::InvalidEnvelope => "ERR_INVALID_ENVELOPE",
            Self::UnsupportedMsgType => "ERR_UNSUPPORTED_MSG_TYPE",
            Self::InvalidMcpPayload => "ERR_INVALID_MCP_PAYLOAD",
            Self::InvalidProfilePayload => "ERR_INVALID_PROFILE_PAYLOAD",
            Self::SecurityPolicy => "ERR_SECURITY_POLICY",
            Self::RateLimitExceeded => "ERR_RATE_LIMIT_EXCEEDED",
            Self::DuplicateMsgId => "ERR_DUPLICATE_MSG_ID",
            Self::NotFound => "ERR_NOT_FOUND",
            Self::CompatibilityPolicy => "ERR_COMPATIBILITY_POLICY",
            Self::InternalError => "ERR_INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for CanonicalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonicalizes a code string as it appears in vector descriptors or logs.
///
/// Accepts both the internal alias form (`INVALID_FRAME`) and the already
/// canonical form (`ERR_INVALID_FRAME`); returns `None` for codes outside
/// the taxonomy. Matching is case-insensitive and whitespace-tolerant
/// because vector files are hand-edited.
#[must_use]
pub fn canonical_code(code: &str) -> Option<&'static str> {
    let trimmed = code.trim();
    let upper = trimmed.to_ascii_uppercase();
    let alias = upper.strip_prefix("ERR_").unwrap_or(&upper);
    let canonical = match alias {
        "INVALID_FRAME" | "FRAME_TOO_LARGE" => "ERR_INVALID_FRAME",
        "UNSUPPORTED_VERSION" => "ERR_UNSUPPORTED_VERSION",
        "UNKNOWN_PROFILE" => "ERR_UNKNOWN_PROFILE",
        "INVALID_ENVELOPE" => "ERR_INVALID_ENVELOPE",
        "UNSUPPORTED_MSG_TYPE" => "ERR_UNSUPPORTED_MSG_TYPE",
        "INVALID_MCP_PAYLOAD" => "ERR_INVALID_MCP_PAYLOAD",
        "INVALID_PROFILE_PAYLOAD" => "ERR_INVALID_PROFILE_PAYLOAD",
        "SECURITY_POLICY" => "ERR_SECURITY_POLICY",
        "RATE_LIMIT_EXCEEDED" => "ERR_RATE_LIMIT_EXCEEDED",
        "DUPLICATE_MSG_ID" => "ERR_DUPLICATE_MSG_ID",
        "NOT_FOUND" => "ERR_NOT_FOUND",
        "COMPATIBILITY_POLICY" => "ERR_COMPATIBILITY_POLICY",
        "INTERNAL_ERROR" => "ERR_INTERNAL_ERROR",
        _ => return None,
    };
    Some(canonical)
}

/// A protocol failure: an internal code plus a human-readable reason.
///
/// The reason is for logs and runner detail output only; conformance
/// comparisons use the code (canonicalized).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code}: {reason}")]
pub struct ProtocolError {
    /// Internal code attached at the emission site.
    pub code: ErrorCode,
    /// Human-readable context.
    pub reason: String,
}

impl ProtocolError {
    /// Creates an error with the given code and reason.
    pub fn new(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Shorthand for `INVALID_FRAME` failures.
    pub fn invalid_frame(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFrame, reason)
    }

    /// Shorthand for `INVALID_ENVELOPE` failures.
    pub fn invalid_envelope(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidEnvelope, reason)
    }

    /// Shorthand for `INTERNAL_ERROR` failures.
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, reason)
    }

    /// The canonical public code for this failure.
    #[must_use]
    pub const fn canonical(&self) -> CanonicalCode {
        self.code.canonical()
    }

    /// Prefixes the reason with context from the call site; the code is
    /// unchanged.
    #[must_use]
    pub fn context(self, prefix: &str) -> Self {
        Self {
            code: self.code,
            reason: format!("{prefix}: {}", self.reason),
        }
    }
}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(format!("io: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_internal_code_has_one_canonical_form() {
        let codes = [
            ErrorCode::InvalidFrame,
            ErrorCode::UnsupportedVersion,
            ErrorCode::UnknownProfile,
            ErrorCode::InvalidEnvelope,
            ErrorCode::UnsupportedMsgType,
            ErrorCode::InvalidMcpPayload,
            ErrorCode::InvalidProfilePayload,
            ErrorCode::SecurityPolicy,
            ErrorCode::RateLimitExceeded,
            ErrorCode::DuplicateMsgId,
            ErrorCode::NotFound,
            ErrorCode::CompatibilityPolicy,
            ErrorCode::InternalError,
        ];
        for code in codes {
            let canonical = code.canonical().as_str();
            assert!(canonical.starts_with("ERR_"));
            assert_eq!(canonical_code(code.as_str()), Some(canonical));
            assert_eq!(canonical_code(canonical), Some(canonical));
        }
    }

    #[test]
    fn canonical_code_rejects_unknown() {
        assert_eq!(canonical_code("NO_SUCH_CODE"), None);
        assert_eq!(canonical_code(""), None);
    }

    #[test]
    fn canonical_code_tolerates_case_and_whitespace() {
        assert_eq!(
            canonical_code("  invalid_frame "),
            Some("ERR_INVALID_FRAME")
        );
        assert_eq!(
            canonical_code("err_duplicate_msg_id"),
            Some("ERR_DUPLICATE_MSG_ID")
        );
    }

    #[test]
    fn frame_too_large_aliases_to_invalid_frame() {
        assert_eq!(
            canonical_code("ERR_FRAME_TOO_LARGE"),
            Some("ERR_INVALID_FRAME")
        );
    }
}
