//! Protocol constants and per-connection size limits.

/// Envelope version this implementation speaks. Anything else is rejected
/// with `UNSUPPORTED_VERSION`.
pub const PROTOCOL_VERSION: u64 = 1;

/// Maximum frame body length (8 MiB). The length prefix is validated against
/// this bound before any allocation happens.
pub const MAX_FRAME_BYTES: u32 = 8 * 1024 * 1024;

/// Minimum accepted `msg_id` length in bytes.
pub const MIN_MSG_ID_BYTES: usize = 8;

/// Maximum accepted `msg_id` length in bytes.
pub const MAX_MSG_ID_BYTES: usize = 64;

/// Maximum encoded length of the extensions blob.
pub const MAX_EXT_BYTES: usize = 4096;

/// Default timestamp skew tolerance (5 minutes) when freshness enforcement
/// is enabled.
pub const DEFAULT_MAX_CLOCK_SKEW_MS: u64 = 5 * 60 * 1000;

/// Size limits applied while decoding frames and envelopes.
///
/// The payload bound defaults to the frame bound: an envelope can never carry
/// more payload than its frame admits, but conformance vectors override
/// `max_payload_bytes` downward to probe the envelope-level check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum frame body length.
    pub max_frame_bytes: u32,
    /// Maximum envelope payload length.
    pub max_payload_bytes: u32,
    /// Minimum `msg_id` length.
    pub min_msg_id_bytes: usize,
    /// Maximum `msg_id` length.
    pub max_msg_id_bytes: usize,
    /// Maximum encoded extensions-blob length.
    pub max_ext_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frame_bytes: MAX_FRAME_BYTES,
            max_payload_bytes: MAX_FRAME_BYTES,
            min_msg_id_bytes: MIN_MSG_ID_BYTES,
            max_msg_id_bytes: MAX_MSG_ID_BYTES,
            max_ext_bytes: MAX_EXT_BYTES,
        }
    }
}
