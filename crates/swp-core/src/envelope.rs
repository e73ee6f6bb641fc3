//! The fixed-order envelope record and its codec.
//!
//! An envelope body is the concatenation of five uvarints and three
//! length-prefixed fields, in this order and nothing else:
//!
//! ```text
//! uvarint(version) || uvarint(profile_id) || uvarint(msg_type) ||
//! uvarint(flags)   || uvarint(ts_unix_ms) ||
//! lp(msg_id) || lp(extensions_blob) || lp(payload)
//! ```
//!
//! where `lp(x) := uvarint(len(x)) || x`. Field order is positional, not
//! tagged. After the payload, zero bytes may remain; trailing bytes are a
//! structural violation.
//!
//! The codec does not interpret `flags` or extension TLVs: unknown flag bits
//! and unknown extension types round-trip verbatim, in input order.

use crate::error::{ProtocolError, ProtocolResult};
use crate::limits::Limits;
use crate::varint::{put_len_prefixed, put_uvarint, read_len_prefixed, read_uvarint};

/// A single extension TLV entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    /// Extension type tag. Unknown types are preserved, never reinterpreted.
    pub ext_type: u64,
    /// Opaque extension value.
    pub value: Vec<u8>,
}

/// The outer envelope carrying version, routing, identity, timing, and
/// payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub version: u64,
    pub profile_id: u64,
    pub msg_type: u64,
    pub flags: u64,
    pub ts_unix_ms: u64,
    pub msg_id: Vec<u8>,
    pub extensions: Vec<Extension>,
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Encodes the envelope body.
    ///
    /// Extensions are emitted in their stored order so a decode/encode pair
    /// is byte-identical.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + self.msg_id.len() + self.payload.len());
        put_uvarint(&mut out, self.version);
        put_uvarint(&mut out, self.profile_id);
        put_uvarint(&mut out, self.msg_type);
        put_uvarint(&mut out, self.flags);
        put_uvarint(&mut out, self.ts_unix_ms);
        put_len_prefixed(&mut out, &self.msg_id);

        let mut ext_blob = Vec::new();
        for ext in &self.extensions {
            put_uvarint(&mut ext_blob, ext.ext_type);
            put_len_prefixed(&mut ext_blob, &ext.value);
        }
        put_len_prefixed(&mut out, &ext_blob);

        put_len_prefixed(&mut out, &self.payload);
        out
    }

    /// Decodes an envelope from a complete frame body.
    ///
    /// # Errors
    ///
    /// - `INVALID_FRAME` for structural violations: truncated varints,
    ///   truncated length-prefixed fields, malformed extension TLVs, or
    ///   trailing bytes after the payload.
    /// - `INVALID_ENVELOPE` when the extensions blob or payload exceeds the
    ///   configured limits.
    pub fn decode(body: &[u8], limits: &Limits) -> ProtocolResult<Self> {
        let field = |name: &str, err: ProtocolError| {
            ProtocolError::new(err.code, format!("decode {name}: {}", err.reason))
        };

        let (version, rest) = read_uvarint(body).map_err(|e| field("version", e))?;
        let (profile_id, rest) = read_uvarint(rest).map_err(|e| field("profile_id", e))?;
        let (msg_type, rest) = read_uvarint(rest).map_err(|e| field("msg_type", e))?;
        let (flags, rest) = read_uvarint(rest).map_err(|e| field("flags", e))?;
        let (ts_unix_ms, rest) = read_uvarint(rest).map_err(|e| field("ts_unix_ms", e))?;

        let (msg_id, rest) = read_len_prefixed(rest).map_err(|e| field("msg_id", e))?;
        let (ext_blob, rest) = read_len_prefixed(rest).map_err(|e| field("extensions", e))?;
        if ext_blob.len() > limits.max_ext_bytes {
            return Err(ProtocolError::invalid_envelope(format!(
                "extensions length {} exceeds max {}",
                ext_blob.len(),
                limits.max_ext_bytes
            )));
        }
        let extensions = decode_extensions(ext_blob)?;

        let (payload, rest) = read_len_prefixed(rest).map_err(|e| field("payload", e))?;
        if payload.len() > limits.max_payload_bytes as usize {
            return Err(ProtocolError::invalid_envelope(format!(
                "payload length {} exceeds max {}",
                payload.len(),
                limits.max_payload_bytes
            )));
        }

        if !rest.is_empty() {
            return Err(ProtocolError::invalid_frame(format!(
                "trailing bytes: {}",
                rest.len()
            )));
        }

        Ok(Self {
            version,
            profile_id,
            msg_type,
            flags,
            ts_unix_ms,
            msg_id: msg_id.to_vec(),
            extensions,
            payload: payload.to_vec(),
        })
    }
}

fn decode_extensions(mut blob: &[u8]) -> ProtocolResult<Vec<Extension>> {
    let mut extensions = Vec::new();
    while !blob.is_empty() {
        let (ext_type, rest) = read_uvarint(blob)
            .map_err(|e| ProtocolError::invalid_frame(format!("extension TLV type: {}", e.reason)))?;
        let (value, rest) = read_len_prefixed(rest).map_err(|e| {
            ProtocolError::invalid_frame(format!("extension TLV value: {}", e.reason))
        })?;
        extensions.push(Extension {
            ext_type,
            value: value.to_vec(),
        });
        blob = rest;
    }
    Ok(extensions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::limits::PROTOCOL_VERSION;

    fn sample() -> Envelope {
        Envelope {
            version: PROTOCOL_VERSION,
            profile_id: 12,
            msg_type: 1,
            flags: 0b1010_0000, // unknown bits must survive
            ts_unix_ms: 1_720_000_000_000,
            msg_id: b"12345678abcdefgh".to_vec(),
            extensions: vec![
                Extension {
                    ext_type: 7,
                    value: b"seven".to_vec(),
                },
                Extension {
                    ext_type: 3,
                    value: vec![],
                },
            ],
            payload: b"payload-bytes".to_vec(),
        }
    }

    #[test]
    fn roundtrip_preserves_everything() {
        let env = sample();
        let encoded = env.encode();
        let decoded = Envelope::decode(&encoded, &Limits::default()).unwrap();
        assert_eq!(decoded, env);
        // Re-encode is byte-identical, including extension order.
        assert_eq!(decoded.encode(), encoded);
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut encoded = sample().encode();
        encoded.push(0x00);
        let err = Envelope::decode(&encoded, &Limits::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFrame);
    }

    #[test]
    fn truncated_body_rejected() {
        let encoded = sample().encode();
        for cut in [1, encoded.len() / 2, encoded.len() - 1] {
            let err = Envelope::decode(&encoded[..cut], &Limits::default()).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidFrame, "cut at {cut}");
        }
    }

    #[test]
    fn payload_at_limit_accepted_and_over_limit_rejected() {
        let limits = Limits {
            max_payload_bytes: 16,
            ..Limits::default()
        };

        let mut env = sample();
        env.payload = vec![0xaa; 16];
        let decoded = Envelope::decode(&env.encode(), &limits).unwrap();
        assert_eq!(decoded.payload.len(), 16);

        env.payload = vec![0xaa; 17];
        let err = Envelope::decode(&env.encode(), &limits).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidEnvelope);
    }

    #[test]
    fn oversized_extensions_rejected() {
        let limits = Limits {
            max_ext_bytes: 8,
            ..Limits::default()
        };
        let mut env = sample();
        env.extensions = vec![Extension {
            ext_type: 1,
            value: vec![0u8; 32],
        }];
        let err = Envelope::decode(&env.encode(), &limits).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidEnvelope);
    }

    #[test]
    fn malformed_extension_tlv_rejected() {
        let mut env = sample();
        env.extensions.clear();
        let mut encoded = Vec::new();
        put_uvarint(&mut encoded, env.version);
        put_uvarint(&mut encoded, env.profile_id);
        put_uvarint(&mut encoded, env.msg_type);
        put_uvarint(&mut encoded, env.flags);
        put_uvarint(&mut encoded, env.ts_unix_ms);
        put_len_prefixed(&mut encoded, &env.msg_id);
        // Extensions blob declaring a value longer than the blob itself.
        let mut ext_blob = Vec::new();
        put_uvarint(&mut ext_blob, 1);
        put_uvarint(&mut ext_blob, 100);
        ext_blob.extend_from_slice(b"short");
        put_len_prefixed(&mut encoded, &ext_blob);
        put_len_prefixed(&mut encoded, &env.payload);

        let err = Envelope::decode(&encoded, &Limits::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFrame);
    }

    #[test]
    fn empty_payload_and_extensions_roundtrip() {
        let env = Envelope {
            version: PROTOCOL_VERSION,
            profile_id: 1,
            msg_type: 3,
            flags: 0,
            ts_unix_ms: 0,
            msg_id: b"abcdefgh".to_vec(),
            extensions: vec![],
            payload: vec![],
        };
        let decoded = Envelope::decode(&env.encode(), &Limits::default()).unwrap();
        assert_eq!(decoded, env);
    }
}
