//! Protobuf-compatible wire subset used by profile payloads.
//!
//! A payload is a stream of `(key, value)` pairs where
//! `key = (field_number << 3) | wire_type`. Recognized wire types are
//! varint (0) and length-delimited (2); 64-bit (1) and 32-bit (5) values can
//! be skipped while scanning but a known field carrying the wrong wire type
//! is a decode error. Unknown fields are skipped.
//!
//! Each profile payload is a single-variant wrapper: the outer message holds
//! exactly one length-delimited field whose field number selects the variant
//! (and equals the envelope's msg_type for that profile).

use crate::error::{ProtocolError, ProtocolResult};
use crate::varint::{put_uvarint, read_len_prefixed, read_uvarint};

/// Varint wire type (0).
pub const WT_VARINT: u64 = 0;
/// 64-bit wire type (1); skippable only.
pub const WT_64BIT: u64 = 1;
/// Length-delimited wire type (2).
pub const WT_BYTES: u64 = 2;
/// 32-bit wire type (5); skippable only.
pub const WT_32BIT: u64 = 5;

/// One decoded field: number, wire type, and raw value bytes.
///
/// For `WT_VARINT` the value holds the varint's encoded bytes; use
/// [`Field::as_u64`] / [`Field::as_bool`] to interpret them.
#[derive(Debug, Clone, Copy)]
pub struct Field<'a> {
    pub number: u64,
    pub wire_type: u64,
    pub value: &'a [u8],
}

impl<'a> Field<'a> {
    /// Requires this field to be length-delimited and returns its bytes.
    ///
    /// # Errors
    ///
    /// `INVALID_ENVELOPE` when the wire type differs.
    pub fn bytes(&self, what: &str) -> ProtocolResult<&'a [u8]> {
        if self.wire_type != WT_BYTES {
            return Err(ProtocolError::invalid_envelope(format!(
                "{what} wrong wire type {}",
                self.wire_type
            )));
        }
        Ok(self.value)
    }

    /// Requires this field to be length-delimited UTF-8 and returns it.
    ///
    /// # Errors
    ///
    /// `INVALID_ENVELOPE` on a wire-type mismatch or invalid UTF-8.
    pub fn string(&self, what: &str) -> ProtocolResult<String> {
        let bytes = self.bytes(what)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ProtocolError::invalid_envelope(format!("{what} is not valid UTF-8")))
    }

    /// Requires this field to be a varint and returns its value.
    ///
    /// # Errors
    ///
    /// `INVALID_ENVELOPE` on a wire-type mismatch; `INVALID_FRAME` when the
    /// varint bytes themselves are malformed.
    pub fn as_u64(&self, what: &str) -> ProtocolResult<u64> {
        if self.wire_type != WT_VARINT {
            return Err(ProtocolError::invalid_envelope(format!(
                "{what} wrong wire type {}",
                self.wire_type
            )));
        }
        let (value, _) = read_uvarint(self.value)?;
        Ok(value)
    }

    /// Varint interpreted as a protobuf bool.
    ///
    /// # Errors
    ///
    /// Same as [`Field::as_u64`].
    pub fn as_bool(&self, what: &str) -> ProtocolResult<bool> {
        Ok(self.as_u64(what)? != 0)
    }
}

/// Consumes one field from the front of `input`.
///
/// # Errors
///
/// `INVALID_ENVELOPE` on a malformed key, a truncated value, or an
/// unsupported wire type.
pub fn consume_field(input: &[u8]) -> ProtocolResult<(Field<'_>, &[u8])> {
    let (key, rest) = read_uvarint(input)
        .map_err(|_| ProtocolError::invalid_envelope("invalid field key"))?;
    let number = key >> 3;
    let wire_type = key & 0x7;

    match wire_type {
        WT_VARINT => {
            // Decode to validate bounds/overflow even for unknown fields.
            let (_, after) = read_uvarint(rest).map_err(|_| {
                ProtocolError::invalid_envelope(format!("invalid varint field {number}"))
            })?;
            let (value, rest) = rest.split_at(rest.len() - after.len());
            Ok((
                Field {
                    number,
                    wire_type,
                    value,
                },
                rest,
            ))
        }
        WT_BYTES => {
            let (value, rest) = read_len_prefixed(rest).map_err(|_| {
                ProtocolError::invalid_envelope(format!("truncated bytes field {number}"))
            })?;
            Ok((
                Field {
                    number,
                    wire_type,
                    value,
                },
                rest,
            ))
        }
        WT_64BIT => {
            if rest.len() < 8 {
                return Err(ProtocolError::invalid_envelope(format!(
                    "truncated 64-bit field {number}"
                )));
            }
            let (value, rest) = rest.split_at(8);
            Ok((
                Field {
                    number,
                    wire_type,
                    value,
                },
                rest,
            ))
        }
        WT_32BIT => {
            if rest.len() < 4 {
                return Err(ProtocolError::invalid_envelope(format!(
                    "truncated 32-bit field {number}"
                )));
            }
            let (value, rest) = rest.split_at(4);
            Ok((
                Field {
                    number,
                    wire_type,
                    value,
                },
                rest,
            ))
        }
        _ => Err(ProtocolError::invalid_envelope(format!(
            "unsupported wire type {wire_type}"
        ))),
    }
}

/// Iterates the fields of a message body.
pub fn fields(input: &[u8]) -> FieldIter<'_> {
    FieldIter { rest: input }
}

/// Iterator over `(key, value)` pairs; yields a decode error once and stops.
pub struct FieldIter<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for FieldIter<'a> {
    type Item = ProtocolResult<Field<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        match consume_field(self.rest) {
            Ok((field, rest)) => {
                self.rest = rest;
                Some(Ok(field))
            }
            Err(err) => {
                self.rest = &[];
                Some(Err(err))
            }
        }
    }
}

/// Appends a field key.
pub fn put_key(out: &mut Vec<u8>, number: u64, wire_type: u64) {
    put_uvarint(out, (number << 3) | wire_type);
}

/// Appends a length-delimited field.
pub fn put_bytes_field(out: &mut Vec<u8>, number: u64, value: &[u8]) {
    put_key(out, number, WT_BYTES);
    put_uvarint(out, value.len() as u64);
    out.extend_from_slice(value);
}

/// Appends a string field.
pub fn put_string_field(out: &mut Vec<u8>, number: u64, value: &str) {
    put_bytes_field(out, number, value.as_bytes());
}

/// Appends a varint field.
pub fn put_varint_field(out: &mut Vec<u8>, number: u64, value: u64) {
    put_key(out, number, WT_VARINT);
    put_uvarint(out, value);
}

/// Appends a bool field (encoded as varint 0/1).
pub fn put_bool_field(out: &mut Vec<u8>, number: u64, value: bool) {
    put_varint_field(out, number, u64::from(value));
}

/// Wraps an encoded variant message in the profile's one-of wrapper.
#[must_use]
pub fn encode_wrapper(variant_field: u64, inner: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(inner.len() + 4);
    put_bytes_field(&mut out, variant_field, inner);
    out
}

/// Extracts the named variant from a one-of wrapper payload.
///
/// Unknown outer fields are skipped regardless of wire type.
///
/// # Errors
///
/// `INVALID_ENVELOPE` when the payload is malformed or the expected variant
/// field is absent.
pub fn decode_wrapper(payload: &[u8], variant_field: u64) -> ProtocolResult<&[u8]> {
    for field in fields(payload) {
        let field = field?;
        if field.number == variant_field && field.wire_type == WT_BYTES {
            return Ok(field.value);
        }
    }
    Err(ProtocolError::invalid_envelope(format!(
        "missing wrapper field {variant_field}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn field_stream_roundtrip() {
        let mut buf = Vec::new();
        put_bytes_field(&mut buf, 1, b"id-bytes");
        put_varint_field(&mut buf, 2, 300);
        put_bool_field(&mut buf, 3, true);
        put_string_field(&mut buf, 4, "name");

        let mut iter = fields(&buf);
        let f = iter.next().unwrap().unwrap();
        assert_eq!((f.number, f.bytes("f1").unwrap()), (1, &b"id-bytes"[..]));
        let f = iter.next().unwrap().unwrap();
        assert_eq!(f.as_u64("f2").unwrap(), 300);
        let f = iter.next().unwrap().unwrap();
        assert!(f.as_bool("f3").unwrap());
        let f = iter.next().unwrap().unwrap();
        assert_eq!(f.string("f4").unwrap(), "name");
        assert!(iter.next().is_none());
    }

    #[test]
    fn wrong_wire_type_is_an_error() {
        let mut buf = Vec::new();
        put_varint_field(&mut buf, 1, 5);
        let field = consume_field(&buf).unwrap().0;
        let err = field.bytes("field").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidEnvelope);

        let mut buf = Vec::new();
        put_bytes_field(&mut buf, 1, b"x");
        let field = consume_field(&buf).unwrap().0;
        assert!(field.as_u64("field").is_err());
    }

    #[test]
    fn fixed_width_fields_are_skippable() {
        let mut buf = Vec::new();
        put_key(&mut buf, 9, WT_64BIT);
        buf.extend_from_slice(&[0u8; 8]);
        put_key(&mut buf, 10, WT_32BIT);
        buf.extend_from_slice(&[0u8; 4]);
        put_bytes_field(&mut buf, 1, b"after");

        let value = decode_wrapper(&buf, 1).unwrap();
        assert_eq!(value, b"after");
    }

    #[test]
    fn truncated_values_rejected() {
        // Bytes field declaring more than remains.
        let mut buf = Vec::new();
        put_key(&mut buf, 1, WT_BYTES);
        buf.push(10);
        buf.extend_from_slice(b"short");
        assert!(consume_field(&buf).is_err());

        // 64-bit field with 3 bytes left.
        let mut buf = Vec::new();
        put_key(&mut buf, 1, WT_64BIT);
        buf.extend_from_slice(&[0u8; 3]);
        assert!(consume_field(&buf).is_err());

        // Unterminated varint value.
        let mut buf = Vec::new();
        put_key(&mut buf, 1, WT_VARINT);
        buf.push(0x80);
        assert!(consume_field(&buf).is_err());
    }

    #[test]
    fn unsupported_wire_type_rejected() {
        let mut buf = Vec::new();
        put_key(&mut buf, 1, 3); // group start, unsupported
        let err = consume_field(&buf).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidEnvelope);
    }

    #[test]
    fn wrapper_selects_variant_and_skips_unknown() {
        let inner = b"variant-body";
        let mut payload = Vec::new();
        put_varint_field(&mut payload, 9, 1); // unknown outer field
        payload.extend_from_slice(&encode_wrapper(4, inner));

        assert_eq!(decode_wrapper(&payload, 4).unwrap(), inner);
        let err = decode_wrapper(&payload, 2).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidEnvelope);
    }
}
