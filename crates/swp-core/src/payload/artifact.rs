//! Artifact transfer payloads (profile 14).
//!
//! Variants: 1 = offer, 2 = get, 3 = chunk, 4 = ack, 5 = err. Upload chunks
//! must arrive with strictly consecutive indices; the terminal chunk
//! triggers size and hash verification against the recorded offer.

use crate::error::ProtocolResult;
use crate::wire::{
    decode_wrapper, encode_wrapper, fields, put_bool_field, put_bytes_field, put_string_field,
    put_varint_field,
};

pub const MSG_OFFER: u64 = 1;
pub const MSG_GET: u64 = 2;
pub const MSG_CHUNK: u64 = 3;
pub const MSG_ACK: u64 = 4;
pub const MSG_ERR: u64 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtOffer {
    pub artifact_id: String,
    pub total_size: u64,
    pub hash_alg: String,
    pub hash: Vec<u8>,
    pub metadata: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtGet {
    pub artifact_id: String,
    pub start: u64,
    pub end: u64,
    pub resume_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtChunk {
    pub artifact_id: String,
    pub chunk_index: u64,
    pub offset: u64,
    pub data: Vec<u8>,
    pub is_terminal: bool,
    pub resume_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtAck {
    pub artifact_id: String,
    pub chunk_index: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtErr {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

pub fn encode_offer(v: &ArtOffer) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.artifact_id.is_empty() {
        put_string_field(&mut inner, 1, &v.artifact_id);
    }
    if v.total_size != 0 {
        put_varint_field(&mut inner, 2, v.total_size);
    }
    if !v.hash_alg.is_empty() {
        put_string_field(&mut inner, 3, &v.hash_alg);
    }
    if !v.hash.is_empty() {
        put_bytes_field(&mut inner, 4, &v.hash);
    }
    if !v.metadata.is_empty() {
        put_bytes_field(&mut inner, 5, &v.metadata);
    }
    encode_wrapper(MSG_OFFER, &inner)
}

pub fn decode_offer(payload: &[u8]) -> ProtocolResult<ArtOffer> {
    let inner = decode_wrapper(payload, MSG_OFFER)?;
    let mut out = ArtOffer::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.artifact_id = field.string("art_offer.artifact_id")?,
            2 => out.total_size = field.as_u64("art_offer.total_size")?,
            3 => out.hash_alg = field.string("art_offer.hash_alg")?,
            4 => out.hash = field.bytes("art_offer.hash")?.to_vec(),
            5 => out.metadata = field.bytes("art_offer.metadata")?.to_vec(),
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_get(v: &ArtGet) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.artifact_id.is_empty() {
        put_string_field(&mut inner, 1, &v.artifact_id);
    }
    if v.start != 0 {
        put_varint_field(&mut inner, 2, v.start);
    }
    if v.end != 0 {
        put_varint_field(&mut inner, 3, v.end);
    }
    if !v.resume_token.is_empty() {
        put_string_field(&mut inner, 4, &v.resume_token);
    }
    encode_wrapper(MSG_GET, &inner)
}

pub fn decode_get(payload: &[u8]) -> ProtocolResult<ArtGet> {
    let inner = decode_wrapper(payload, MSG_GET)?;
    let mut out = ArtGet::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.artifact_id = field.string("art_get.artifact_id")?,
            2 => out.start = field.as_u64("art_get.start")?,
            3 => out.end = field.as_u64("art_get.end")?,
            4 => out.resume_token = field.string("art_get.resume_token")?,
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_chunk(v: &ArtChunk) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.artifact_id.is_empty() {
        put_string_field(&mut inner, 1, &v.artifact_id);
    }
    put_varint_field(&mut inner, 2, v.chunk_index);
    put_varint_field(&mut inner, 3, v.offset);
    put_bytes_field(&mut inner, 4, &v.data);
    put_bool_field(&mut inner, 5, v.is_terminal);
    if !v.resume_token.is_empty() {
        put_string_field(&mut inner, 6, &v.resume_token);
    }
    encode_wrapper(MSG_CHUNK, &inner)
}

pub fn decode_chunk(payload: &[u8]) -> ProtocolResult<ArtChunk> {
    let inner = decode_wrapper(payload, MSG_CHUNK)?;
    let mut out = ArtChunk::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.artifact_id = field.string("art_chunk.artifact_id")?,
            2 => out.chunk_index = field.as_u64("art_chunk.chunk_index")?,
            3 => out.offset = field.as_u64("art_chunk.offset")?,
            4 => out.data = field.bytes("art_chunk.data")?.to_vec(),
            5 => out.is_terminal = field.as_bool("art_chunk.is_terminal")?,
            6 => out.resume_token = field.string("art_chunk.resume_token")?,
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_ack(v: &ArtAck) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.artifact_id.is_empty() {
        put_string_field(&mut inner, 1, &v.artifact_id);
    }
    put_varint_field(&mut inner, 2, v.chunk_index);
    encode_wrapper(MSG_ACK, &inner)
}

pub fn decode_ack(payload: &[u8]) -> ProtocolResult<ArtAck> {
    let inner = decode_wrapper(payload, MSG_ACK)?;
    let mut out = ArtAck::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.artifact_id = field.string("art_ack.artifact_id")?,
            2 => out.chunk_index = field.as_u64("art_ack.chunk_index")?,
            _ => {}
        }
    }
    Ok(out)
}

pub fn encode_err(v: &ArtErr) -> Vec<u8> {
    let mut inner = Vec::new();
    if !v.code.is_empty() {
        put_string_field(&mut inner, 1, &v.code);
    }
    if !v.message.is_empty() {
        put_string_field(&mut inner, 2, &v.message);
    }
    put_bool_field(&mut inner, 3, v.retryable);
    encode_wrapper(MSG_ERR, &inner)
}

pub fn decode_err(payload: &[u8]) -> ProtocolResult<ArtErr> {
    let inner = decode_wrapper(payload, MSG_ERR)?;
    let mut out = ArtErr::default();
    for field in fields(inner) {
        let field = field?;
        match field.number {
            1 => out.code = field.string("art_err.code")?,
            2 => out.message = field.string("art_err.message")?,
            3 => out.retryable = field.as_bool("art_err.retryable")?,
            _ => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_roundtrip_including_zero_index() {
        let chunk = ArtChunk {
            artifact_id: "artifact-a".to_string(),
            chunk_index: 0,
            offset: 0,
            data: b"hello".to_vec(),
            is_terminal: true,
            resume_token: String::new(),
        };
        let decoded = decode_chunk(&encode_chunk(&chunk)).unwrap();
        assert_eq!(decoded, chunk);
    }

    #[test]
    fn offer_roundtrip_with_hash() {
        let offer = ArtOffer {
            artifact_id: "artifact-a".to_string(),
            total_size: 5,
            hash_alg: "sha256".to_string(),
            hash: vec![0xab; 32],
            metadata: vec![],
        };
        assert_eq!(decode_offer(&encode_offer(&offer)).unwrap(), offer);
    }
}
