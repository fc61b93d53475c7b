// crates/rce-sharding/src/codec.rs
// ============================================================================
// Module: Shard Binary Codec
// Description: Little-endian framing for ShardParts and whole-shard gzip.
// Purpose: Implement the binary shard format of spec.md §4.2.
// Dependencies: rce-core, flate2, serde_json
// ============================================================================

//! ## Overview
//! A shard is an unbounded sequence of parts; end-of-buffer is end-of-shard.
//! Each part is framed as `u32 policy_len, policy_name, u32 location_len,
//! location, f64 unix_ts, u32 payload_len, payload` with every multi-byte
//! field little-endian. The whole shard is gzipped at rest; this module's
//! `encode`/`decode` operate on the *uncompressed* part stream, and
//! `compress`/`decompress` wrap that stream for the object store.

use std::io::Read;
use std::io::Write;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use rce_core::model::ShardPart;
use thiserror::Error;

/// Shard codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("truncated shard: expected {expected} more bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("shard payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("shard resource payload is not a JSON array: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("gzip error: {0}")]
    Gzip(String),
}

/// Encodes one part into the binary frame described in spec.md §4.2.
#[must_use]
pub fn encode_part(part: &ShardPart) -> Vec<u8> {
    let policy_bytes = part.policy_name.as_bytes();
    let location_bytes = part.location.as_bytes();
    let payload_bytes =
        serde_json::to_vec(&part.resources).expect("resource list is already valid JSON values");

    let mut out = Vec::with_capacity(
        4 + policy_bytes.len() + 4 + location_bytes.len() + 8 + 4 + payload_bytes.len(),
    );
    out.extend_from_slice(&(policy_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(policy_bytes);
    out.extend_from_slice(&(location_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(location_bytes);
    out.extend_from_slice(&part.timestamp.to_le_bytes());
    out.extend_from_slice(&(payload_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&payload_bytes);
    out
}

/// Encodes an ordered sequence of parts into one uncompressed shard buffer.
#[must_use]
pub fn encode_shard<'a>(parts: impl IntoIterator<Item = &'a ShardPart>) -> Vec<u8> {
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(&encode_part(part));
    }
    out
}

/// Decodes an uncompressed shard buffer into its ordered parts.
///
/// # Errors
/// Returns [`CodecError::Truncated`] when the buffer ends mid-frame,
/// [`CodecError::InvalidUtf8`] when a policy/location field is not UTF-8,
/// or [`CodecError::InvalidJson`] when a payload does not parse as a JSON
/// array of objects.
pub fn decode_shard(bytes: &[u8]) -> Result<Vec<ShardPart>, CodecError> {
    let mut cursor = 0usize;
    let mut parts = Vec::new();

    while cursor < bytes.len() {
        let policy_name = read_length_prefixed_string(bytes, &mut cursor)?;
        let location = read_length_prefixed_string(bytes, &mut cursor)?;
        let timestamp = read_f64(bytes, &mut cursor)?;
        let payload = read_length_prefixed_bytes(bytes, &mut cursor)?;
        let resources = serde_json::from_slice(&payload)?;

        parts.push(ShardPart::new(policy_name, location, timestamp, resources));
    }

    Ok(parts)
}

fn read_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32, CodecError> {
    let slice = take(bytes, cursor, 4)?;
    Ok(u32::from_le_bytes(slice.try_into().expect("length checked above")))
}

fn read_f64(bytes: &[u8], cursor: &mut usize) -> Result<f64, CodecError> {
    let slice = take(bytes, cursor, 8)?;
    Ok(f64::from_le_bytes(slice.try_into().expect("length checked above")))
}

fn read_length_prefixed_bytes(bytes: &[u8], cursor: &mut usize) -> Result<Vec<u8>, CodecError> {
    let len = read_u32(bytes, cursor)? as usize;
    Ok(take(bytes, cursor, len)?.to_vec())
}

fn read_length_prefixed_string(bytes: &[u8], cursor: &mut usize) -> Result<String, CodecError> {
    let raw = read_length_prefixed_bytes(bytes, cursor)?;
    Ok(String::from_utf8(raw)?)
}

fn take<'a>(bytes: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a [u8], CodecError> {
    let end = *cursor + len;
    if end > bytes.len() {
        return Err(CodecError::Truncated {
            expected: len,
            found: bytes.len() - *cursor,
        });
    }
    let slice = &bytes[*cursor..end];
    *cursor = end;
    Ok(slice)
}

/// Gzips a shard buffer for storage at rest.
///
/// # Errors
/// Returns [`CodecError::Gzip`] on an underlying I/O failure from the
/// in-memory encoder, which should not occur in practice.
pub fn compress(shard_bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(shard_bytes)
        .map_err(|e| CodecError::Gzip(e.to_string()))?;
    encoder.finish().map_err(|e| CodecError::Gzip(e.to_string()))
}

/// Decompresses a gzipped shard buffer.
///
/// # Errors
/// Returns [`CodecError::Gzip`] when the buffer is not valid gzip.
pub fn decompress(gzipped: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut decoder = GzDecoder::new(gzipped);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CodecError::Gzip(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_part() -> ShardPart {
        ShardPart::new(
            "ec2-public",
            "us-east-1",
            1_700_000_000.5,
            vec![serde_json::json!({"InstanceId": "i-1"})],
        )
    }

    #[test]
    fn round_trips_single_part() {
        let part = sample_part();
        let encoded = encode_part(&part);
        let decoded = decode_shard(&encoded).expect("decode");
        assert_eq!(decoded, vec![part]);
    }

    #[test]
    fn round_trips_multiple_parts_in_order() {
        let a = sample_part();
        let mut b = sample_part();
        b.location = "eu-west-1".to_string();
        let encoded = encode_shard([&a, &b]);
        let decoded = decode_shard(&encoded).expect("decode");
        assert_eq!(decoded, vec![a, b]);
    }

    #[test]
    fn truncated_buffer_errors() {
        let part = sample_part();
        let mut encoded = encode_part(&part);
        encoded.truncate(encoded.len() - 2);
        assert!(decode_shard(&encoded).is_err());
    }

    #[test]
    fn gzip_round_trips() {
        let part = sample_part();
        let raw = encode_part(&part);
        let gz = compress(&raw).expect("compress");
        let back = decompress(&gz).expect("decompress");
        assert_eq!(back, raw);
    }

    proptest::proptest! {
        #[test]
        fn part_round_trips_for_arbitrary_fields(
            policy in "[a-z][a-z0-9_-]{0,32}",
            location in "[a-z][a-z0-9-]{0,32}",
            timestamp in proptest::num::f64::NORMAL,
            resource_id in "[a-zA-Z0-9]{1,16}",
        ) {
            let part = ShardPart::new(
                policy,
                location,
                timestamp,
                vec![serde_json::json!({"id": resource_id})],
            );
            let encoded = encode_part(&part);
            let decoded = decode_shard(&encoded).expect("decode");
            proptest::prop_assert_eq!(decoded, vec![part]);
        }
    }
}
