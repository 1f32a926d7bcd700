//! Cursor-based decoding of contract storage values.
//!
//! Values are laid out back to back with no schema beyond their sizes:
//! fixed-width integers are big-endian, strings and big integers carry a
//! 4-byte big-endian length prefix, byte arrays a 1-byte prefix. Every
//! decoder takes the buffer and a cursor and returns the value together with
//! the advanced cursor. A short buffer yields `DecodeError::Underflow`, never
//! a panic.

pub mod records;

use alloy::primitives::U256;
use thiserror::Error;

use crate::model::Pubkey;

const STRING_LEN_CAP: usize = 4;
const BIG_UINT_LEN_CAP: usize = 4;
const BYTES_LEN_CAP: usize = 1;
const PUBKEY_LEN: usize = 32;

/// Decoded value plus the cursor just past it.
pub type Decoded<T> = Result<(T, usize), DecodeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{field} at offset {offset}: need {need} bytes, buffer has {len}")]
    Underflow {
        field: &'static str,
        offset: usize,
        need: usize,
        len: usize,
    },

    #[error("{field} at offset {offset}: invalid UTF-8")]
    InvalidUtf8 { field: &'static str, offset: usize },

    #[error("{field}: {bytes} bytes do not fit in {bits} bits")]
    Overflow {
        field: &'static str,
        bytes: usize,
        bits: usize,
    },
}

fn underflow(field: &'static str, offset: usize, need: usize, len: usize) -> DecodeError {
    DecodeError::Underflow {
        field,
        offset,
        need,
        len,
    }
}

/// Fixed-size slice at `index`, or an underflow error.
fn take<'a>(
    bytes: &'a [u8],
    index: usize,
    size: usize,
    field: &'static str,
) -> Decoded<&'a [u8]> {
    let end = index
        .checked_add(size)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| underflow(field, index, size, bytes.len()))?;
    Ok((&bytes[index..end], end))
}

/// Length-prefixed slice at `index`.
///
/// The prefix itself must leave at least one byte after it
/// (`index + cap < len`), so an empty payload in the very last position of a
/// buffer does not decode.
fn take_prefixed<'a>(
    bytes: &'a [u8],
    index: usize,
    cap: usize,
    field: &'static str,
) -> Decoded<&'a [u8]> {
    let data_len = bytes.len();
    if index.saturating_add(cap) >= data_len {
        return Err(underflow(field, index, cap + 1, data_len));
    }

    let len = bytes[index..index + cap]
        .iter()
        .fold(0usize, |acc, b| (acc << 8) | *b as usize);

    let start = index + cap;
    take(bytes, start, len, field).map_err(|_| underflow(field, index, cap + len, data_len))
}

// ── Primitive decoders ──────────────────────────────────────────────

pub fn decode_string(bytes: &[u8], index: usize) -> Decoded<String> {
    let (raw, next) = take_prefixed(bytes, index, STRING_LEN_CAP, "string")?;
    let s = std::str::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8 {
        field: "string",
        offset: index,
    })?;
    Ok((s.to_string(), next))
}

pub fn decode_byte_array(bytes: &[u8], index: usize) -> Decoded<Vec<u8>> {
    let (raw, next) = take_prefixed(bytes, index, BYTES_LEN_CAP, "byte array")?;
    Ok((raw.to_vec(), next))
}

/// Length-prefixed unsigned big-endian magnitude. A zero length is zero.
pub fn decode_big_uint(bytes: &[u8], index: usize) -> Decoded<U256> {
    let (raw, next) = take_prefixed(bytes, index, BIG_UINT_LEN_CAP, "big uint")?;
    Ok((big_uint_from_be(raw, "big uint")?, next))
}

pub fn decode_u64(bytes: &[u8], index: usize) -> Decoded<u64> {
    let (raw, next) = take(bytes, index, 8, "u64")?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(raw);
    Ok((u64::from_be_bytes(buf), next))
}

pub fn decode_u32(bytes: &[u8], index: usize) -> Decoded<u32> {
    let (raw, next) = take(bytes, index, 4, "u32")?;
    let mut buf = [0u8; 4];
    buf.copy_from_slice(raw);
    Ok((u32::from_be_bytes(buf), next))
}

pub fn decode_u16(bytes: &[u8], index: usize) -> Decoded<u16> {
    let (raw, next) = take(bytes, index, 2, "u16")?;
    Ok((u16::from_be_bytes([raw[0], raw[1]]), next))
}

pub fn decode_byte(bytes: &[u8], index: usize) -> Decoded<u8> {
    let (raw, next) = take(bytes, index, 1, "byte")?;
    Ok((raw[0], next))
}

pub fn decode_pubkey(bytes: &[u8], index: usize) -> Decoded<Pubkey> {
    let (raw, next) = take(bytes, index, PUBKEY_LEN, "pubkey")?;
    let mut key = [0u8; PUBKEY_LEN];
    key.copy_from_slice(raw);
    Ok((Pubkey(key), next))
}

// ── Top-level values ────────────────────────────────────────────────
//
// A single-value storage slot or view result holds the value alone, with
// no length prefix and leading zeros stripped. Empty means zero.

pub fn top_big_uint(bytes: &[u8]) -> Result<U256, DecodeError> {
    big_uint_from_be(bytes, "top-level big uint")
}

pub fn top_u64(bytes: &[u8]) -> Result<u64, DecodeError> {
    let trimmed = strip_leading_zeros(bytes);
    if trimmed.len() > 8 {
        return Err(DecodeError::Overflow {
            field: "top-level u64",
            bytes: trimmed.len(),
            bits: 64,
        });
    }
    Ok(trimmed.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
}

pub fn top_u32(bytes: &[u8]) -> Result<u32, DecodeError> {
    let value = top_u64(bytes)?;
    u32::try_from(value).map_err(|_| DecodeError::Overflow {
        field: "top-level u32",
        bytes: strip_leading_zeros(bytes).len(),
        bits: 32,
    })
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}

fn big_uint_from_be(raw: &[u8], field: &'static str) -> Result<U256, DecodeError> {
    let trimmed = strip_leading_zeros(raw);
    U256::try_from_be_slice(trimmed).ok_or(DecodeError::Overflow {
        field,
        bytes: trimmed.len(),
        bits: 256,
    })
}

// ── Encoding (test fixtures and snapshot tooling) ───────────────────

/// Minimal big-endian magnitude, empty for zero.
pub fn big_uint_to_be(value: U256) -> Vec<u8> {
    let full = value.to_be_bytes::<32>();
    strip_leading_zeros(&full).to_vec()
}

pub fn encode_big_uint(value: U256) -> Vec<u8> {
    let magnitude = big_uint_to_be(value);
    let mut out = (magnitude.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(&magnitude);
    out
}

pub fn encode_string(value: &str) -> Vec<u8> {
    let mut out = (value.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(value.as_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_field_needs_room_past_prefix() {
        // Empty string as the last field: prefix fills the buffer exactly.
        assert!(decode_string(&[0, 0, 0, 0], 0).is_err());
        // Same prefix followed by more data decodes as empty.
        let (s, next) = decode_string(&[0, 0, 0, 0, 7], 0).unwrap();
        assert_eq!(s, "");
        assert_eq!(next, 4);
    }

    #[test]
    fn big_uint_reads_unsigned_magnitude() {
        let (v, next) = decode_big_uint(&[0, 0, 0, 2, 0xff, 0xff], 0).unwrap();
        assert_eq!(v, U256::from(0xffffu64));
        assert_eq!(next, 6);
    }

    #[test]
    fn big_uint_wider_than_256_bits_is_rejected() {
        let mut buf = 33u32.to_be_bytes().to_vec();
        buf.extend_from_slice(&[1u8; 33]);
        assert!(matches!(
            decode_big_uint(&buf, 0),
            Err(DecodeError::Overflow { .. })
        ));
    }

    #[test]
    fn cursor_far_past_end_does_not_panic() {
        assert!(decode_u64(&[1, 2, 3], usize::MAX - 2).is_err());
        assert!(decode_big_uint(&[1, 2, 3], usize::MAX).is_err());
        assert!(decode_pubkey(&[], 5).is_err());
    }

    #[test]
    fn top_level_values_strip_leading_zeros() {
        assert_eq!(top_u64(&[]).unwrap(), 0);
        assert_eq!(top_u64(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 3]).unwrap(), 3);
        assert!(top_u64(&[1, 0, 0, 0, 0, 0, 0, 0, 0]).is_err());
        assert!(top_u32(&[1, 0, 0, 0, 0]).is_err());
    }
}
