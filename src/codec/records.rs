//! One decoder per stored record shape.

use alloy::primitives::U256;

use super::{
    Decoded, DecodeError, decode_big_uint, decode_byte, decode_pubkey, decode_string, decode_u32,
    decode_u64,
};
use crate::model::{Pubkey, Undelegation};

/// `(big_uint amount, u64 unbond_epoch)`.
pub fn decode_undelegation(bytes: &[u8], index: usize) -> Decoded<Undelegation> {
    let (amount, index) = decode_big_uint(bytes, index)?;
    let (unbond_epoch, index) = decode_u64(bytes, index)?;
    Ok((
        Undelegation {
            amount,
            unbond_epoch,
        },
        index,
    ))
}

/// `(pubkey, big_uint amount)` entry of a packed reserve blob.
pub fn decode_reserve_entry(bytes: &[u8], index: usize) -> Decoded<(Pubkey, U256)> {
    let (owner, index) = decode_pubkey(bytes, index)?;
    let (amount, index) = decode_big_uint(bytes, index)?;
    Ok(((owner, amount), index))
}

/// A record that failed partway through a repeated sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    /// Cursor where the failing record started.
    pub offset: usize,
    /// Records decoded before the failure.
    pub decoded: usize,
    pub source: DecodeError,
}

/// Decode `decode` back to back from cursor 0 until the buffer is consumed.
///
/// An empty buffer holds no records. Any failure, including a trailing
/// partial record, rejects the whole buffer.
pub fn decode_repeated<T>(
    bytes: &[u8],
    decode: impl Fn(&[u8], usize) -> Decoded<T>,
) -> Result<Vec<T>, RecordFailure> {
    let mut out = Vec::new();
    let mut index = 0;
    while index < bytes.len() {
        match decode(bytes, index) {
            Ok((record, next)) => {
                out.push(record);
                index = next;
            }
            Err(source) => {
                return Err(RecordFailure {
                    offset: index,
                    decoded: out.len(),
                    source,
                });
            }
        }
    }
    Ok(out)
}

// ── DEX pair views ──────────────────────────────────────────────────

/// OneDex `viewPair` result.
#[derive(Debug, Clone, PartialEq)]
pub struct OneDexPair {
    pub pair_id: u32,
    pub state: u8,
    pub enabled: bool,
    pub owner: Pubkey,
    pub first_token_id: String,
    pub second_token_id: String,
    pub lp_token_id: String,
    pub lp_token_decimal: u32,
    pub first_token_reserve: U256,
    pub second_token_reserve: U256,
    pub lp_token_supply: U256,
    pub lp_token_roles_are_set: bool,
}

pub fn decode_onedex_pair(bytes: &[u8], index: usize) -> Decoded<OneDexPair> {
    let (pair_id, index) = decode_u32(bytes, index)?;
    let (state, index) = decode_byte(bytes, index)?;
    let (enabled, index) = decode_byte(bytes, index)?;
    let (owner, index) = decode_pubkey(bytes, index)?;
    let (first_token_id, index) = decode_string(bytes, index)?;
    let (second_token_id, index) = decode_string(bytes, index)?;
    let (lp_token_id, index) = decode_string(bytes, index)?;
    let (lp_token_decimal, index) = decode_u32(bytes, index)?;
    let (first_token_reserve, index) = decode_big_uint(bytes, index)?;
    let (second_token_reserve, index) = decode_big_uint(bytes, index)?;
    let (lp_token_supply, index) = decode_big_uint(bytes, index)?;
    let (roles, index) = decode_byte(bytes, index)?;

    Ok((
        OneDexPair {
            pair_id,
            state,
            enabled: enabled != 0,
            owner,
            first_token_id,
            second_token_id,
            lp_token_id,
            lp_token_decimal,
            first_token_reserve,
            second_token_reserve,
            lp_token_supply,
            lp_token_roles_are_set: roles != 0,
        },
        index,
    ))
}
