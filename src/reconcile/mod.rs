//! Rebuild the protocol's accounting view from one immutable fetch.
//!
//! Every pass starts from a [`RawState`] and builds fresh maps. Any decode
//! failure aborts the pass; a partially built state is never returned.

pub mod reserves;

#[cfg(feature = "full")]
pub mod lookup;

use std::collections::BTreeMap;

use alloy::primitives::U256;
use thiserror::Error;

use crate::codec::records::{RecordFailure, decode_repeated, decode_undelegation};
use crate::codec::{self, DecodeError};
use crate::model::{
    ContractState, GlobalState, Pubkey, ReconciledState, UndelegationQueue,
};
use crate::storage::keys::{self, Classified, RecordKind, StorageKey, classify};
use crate::storage::{FetchError, RawState, StorageSnapshot};

#[derive(Debug, Error)]
pub enum ReconError {
    #[error("decoding {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: DecodeError,
    },

    #[error("malformed record in `{key}` at offset {offset} (after {decoded} good records): {source}")]
    MalformedRecord {
        key: String,
        offset: usize,
        decoded: usize,
        #[source]
        source: DecodeError,
    },

    #[error("key `{key}` under `{prefix}` has a {len}-byte suffix")]
    MalformedKey {
        prefix: &'static str,
        key: String,
        len: usize,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{0} is missing")]
    Missing(String),

    #[error("unknown contract state {0}")]
    UnknownState(u64),

    #[error("arithmetic overflow computing {0}")]
    Overflow(String),

    #[error("total reserve points are zero while {users} users hold points")]
    ZeroReservePoints { users: usize },
}

pub(crate) fn decode_err(what: impl Into<String>) -> impl FnOnce(DecodeError) -> ReconError {
    let what = what.into();
    move |source| ReconError::Decode { what, source }
}

fn malformed(key: &[u8]) -> impl FnOnce(RecordFailure) -> ReconError + '_ {
    move |f| ReconError::MalformedRecord {
        key: display_key(key),
        offset: f.offset,
        decoded: f.decoded,
        source: f.source,
    }
}

/// Printable form of a raw key: the ASCII prefix, then the suffix in hex.
pub fn display_key(key: &[u8]) -> String {
    let split = key
        .iter()
        .position(|b| !(b.is_ascii_alphanumeric() || *b == b'_' || *b == b'.'))
        .unwrap_or(key.len());
    let (text, rest) = key.split_at(split);
    let text = String::from_utf8_lossy(text);
    if rest.is_empty() {
        text.into_owned()
    } else {
        format!("{text}0x{}", hex::encode(rest))
    }
}

// ── Key buckets ─────────────────────────────────────────────────────

/// Storage entries sorted by record kind in one pass over the dump.
#[derive(Default)]
pub(crate) struct Buckets<'a> {
    pub user_undelegations: Vec<(Pubkey, &'a [u8], &'a [u8])>,
    pub reserver_index: Vec<(Pubkey, &'a [u8])>,
    pub reserve_items: BTreeMap<u32, &'a [u8]>,
    pub user_points: Vec<(Pubkey, &'a [u8])>,
    pub packed_reserves: Option<&'a [u8]>,
    pub reserve_undelegations: Option<&'a [u8]>,
}

fn pubkey_suffix(kind: RecordKind, key: &[u8], suffix: &[u8]) -> Result<Pubkey, ReconError> {
    Pubkey::from_slice(suffix).map_err(|_| ReconError::MalformedKey {
        prefix: kind.prefix(),
        key: display_key(key),
        len: suffix.len(),
    })
}

pub(crate) fn bucket(storage: &StorageSnapshot) -> Result<Buckets<'_>, ReconError> {
    let mut b = Buckets::default();
    for (key, value) in storage.iter() {
        match classify(key) {
            Classified::Record(kind, suffix) => match kind {
                RecordKind::UserUndelegations => {
                    let user = pubkey_suffix(kind, key, suffix)?;
                    b.user_undelegations.push((user, key, value));
                }
                RecordKind::ReserverIndex => {
                    b.reserver_index.push((pubkey_suffix(kind, key, suffix)?, value));
                }
                RecordKind::UserReservePoints => {
                    b.user_points.push((pubkey_suffix(kind, key, suffix)?, value));
                }
                RecordKind::ReserveItem => {
                    let index = u32::from_be_bytes([suffix[0], suffix[1], suffix[2], suffix[3]]);
                    b.reserve_items.insert(index, value);
                }
                RecordKind::PackedReserves => b.packed_reserves = Some(value),
                RecordKind::ReserveUndelegations => b.reserve_undelegations = Some(value),
            },
            Classified::OtherSuffix(
                kind @ (RecordKind::UserUndelegations
                | RecordKind::ReserverIndex
                | RecordKind::UserReservePoints),
            ) => {
                return Err(ReconError::MalformedKey {
                    prefix: kind.prefix(),
                    key: display_key(key),
                    len: key.len() - kind.prefix().len(),
                });
            }
            Classified::OtherSuffix(kind) => {
                tracing::debug!(key = %display_key(key), ?kind, "skipping mapper metadata key");
            }
            Classified::Unknown => {}
        }
    }
    Ok(b)
}

// ── Scalars ─────────────────────────────────────────────────────────

fn view_big_uint(raw: &RawState, function: &str) -> Result<U256, ReconError> {
    codec::top_big_uint(raw.view(function)?).map_err(decode_err(function))
}

pub(crate) fn storage_big_uint(storage: &StorageSnapshot, name: &str) -> Result<U256, ReconError> {
    let bytes = storage.get(&StorageKey::named(name)).or_empty()?;
    codec::top_big_uint(&bytes).map_err(decode_err(name))
}

/// Decode the protocol-reported scalars.
pub fn read_global_state(raw: &RawState) -> Result<GlobalState, ReconError> {
    let state_raw = codec::top_u64(raw.view("getState")?).map_err(decode_err("getState"))?;
    let state = ContractState::from_raw(state_raw).ok_or(ReconError::UnknownState(state_raw))?;

    let fee = codec::top_u64(raw.view("getUndelegateNowFee")?)
        .map_err(decode_err("getUndelegateNowFee"))?;

    let (provider_address, _) = codec::decode_pubkey(raw.view("getProviderAddress")?, 0)
        .map_err(decode_err("getProviderAddress"))?;

    let unbond_bytes = raw
        .storage
        .get(&StorageKey::named(keys::UNBOND_PERIOD))
        .or_empty()?;
    let unbond_period = codec::top_u64(&unbond_bytes).map_err(decode_err(keys::UNBOND_PERIOD))?;

    let token_bytes = raw
        .storage
        .get(&StorageKey::named(keys::LIQUID_TOKEN_ID))
        .or_empty()?;
    let liquid_token_id = String::from_utf8(token_bytes).map_err(|_| ReconError::Decode {
        what: keys::LIQUID_TOKEN_ID.into(),
        source: DecodeError::InvalidUtf8 {
            field: "token identifier",
            offset: 0,
        },
    })?;

    Ok(GlobalState {
        state,
        egld_staked: view_big_uint(raw, "getTotalEgldStaked")?,
        egld_reserve: view_big_uint(raw, "getEgldReserve")?,
        available_egld_reserve: view_big_uint(raw, "getAvailableEgldReserve")?,
        liquid_supply: view_big_uint(raw, "getLiquidTokenSupply")?,
        undelegate_now_fee_bps: fee,
        provider_address,
        unbond_period,
        liquid_token_id,
    })
}

// ── Undelegations ───────────────────────────────────────────────────

/// Decode a stored undelegation list, rejecting the whole value on any
/// malformed pair.
pub fn decode_queue(key: &[u8], value: &[u8]) -> Result<UndelegationQueue, ReconError> {
    decode_repeated(value, decode_undelegation).map_err(malformed(key))
}

fn user_undelegations(
    entries: &[(Pubkey, &[u8], &[u8])],
) -> Result<BTreeMap<Pubkey, UndelegationQueue>, ReconError> {
    let mut out: BTreeMap<Pubkey, UndelegationQueue> = BTreeMap::new();
    for (user, key, value) in entries {
        let queue = decode_queue(key, value)?;
        tracing::debug!(user = %user.short(), entries = queue.len(), "user undelegations");
        out.entry(*user).or_default().extend(queue);
    }
    Ok(out)
}

// ── Full pass ───────────────────────────────────────────────────────

/// Run one reconciliation pass over `raw`.
pub fn reconcile(raw: &RawState) -> Result<ReconciledState, ReconError> {
    let global = read_global_state(raw)?;
    let buckets = bucket(&raw.storage)?;

    let user_undelegations = user_undelegations(&buckets.user_undelegations)?;

    let (reserve_shape, reserves) = reserves::reserve_shares(&raw.storage, &buckets)?;

    let reserve_undelegations = match buckets.reserve_undelegations {
        Some(value) => decode_queue(keys::RESERVE_UNDELEGATIONS.as_bytes(), value)?,
        None => Vec::new(),
    };

    tracing::info!(
        users_undelegating = user_undelegations.len(),
        reservers = reserves.len(),
        reserve_undelegations = reserve_undelegations.len(),
        shape = ?reserve_shape,
        "reconciliation pass complete"
    );

    Ok(ReconciledState {
        global,
        user_undelegations,
        reserve_shape,
        reserves,
        reserve_undelegations,
    })
}
