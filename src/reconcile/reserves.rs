//! Per-user reserve shares across the storage layouts the contract has used.

use std::collections::BTreeMap;

use alloy::primitives::U256;

use crate::codec;
use crate::codec::records::{decode_repeated, decode_reserve_entry};
use crate::model::{Pubkey, ReserveShape};
use crate::storage::StorageSnapshot;
use crate::storage::keys::{self, StorageKey};

use super::{Buckets, ReconError, decode_err, display_key, malformed, storage_big_uint};

/// Pick the layout from which keys exist.
pub(crate) fn detect_shape(buckets: &Buckets<'_>) -> ReserveShape {
    if !buckets.user_points.is_empty() {
        ReserveShape::Points
    } else if !buckets.reserver_index.is_empty() {
        ReserveShape::IndexedItems
    } else if buckets.packed_reserves.is_some() {
        ReserveShape::PackedBlob
    } else {
        ReserveShape::Empty
    }
}

pub(crate) fn reserve_shares(
    storage: &StorageSnapshot,
    buckets: &Buckets<'_>,
) -> Result<(ReserveShape, BTreeMap<Pubkey, U256>), ReconError> {
    let shape = detect_shape(buckets);
    let shares = match shape {
        ReserveShape::PackedBlob => packed_shares(buckets.packed_reserves.unwrap_or(&[]))?,
        ReserveShape::IndexedItems => indexed_shares(buckets)?,
        ReserveShape::Points => point_shares(storage, &buckets.user_points)?,
        ReserveShape::Empty => BTreeMap::new(),
    };
    Ok((shape, shares))
}

// ── Packed blob ─────────────────────────────────────────────────────

fn packed_shares(blob: &[u8]) -> Result<BTreeMap<Pubkey, U256>, ReconError> {
    let entries = decode_repeated(blob, decode_reserve_entry)
        .map_err(malformed(keys::USERS_RESERVES.as_bytes()))?;

    let mut shares: BTreeMap<Pubkey, U256> = BTreeMap::new();
    for (owner, amount) in entries {
        let slot = shares.entry(owner).or_default();
        *slot = slot.saturating_add(amount);
    }
    Ok(shares)
}

// ── Index indirection ───────────────────────────────────────────────

/// `reservers_addresses ++ pubkey` stores an index, not an amount; the
/// amount lives at `users_reserves.item ++ u32be(index)`.
fn indexed_shares(buckets: &Buckets<'_>) -> Result<BTreeMap<Pubkey, U256>, ReconError> {
    let mut shares = BTreeMap::new();
    for (user, index_bytes) in &buckets.reserver_index {
        let what = format!("{}{}", keys::RESERVERS_ADDRESSES, user.to_hex());
        let index = codec::top_u32(index_bytes).map_err(decode_err(what))?;

        // The ledger drops empty values, so an absent item is a zero reserve.
        let item = buckets.reserve_items.get(&index).copied().unwrap_or_else(|| {
            tracing::debug!(user = %user.short(), index, "reserve item absent, reading zero");
            &[]
        });
        let item_key = display_key(StorageKey::item(keys::USERS_RESERVES_ITEM, index).as_bytes());
        let amount = codec::top_big_uint(item).map_err(decode_err(item_key))?;

        tracing::debug!(user = %user.short(), index, "indexed reserve");
        shares.insert(*user, amount);
    }
    Ok(shares)
}

// ── Points ──────────────────────────────────────────────────────────

/// `points × total_reserve / total_points`, truncated.
pub fn points_to_amount(
    points: U256,
    total_reserve: U256,
    total_points: U256,
) -> Result<U256, ReconError> {
    if total_points.is_zero() {
        return Err(ReconError::ZeroReservePoints { users: 1 });
    }
    let product = points
        .checked_mul(total_reserve)
        .ok_or_else(|| ReconError::Overflow("reserve points × egld reserve".into()))?;
    Ok(product / total_points)
}

fn point_shares(
    storage: &StorageSnapshot,
    user_points: &[(Pubkey, &[u8])],
) -> Result<BTreeMap<Pubkey, U256>, ReconError> {
    let total_points = storage_big_uint(storage, keys::RESERVE_POINTS)?;
    let total_reserve = storage_big_uint(storage, keys::EGLD_RESERVE)?;
    if total_points.is_zero() {
        return Err(ReconError::ZeroReservePoints {
            users: user_points.len(),
        });
    }

    let mut shares = BTreeMap::new();
    for (user, value) in user_points {
        let what = format!("{}{}", keys::USERS_RESERVE_POINTS, user.to_hex());
        let points = codec::top_big_uint(value).map_err(decode_err(what))?;
        shares.insert(*user, points_to_amount(points, total_reserve, total_points)?);
    }
    Ok(shares)
}
