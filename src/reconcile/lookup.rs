//! Single-user reads through point lookups instead of a full storage dump.

use alloy::primitives::U256;
use serde::Serialize;

use crate::codec;
use crate::model::{Pubkey, ReserveShape, UndelegationQueue};
use crate::storage::fetcher::StorageFetcher;
use crate::storage::keys::{self, StorageKey};

use super::reserves::points_to_amount;
use super::{ReconError, decode_err, decode_queue};

#[derive(Debug, Clone, Serialize)]
pub struct UserPosition {
    pub user: Pubkey,
    pub undelegations: UndelegationQueue,
    pub reserve_shape: ReserveShape,
    pub reserve: U256,
}

async fn big_uint_key(
    fetcher: &dyn StorageFetcher,
    contract: &str,
    key: &StorageKey,
    name: &str,
) -> Result<U256, ReconError> {
    let bytes = fetcher.get_key(contract, key).await.or_empty()?;
    codec::top_big_uint(&bytes).map_err(decode_err(name))
}

/// Reserve share of one user, trying the points layout first, then the
/// index layout. A user found in neither holds no reserve.
async fn user_reserve(
    fetcher: &dyn StorageFetcher,
    contract: &str,
    user: &Pubkey,
) -> Result<(ReserveShape, U256), ReconError> {
    let points_key = StorageKey::for_user(keys::USERS_RESERVE_POINTS, user);
    if let Some(bytes) = fetcher.get_key(contract, &points_key).await.into_option()? {
        let points =
            codec::top_big_uint(&bytes).map_err(decode_err(keys::USERS_RESERVE_POINTS))?;
        let total_points = big_uint_key(
            fetcher,
            contract,
            &StorageKey::named(keys::RESERVE_POINTS),
            keys::RESERVE_POINTS,
        )
        .await?;
        let total_reserve = big_uint_key(
            fetcher,
            contract,
            &StorageKey::named(keys::EGLD_RESERVE),
            keys::EGLD_RESERVE,
        )
        .await?;
        let amount = points_to_amount(points, total_reserve, total_points)?;
        return Ok((ReserveShape::Points, amount));
    }

    let index_key = StorageKey::for_user(keys::RESERVERS_ADDRESSES, user);
    if let Some(bytes) = fetcher.get_key(contract, &index_key).await.into_option()? {
        let index = codec::top_u32(&bytes).map_err(decode_err(keys::RESERVERS_ADDRESSES))?;
        let item_key = StorageKey::item(keys::USERS_RESERVES_ITEM, index);
        let item = fetcher.get_key(contract, &item_key).await.or_empty()?;
        if item.is_empty() {
            tracing::debug!(user = %user.short(), index, "reserve item absent, reading zero");
        }
        let amount = codec::top_big_uint(&item).map_err(decode_err(keys::USERS_RESERVES_ITEM))?;
        return Ok((ReserveShape::IndexedItems, amount));
    }

    Ok((ReserveShape::Empty, U256::ZERO))
}

pub async fn user_position(
    fetcher: &dyn StorageFetcher,
    contract: &str,
    user: &Pubkey,
) -> Result<UserPosition, ReconError> {
    let key = StorageKey::for_user(keys::USER_UNDELEGATIONS, user);
    let undelegations = match fetcher.get_key(contract, &key).await.into_option()? {
        Some(value) => decode_queue(key.as_bytes(), &value)?,
        None => Vec::new(),
    };

    let (reserve_shape, reserve) = user_reserve(fetcher, contract, user).await?;

    Ok(UserPosition {
        user: *user,
        undelegations,
        reserve_shape,
        reserve,
    })
}
