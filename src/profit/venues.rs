//! Pool reserves and LP holdings per venue.

use alloy::primitives::U256;

use crate::codec;
use crate::codec::records::decode_onedex_pair;
use crate::config::{PairSide, VenueConfig};
use crate::model::LpSnapshot;
use crate::reconcile::{ReconError, decode_err};
use crate::storage::fetcher::StorageFetcher;

/// Reserves as the pool orders them.
struct PoolReserves {
    first: U256,
    second: U256,
    lp_supply: U256,
}

async fn onedex_reserves(
    fetcher: &dyn StorageFetcher,
    router: &str,
    pair_id: u32,
) -> Result<PoolReserves, ReconError> {
    let arg = hex::encode(codec::big_uint_to_be(U256::from(pair_id)));
    let results = fetcher.query_view(router, "viewPair", &[arg]).await?;
    let bytes = results
        .first()
        .ok_or_else(|| ReconError::Missing(format!("viewPair({pair_id}) result")))?;
    let (pair, _) = decode_onedex_pair(bytes, 0).map_err(decode_err("viewPair"))?;
    tracing::debug!(
        pair_id = pair.pair_id,
        first = %pair.first_token_id,
        second = %pair.second_token_id,
        lp = %pair.lp_token_id,
        "onedex pair"
    );
    Ok(PoolReserves {
        first: pair.first_token_reserve,
        second: pair.second_token_reserve,
        lp_supply: pair.lp_token_supply,
    })
}

async fn xexchange_reserves(
    fetcher: &dyn StorageFetcher,
    pair: &str,
) -> Result<PoolReserves, ReconError> {
    let results = fetcher
        .query_view(pair, "getReservesAndTotalSupply", &[])
        .await?;
    let [first, second, supply] = results.as_slice() else {
        return Err(ReconError::Missing(format!(
            "getReservesAndTotalSupply returned {} values, expected 3",
            results.len()
        )));
    };
    let what = "getReservesAndTotalSupply";
    Ok(PoolReserves {
        first: codec::top_big_uint(first).map_err(decode_err(what))?,
        second: codec::top_big_uint(second).map_err(decode_err(what))?,
        lp_supply: codec::top_big_uint(supply).map_err(decode_err(what))?,
    })
}

/// Snapshot one venue together with the LP tokens `contract` holds there.
pub async fn fetch_snapshot(
    fetcher: &dyn StorageFetcher,
    contract: &str,
    venue: &VenueConfig,
) -> Result<LpSnapshot, ReconError> {
    let reserves = match venue {
        VenueConfig::Onedex {
            address, pair_id, ..
        } => onedex_reserves(fetcher, address, *pair_id).await?,
        VenueConfig::Xexchange { address, .. } => xexchange_reserves(fetcher, address).await?,
    };
    let protocol_lp_balance = fetcher.token_balance(contract, venue.lp_token()).await?;

    let (stake_reserve, derivative_reserve) = match venue.stake_side() {
        PairSide::First => (reserves.first, reserves.second),
        PairSide::Second => (reserves.second, reserves.first),
    };

    Ok(LpSnapshot {
        venue: venue.label(),
        stake_reserve,
        derivative_reserve,
        lp_total_supply: reserves.lp_supply,
        protocol_lp_balance,
    })
}

pub async fn fetch_snapshots(
    fetcher: &dyn StorageFetcher,
    contract: &str,
    venues: &[VenueConfig],
) -> Result<Vec<LpSnapshot>, ReconError> {
    let mut snapshots = Vec::with_capacity(venues.len());
    for venue in venues {
        let snapshot = fetch_snapshot(fetcher, contract, venue).await?;
        tracing::info!(
            venue = %snapshot.venue,
            stake = snapshot.stake_share(),
            derivative = snapshot.derivative_share(),
            "lp position"
        );
        snapshots.push(snapshot);
    }
    Ok(snapshots)
}
