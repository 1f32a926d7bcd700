use std::collections::BTreeMap;

use alloy::primitives::U256;
use async_trait::async_trait;

use super::keys::StorageKey;
use super::{FetchError, KeyLookup, RawState, StorageSnapshot};

/// Read access to a contract account on the ledger.
///
/// Implementations own transport concerns (HTTP, retries). Callers treat
/// each method as one fallible round trip.
#[async_trait]
pub trait StorageFetcher: Send + Sync {
    /// Value stored under one key.
    async fn get_key(&self, address: &str, key: &StorageKey) -> KeyLookup;

    /// Every key of the account starting with `prefix` (all keys for an
    /// empty prefix), as raw key → raw value.
    async fn get_keys(
        &self,
        address: &str,
        prefix: &[u8],
    ) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, FetchError>;

    /// Execute a read-only contract function. `args` are hex encoded.
    async fn query_view(
        &self,
        address: &str,
        function: &str,
        args: &[String],
    ) -> Result<Vec<Vec<u8>>, FetchError>;

    /// ESDT token balance held by an account.
    async fn token_balance(&self, address: &str, token: &str) -> Result<U256, FetchError>;
}

/// Views read by every reconciliation pass.
pub const STATE_VIEWS: [&str; 7] = [
    "getState",
    "getTotalEgldStaked",
    "getEgldReserve",
    "getAvailableEgldReserve",
    "getLiquidTokenSupply",
    "getUndelegateNowFee",
    "getProviderAddress",
];

/// Fetch the full storage dump and state views of a contract, one call at a
/// time. Any failure aborts the whole collection.
pub async fn collect_raw_state(
    fetcher: &dyn StorageFetcher,
    contract: &str,
) -> Result<RawState, FetchError> {
    let entries = fetcher.get_keys(contract, &[]).await?;
    let mut storage = StorageSnapshot::new();
    for (key, value) in entries {
        storage.insert(StorageKey::from_raw(key), value);
    }
    tracing::debug!(keys = storage.len(), contract, "storage dump fetched");

    let mut views = BTreeMap::new();
    for function in STATE_VIEWS {
        let results = fetcher.query_view(contract, function, &[]).await?;
        views.insert(function.to_string(), results);
    }

    Ok(RawState { storage, views })
}
