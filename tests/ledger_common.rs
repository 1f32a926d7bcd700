#![allow(dead_code)]

use std::collections::BTreeMap;

use alloy::primitives::U256;
use async_trait::async_trait;

use salsa_recon::codec::{big_uint_to_be, encode_big_uint, encode_string};
use salsa_recon::model::Pubkey;
use salsa_recon::storage::fetcher::StorageFetcher;
use salsa_recon::storage::keys::{self, StorageKey};
use salsa_recon::storage::{FetchError, KeyLookup, RawState, StorageSnapshot};

pub const CONTRACT: &str = "erd1qqqqqqqqqqqqqpgqpk3qzj86tme9kzxdq87f2rdf5nlwsgvjvcqs5hke3x";
pub const ONEDEX: &str = "erd1qqqqqqqqqqqqqpgqf32jag0ffqhx7c8vm0z7n9k84pks6epckqys7d97nl";
pub const XEXCHANGE: &str = "erd1qqqqqqqqqqqqqpgq4e5cqxqjmxe8agtl2pa6d8suxpse5gv20n4sxkv4sz";

// ── Byte fixtures ────────────────────────────────────────────────────

/// Deterministic test account.
pub fn user(n: u8) -> Pubkey {
    let mut raw = [0u8; 32];
    raw[0] = n;
    raw[31] = n;
    Pubkey(raw)
}

pub fn top(value: U256) -> Vec<u8> {
    big_uint_to_be(value)
}

pub fn top_u64(value: u64) -> Vec<u8> {
    big_uint_to_be(U256::from(value))
}

/// Back-to-back `(big_uint, u64)` pairs.
pub fn undelegations(entries: &[(U256, u64)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (amount, epoch) in entries {
        out.extend(encode_big_uint(*amount));
        out.extend(epoch.to_be_bytes());
    }
    out
}

/// Back-to-back `(pubkey, big_uint)` pairs.
pub fn packed_reserves(entries: &[(Pubkey, U256)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (owner, amount) in entries {
        out.extend_from_slice(owner.as_bytes());
        out.extend(encode_big_uint(*amount));
    }
    out
}

/// OneDex `viewPair` payload with `legld` first and `wegld` second.
pub fn onedex_pair(pair_id: u32, legld: U256, wegld: U256, lp_supply: U256) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(pair_id.to_be_bytes());
    out.push(1); // state
    out.push(1); // enabled
    out.extend_from_slice(user(250).as_bytes());
    out.extend(encode_string("LEGLD-d74da9"));
    out.extend(encode_string("WEGLD-bd4d79"));
    out.extend(encode_string("LEGLDWEGLD-a1b2c3"));
    out.extend(18u32.to_be_bytes());
    out.extend(encode_big_uint(legld));
    out.extend(encode_big_uint(wegld));
    out.extend(encode_big_uint(lp_supply));
    out.push(1); // lp roles set
    out
}

// ── Raw state builder ────────────────────────────────────────────────

pub struct StateBuilder {
    storage: StorageSnapshot,
    views: BTreeMap<String, Vec<Vec<u8>>>,
}

impl StateBuilder {
    /// Active contract with zero totals, 2% undelegate-now fee.
    pub fn new() -> Self {
        StateBuilder {
            storage: StorageSnapshot::new(),
            views: BTreeMap::new(),
        }
        .view("getState", top_u64(1))
        .view("getUndelegateNowFee", top_u64(200))
        .view("getProviderAddress", user(200).as_bytes().to_vec())
        .scalars(U256::ZERO, U256::ZERO, U256::ZERO, U256::ZERO)
        .named(keys::UNBOND_PERIOD, top_u64(10))
        .named(keys::LIQUID_TOKEN_ID, b"LEGLD-d74da9".to_vec())
    }

    pub fn view(mut self, function: &str, value: Vec<u8>) -> Self {
        self.views.insert(function.to_string(), vec![value]);
        self
    }

    /// Reported totals: staked, reserve, available reserve, liquid supply.
    pub fn scalars(self, staked: U256, reserve: U256, available: U256, supply: U256) -> Self {
        self.view("getTotalEgldStaked", top(staked))
            .view("getEgldReserve", top(reserve))
            .view("getAvailableEgldReserve", top(available))
            .view("getLiquidTokenSupply", top(supply))
    }

    pub fn key(mut self, key: StorageKey, value: Vec<u8>) -> Self {
        self.storage.insert(key, value);
        self
    }

    pub fn named(self, name: &str, value: Vec<u8>) -> Self {
        self.key(StorageKey::named(name), value)
    }

    pub fn for_user(self, prefix: &str, user: &Pubkey, value: Vec<u8>) -> Self {
        self.key(StorageKey::for_user(prefix, user), value)
    }

    pub fn build(self) -> RawState {
        RawState {
            storage: self.storage,
            views: self.views,
        }
    }
}

// ── Mock fetcher ─────────────────────────────────────────────────────

/// In-memory ledger: the contract's raw state plus per-address view
/// results and token balances.
pub struct MockLedger {
    pub contract: RawState,
    pub views: BTreeMap<(String, String), Vec<Vec<u8>>>,
    pub balances: BTreeMap<(String, String), U256>,
    /// View calls recorded as `address:function(args)`.
    pub calls: std::sync::Mutex<Vec<String>>,
}

impl MockLedger {
    pub fn new(contract: RawState) -> Self {
        MockLedger {
            contract,
            views: BTreeMap::new(),
            balances: BTreeMap::new(),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_view(mut self, address: &str, function: &str, results: Vec<Vec<u8>>) -> Self {
        self.views
            .insert((address.to_string(), function.to_string()), results);
        self
    }

    pub fn with_balance(mut self, address: &str, token: &str, amount: U256) -> Self {
        self.balances
            .insert((address.to_string(), token.to_string()), amount);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageFetcher for MockLedger {
    async fn get_key(&self, address: &str, key: &StorageKey) -> KeyLookup {
        if address != CONTRACT {
            return KeyLookup::NotFound;
        }
        self.contract.storage.get(key)
    }

    async fn get_keys(
        &self,
        address: &str,
        prefix: &[u8],
    ) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, FetchError> {
        if address != CONTRACT {
            return Ok(BTreeMap::new());
        }
        Ok(self
            .contract
            .storage
            .scan(prefix)
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect())
    }

    async fn query_view(
        &self,
        address: &str,
        function: &str,
        args: &[String],
    ) -> Result<Vec<Vec<u8>>, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{address}:{function}({})", args.join(",")));
        if let Some(results) = self.views.get(&(address.to_string(), function.to_string())) {
            return Ok(results.clone());
        }
        if address == CONTRACT {
            if let Some(results) = self.contract.views.get(function) {
                return Ok(results.clone());
            }
        }
        Err(FetchError::Gateway {
            code: "function not found".into(),
            message: format!("{function} on {address}"),
        })
    }

    async fn token_balance(&self, address: &str, token: &str) -> Result<U256, FetchError> {
        Ok(self
            .balances
            .get(&(address.to_string(), token.to_string()))
            .copied()
            .unwrap_or(U256::ZERO))
    }
}
