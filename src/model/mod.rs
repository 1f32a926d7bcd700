pub mod address;
pub mod amount;
pub mod lp;

use std::collections::BTreeMap;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

pub use address::Pubkey;
pub use lp::{Baseline, LpSnapshot, RebalanceDecision};

// ── Undelegations ───────────────────────────────────────────────────

/// One pending undelegation. `amount` carries 18 implied decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Undelegation {
    pub amount: U256,
    pub unbond_epoch: u64,
}

impl Undelegation {
    /// Whether the unbonding period has elapsed at `epoch`.
    pub fn is_withdrawable(&self, epoch: u64) -> bool {
        self.unbond_epoch <= epoch
    }
}

/// Oldest-first queue, in on-chain insertion order.
pub type UndelegationQueue = Vec<Undelegation>;

pub fn queue_total(queue: &[Undelegation]) -> U256 {
    queue
        .iter()
        .fold(U256::ZERO, |acc, u| acc.saturating_add(u.amount))
}

// ── Global state ────────────────────────────────────────────────────

/// Contract activity flag as stored on chain (`0`, `1`, `2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractState {
    Inactive,
    Active,
    PartiallyActive,
}

impl ContractState {
    pub fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            0 => Some(ContractState::Inactive),
            1 => Some(ContractState::Active),
            2 => Some(ContractState::PartiallyActive),
            _ => None,
        }
    }
}

/// Protocol-reported scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalState {
    pub state: ContractState,
    pub egld_staked: U256,
    pub egld_reserve: U256,
    pub available_egld_reserve: U256,
    pub liquid_supply: U256,
    pub undelegate_now_fee_bps: u64,
    pub provider_address: Pubkey,
    pub unbond_period: u64,
    pub liquid_token_id: String,
}

impl GlobalState {
    /// Liquid token price in stake-token terms (`egld_staked / liquid_supply`).
    ///
    /// An empty pool prices at 1.0, as the contract does.
    pub fn token_price(&self) -> f64 {
        if self.egld_staked.is_zero() || self.liquid_supply.is_zero() {
            return 1.0;
        }
        amount::to_egld(self.egld_staked) / amount::to_egld(self.liquid_supply)
    }

    pub fn undelegate_now_fee_percent(&self) -> f64 {
        self.undelegate_now_fee_bps as f64 / 100.0
    }
}

// ── Reconciled snapshot ─────────────────────────────────────────────

/// Which storage layout the per-user reserve shares were read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReserveShape {
    /// One blob of `(pubkey, amount)` pairs under `users_reserves`.
    PackedBlob,
    /// `reservers_addresses ++ pubkey` holds an index into `users_reserves.item`.
    IndexedItems,
    /// `users_reserve_points ++ pubkey` holds points against `reserve_points`.
    Points,
    /// No reserve share keys present.
    Empty,
}

/// Consistent view of the protocol built from one immutable fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciledState {
    pub global: GlobalState,
    pub user_undelegations: BTreeMap<Pubkey, UndelegationQueue>,
    pub reserve_shape: ReserveShape,
    pub reserves: BTreeMap<Pubkey, U256>,
    pub reserve_undelegations: UndelegationQueue,
}

impl ReconciledState {
    pub fn total_reserve_shares(&self) -> U256 {
        self.reserves
            .values()
            .fold(U256::ZERO, |acc, v| acc.saturating_add(*v))
    }

    pub fn total_reserve_undelegations(&self) -> U256 {
        queue_total(&self.reserve_undelegations)
    }

    pub fn total_user_undelegations(&self) -> U256 {
        self.user_undelegations
            .values()
            .fold(U256::ZERO, |acc, q| acc.saturating_add(queue_total(q)))
    }
}
