use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use super::amount::to_egld;

/// Reserves of one LP venue plus the protocol's LP token holdings there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LpSnapshot {
    pub venue: String,
    /// Pooled stake token (EGLD / WEGLD).
    pub stake_reserve: U256,
    /// Pooled liquid derivative (LEGLD).
    pub derivative_reserve: U256,
    pub lp_total_supply: U256,
    pub protocol_lp_balance: U256,
}

impl LpSnapshot {
    /// Protocol's pro-rata share of a pooled reserve, in token units.
    ///
    /// `reserve × balance / supply` is taken in integers, truncated to the
    /// smallest unit, and scaled down once.
    fn share_of(&self, reserve: U256) -> f64 {
        if self.lp_total_supply.is_zero() {
            return 0.0;
        }
        match reserve.checked_mul(self.protocol_lp_balance) {
            Some(product) => to_egld(product / self.lp_total_supply),
            None => {
                to_egld(reserve) * to_egld(self.protocol_lp_balance)
                    / to_egld(self.lp_total_supply)
            }
        }
    }

    pub fn stake_share(&self) -> f64 {
        self.share_of(self.stake_reserve)
    }

    pub fn derivative_share(&self) -> f64 {
        self.share_of(self.derivative_reserve)
    }
}

/// LP-locked value recorded by the contract at the last rebalance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub egld_in_lp: U256,
    pub legld_in_lp: U256,
    pub excess_egld_in_lp: U256,
    pub excess_legld_in_lp: U256,
}

/// What the transaction layer should do next. Amounts are in token units:
/// stake token for `Delegate`, liquid token for `UndelegateNow`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "amount", rename_all = "snake_case")]
pub enum RebalanceDecision {
    NoAction,
    Delegate(f64),
    UndelegateNow(f64),
}

impl RebalanceDecision {
    pub fn amount(&self) -> f64 {
        match self {
            RebalanceDecision::NoAction => 0.0,
            RebalanceDecision::Delegate(a) | RebalanceDecision::UndelegateNow(a) => *a,
        }
    }
}
