//! LP profit and the rebalance decision derived from it.
//!
//! Compares what the protocol's LP tokens are worth right now against the
//! baseline the contract recorded at the last rebalance. A derivative
//! shortfall is settled first, by delegating (cheap); a stake shortfall
//! left after that needs a fee-bearing immediate undelegation.

#[cfg(feature = "full")]
pub mod venues;

use serde::Serialize;
use thiserror::Error;

use crate::model::amount::to_egld;
use crate::model::{Baseline, LpSnapshot, RebalanceDecision};
use crate::reconcile::{ReconError, storage_big_uint};
use crate::storage::StorageSnapshot;
use crate::storage::keys;

/// Fraction kept after an immediate undelegation.
pub const DEFAULT_UNDELEGATE_NOW_HAIRCUT: f64 = 0.98;

#[derive(Debug, Error, PartialEq)]
pub enum ProfitError {
    #[error("token price must be positive and finite, got {0}")]
    InvalidPrice(f64),
    #[error("haircut must be within (0, 1], got {0}")]
    InvalidHaircut(f64),
}

/// LP value actually locked, summed over venues, in token units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LpTotals {
    pub stake: f64,
    pub derivative: f64,
}

pub fn lp_totals(snapshots: &[LpSnapshot]) -> LpTotals {
    snapshots.iter().fold(LpTotals::default(), |acc, s| LpTotals {
        stake: acc.stake + s.stake_share(),
        derivative: acc.derivative + s.derivative_share(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfitReport {
    pub real: LpTotals,
    pub baseline: LpTotals,
    /// Excess LP value the contract recorded beside the baseline. Reported,
    /// not part of the profit computation.
    pub excess: LpTotals,
    pub price: f64,
    /// Stake-token profit after conversions.
    pub stake_profit: f64,
    /// Derivative-token profit after conversions.
    pub derivative_profit: f64,
    pub net_profit: f64,
    pub decision: RebalanceDecision,
}

/// Baseline recorded by the contract. Absent keys read as zero.
pub fn read_baseline(storage: &StorageSnapshot) -> Result<Baseline, ReconError> {
    Ok(Baseline {
        egld_in_lp: storage_big_uint(storage, keys::EGLD_IN_LP)?,
        legld_in_lp: storage_big_uint(storage, keys::LEGLD_IN_LP)?,
        excess_egld_in_lp: storage_big_uint(storage, keys::EXCESS_LP_EGLD)?,
        excess_legld_in_lp: storage_big_uint(storage, keys::EXCESS_LP_LEGLD)?,
    })
}

/// Run the profit algorithm on LP totals already in token units.
///
/// `price` is the liquid token price in stake-token terms.
pub fn evaluate(
    real: LpTotals,
    baseline: LpTotals,
    price: f64,
    haircut: f64,
) -> Result<ProfitReport, ProfitError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(ProfitError::InvalidPrice(price));
    }
    if !(haircut > 0.0 && haircut <= 1.0) {
        return Err(ProfitError::InvalidHaircut(haircut));
    }

    let mut stake_profit = real.stake - baseline.stake;
    let mut derivative_profit = real.derivative - baseline.derivative;
    let mut decision = RebalanceDecision::NoAction;

    if derivative_profit < 0.0 {
        let converted = derivative_profit * price;
        stake_profit += converted;
        derivative_profit = 0.0;
        decision = RebalanceDecision::Delegate(-converted);
    }

    // Checked after the derivative conversion: delegating may have pushed
    // the stake side negative.
    if stake_profit < 0.0 {
        let converted = stake_profit / price * haircut;
        derivative_profit += converted;
        stake_profit = 0.0;
        decision = RebalanceDecision::UndelegateNow(-converted);
    }

    let net_profit = stake_profit + derivative_profit;
    tracing::info!(stake_profit, derivative_profit, net_profit, ?decision, "lp profit evaluated");

    Ok(ProfitReport {
        real,
        baseline,
        excess: LpTotals::default(),
        price,
        stake_profit,
        derivative_profit,
        net_profit,
        decision,
    })
}

/// Evaluate against the stored baseline.
pub fn evaluate_snapshots(
    snapshots: &[LpSnapshot],
    baseline: &Baseline,
    price: f64,
    haircut: f64,
) -> Result<ProfitReport, ProfitError> {
    let recorded = LpTotals {
        stake: to_egld(baseline.egld_in_lp),
        derivative: to_egld(baseline.legld_in_lp),
    };
    let mut report = evaluate(lp_totals(snapshots), recorded, price, haircut)?;
    report.excess = LpTotals {
        stake: to_egld(baseline.excess_egld_in_lp),
        derivative: to_egld(baseline.excess_legld_in_lp),
    };
    Ok(report)
}
