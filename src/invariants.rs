//! Advisory cross-checks of reconciled totals against reported scalars.
//!
//! A failed check is reported and logged, never raised as an error and
//! never used to adjust the reconciled data.

use serde::Serialize;

use crate::model::ReconciledState;
use crate::model::amount::to_egld;

pub const DEFAULT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Invariant {
    /// `egld_reserve ≈ Σ reserve shares`
    ReserveMatchesShares,
    /// `Σ reserve undelegations + available_egld_reserve ≈ egld_reserve`
    ReserveMatchesUndelegations,
}

impl Invariant {
    pub fn label(&self) -> &'static str {
        match self {
            Invariant::ReserveMatchesShares => "egld reserve mismatch (1)",
            Invariant::ReserveMatchesUndelegations => "egld reserve mismatch (2)",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvariantCheck {
    pub invariant: Invariant,
    /// Protocol-reported side, in token units.
    pub reported: f64,
    /// Reconstructed side, in token units.
    pub computed: f64,
    pub drift: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvariantReport {
    pub tolerance: f64,
    pub checks: Vec<InvariantCheck>,
}

impl InvariantReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &InvariantCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

fn compare(invariant: Invariant, reported: f64, computed: f64, tolerance: f64) -> InvariantCheck {
    let drift = (reported - computed).abs();
    // NaN drift fails the check.
    let passed = drift <= tolerance;
    if !passed {
        tracing::warn!(
            invariant = ?invariant,
            reported,
            computed,
            drift,
            tolerance,
            "{}",
            invariant.label()
        );
    }
    InvariantCheck {
        invariant,
        reported,
        computed,
        drift,
        passed,
    }
}

pub fn check(state: &ReconciledState, tolerance: f64) -> InvariantReport {
    let egld_reserve = to_egld(state.global.egld_reserve);

    let shares: f64 = state.reserves.values().map(|v| to_egld(*v)).sum();

    let undelegated: f64 = state
        .reserve_undelegations
        .iter()
        .map(|u| to_egld(u.amount))
        .sum();
    let available = to_egld(state.global.available_egld_reserve);

    InvariantReport {
        tolerance,
        checks: vec![
            compare(Invariant::ReserveMatchesShares, egld_reserve, shares, tolerance),
            compare(
                Invariant::ReserveMatchesUndelegations,
                egld_reserve,
                undelegated + available,
                tolerance,
            ),
        ],
    }
}
