//! End-to-end passes: fetch, reconcile, check, evaluate.

use anyhow::{Context, Result};

use crate::config::ReconConfig;
use crate::invariants;
use crate::profit::{self, ProfitReport, venues};
use crate::reconcile;
use crate::report::ReconReport;
use crate::storage::RawState;
use crate::storage::fetcher::{StorageFetcher, collect_raw_state};

/// Reconcile an already collected state and run the invariant checks.
pub fn reconcile_raw(raw: &RawState, tolerance: f64) -> Result<ReconReport> {
    let state = reconcile::reconcile(raw).context("reconciliation failed")?;
    let checks = invariants::check(&state, tolerance);
    if !checks.all_passed() {
        tracing::warn!(
            failed = checks.failures().count(),
            "reconciled totals disagree with reported reserve"
        );
    }
    Ok(ReconReport::new(state, checks))
}

pub async fn reconcile_contract(
    fetcher: &dyn StorageFetcher,
    config: &ReconConfig,
) -> Result<ReconReport> {
    let contract = config.contract()?;
    let raw = collect_raw_state(fetcher, contract)
        .await
        .with_context(|| format!("fetching state of {contract}"))?;
    reconcile_raw(&raw, config.tolerance)
}

/// Price from the contract's views, baseline from its storage, LP value
/// from every configured venue.
pub async fn evaluate_profit(
    fetcher: &dyn StorageFetcher,
    config: &ReconConfig,
) -> Result<ProfitReport> {
    let contract = config.contract()?;
    let raw = collect_raw_state(fetcher, contract)
        .await
        .with_context(|| format!("fetching state of {contract}"))?;
    let global = reconcile::read_global_state(&raw).context("reading global state")?;
    let baseline = profit::read_baseline(&raw.storage).context("reading lp baseline")?;

    let snapshots = venues::fetch_snapshots(fetcher, contract, &config.venues)
        .await
        .context("fetching lp venues")?;
    if snapshots.is_empty() {
        tracing::warn!("no lp venues configured, real lp value is zero");
    }

    profit::evaluate_snapshots(
        &snapshots,
        &baseline,
        global.token_price(),
        config.undelegate_now_haircut,
    )
    .context("evaluating lp profit")
}
