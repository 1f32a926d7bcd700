use serde::Serialize;

use crate::invariants::InvariantReport;
use crate::model::amount::to_egld;
use crate::model::{ReconciledState, RebalanceDecision, queue_total};
use crate::profit::ProfitReport;

/// Everything one `reconcile` run produces, for `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub state: ReconciledState,
    pub token_price: f64,
    pub invariants: InvariantReport,
}

impl ReconReport {
    pub fn new(state: ReconciledState, invariants: InvariantReport) -> Self {
        ReconReport {
            token_price: state.global.token_price(),
            state,
            invariants,
        }
    }

    pub fn print(&self) {
        let g = &self.state.global;
        println!("\n{}", "═".repeat(78));
        println!("  Reconciliation");
        println!("{}", "═".repeat(78));
        println!("  State:              {:?}", g.state);
        println!("  Liquid token:       {}", g.liquid_token_id);
        println!("  Provider:           {}", g.provider_address);
        println!("  EGLD staked:        {:>20.6}", to_egld(g.egld_staked));
        println!("  Liquid supply:      {:>20.6}", to_egld(g.liquid_supply));
        println!("  Token price:        {:>20.6}", self.token_price);
        println!("  EGLD reserve:       {:>20.6}", to_egld(g.egld_reserve));
        println!("  Available reserve:  {:>20.6}", to_egld(g.available_egld_reserve));
        println!("  Undelegate-now fee: {:>19.2}%", g.undelegate_now_fee_percent());
        println!("  Unbond period:      {:>20} epochs", g.unbond_period);

        print_users(&self.state);
        print_reserves(&self.state);
        print_invariants(&self.invariants);
    }
}

fn print_users(state: &ReconciledState) {
    let entries: usize = state.user_undelegations.values().map(Vec::len).sum();
    println!("\n  Undelegating users: {} ({} entries)", state.user_undelegations.len(), entries);
    if state.user_undelegations.is_empty() {
        return;
    }
    println!("  {:<16} {:>8} {:>22}", "User", "Entries", "Total EGLD");
    println!("  {}", "-".repeat(48));
    for (user, queue) in &state.user_undelegations {
        println!(
            "  {:<16} {:>8} {:>22.6}",
            user.short(),
            queue.len(),
            to_egld(queue_total(queue))
        );
    }
    println!(
        "  {:<16} {:>8} {:>22.6}",
        "total",
        entries,
        to_egld(state.total_user_undelegations())
    );
}

fn print_reserves(state: &ReconciledState) {
    println!(
        "\n  Reservers: {} (layout: {:?})",
        state.reserves.len(),
        state.reserve_shape
    );
    if !state.reserves.is_empty() {
        println!("  {:<16} {:>22}", "User", "Reserve EGLD");
        println!("  {}", "-".repeat(39));
        for (user, amount) in &state.reserves {
            println!("  {:<16} {:>22.6}", user.short(), to_egld(*amount));
        }
        println!("  {:<16} {:>22.6}", "total", to_egld(state.total_reserve_shares()));
    }
    println!(
        "  Reserve undelegations: {} entries, {:.6} EGLD",
        state.reserve_undelegations.len(),
        to_egld(state.total_reserve_undelegations())
    );
}

fn print_invariants(report: &InvariantReport) {
    println!("\n  Invariants (tolerance {:e})", report.tolerance);
    for c in &report.checks {
        let mark = if c.passed { "ok  " } else { "FAIL" };
        println!(
            "  [{mark}] {:<28} reported {:>20.6}  computed {:>20.6}  drift {:.3e}",
            c.invariant.label(),
            c.reported,
            c.computed,
            c.drift
        );
    }
    println!("{}", "═".repeat(78));
}

// ── Profit ───────────────────────────────────────────────────────────

pub fn print_profit(report: &ProfitReport) {
    println!("\n{}", "═".repeat(60));
    println!("  LP Profit");
    println!("{}", "═".repeat(60));
    println!("  {:<14} {:>14} {:>14}", "", "EGLD", "LEGLD");
    println!("  {}", "-".repeat(44));
    println!(
        "  {:<14} {:>14.6} {:>14.6}",
        "in LP", report.real.stake, report.real.derivative
    );
    println!(
        "  {:<14} {:>14.6} {:>14.6}",
        "baseline", report.baseline.stake, report.baseline.derivative
    );
    println!(
        "  {:<14} {:>14.6} {:>14.6}",
        "excess", report.excess.stake, report.excess.derivative
    );
    println!(
        "  {:<14} {:>+14.6} {:>+14.6}",
        "profit", report.stake_profit, report.derivative_profit
    );
    println!("  Price:      {:.6}", report.price);
    println!("  Net profit: {:+.6}", report.net_profit);
    match report.decision {
        RebalanceDecision::NoAction => println!("  Decision:   no action"),
        RebalanceDecision::Delegate(a) => println!("  Decision:   delegate {a:.6} EGLD"),
        RebalanceDecision::UndelegateNow(a) => {
            println!("  Decision:   undelegate now {a:.6} LEGLD")
        }
    }
    println!("{}", "═".repeat(60));
}

// ── User ─────────────────────────────────────────────────────────────

#[cfg(feature = "full")]
pub fn print_user(position: &crate::reconcile::lookup::UserPosition, epoch: Option<u64>) {
    println!("\n  {}", position.user);
    println!("  {}", "-".repeat(64));
    println!("  Undelegations: {}", position.undelegations.len());
    for u in &position.undelegations {
        let status = match epoch {
            Some(e) if u.is_withdrawable(e) => "withdrawable",
            Some(_) => "unbonding",
            None => "",
        };
        println!(
            "    {:>20.6} EGLD  epoch {:>6}  {status}",
            to_egld(u.amount),
            u.unbond_epoch
        );
    }
    println!(
        "  Reserve:       {:.6} EGLD ({:?})",
        to_egld(position.reserve),
        position.reserve_shape
    );
}
