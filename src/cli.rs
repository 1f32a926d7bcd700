use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Liquid staking reconciler: rebuild per-user accounting from raw
/// contract storage, check it against reported totals, and decide LP
/// rebalancing.
#[derive(Parser)]
#[command(name = "salsa-recon", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Config file (default: <config dir>/salsa-recon/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Gateway base URL
    #[arg(long, global = true)]
    pub gateway: Option<String>,

    /// Liquid staking contract address (erd1...)
    #[arg(long, global = true)]
    pub contract: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconstruct undelegation queues and reserve shares, then check invariants
    Reconcile {
        /// Reconcile a saved dump instead of fetching
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute LP profit against the recorded baseline and the rebalance decision
    Profit {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up one user's undelegations and reserve share
    User {
        /// User address (erd1...)
        address: String,

        /// Current epoch, to flag withdrawable undelegations
        #[arg(long)]
        epoch: Option<u64>,

        /// Print the position as JSON
        #[arg(long)]
        json: bool,
    },

    /// Save the raw storage and view results to a JSON file
    Dump {
        /// Output file path
        #[arg(long, short = 'o')]
        output: PathBuf,
    },
}
