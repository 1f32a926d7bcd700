use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use salsa_recon::config::{Overrides, ReconConfig};

mod cli;
mod commands;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();
    let config = ReconConfig::resolve(&Overrides {
        config: cli.global.config,
        gateway: cli.global.gateway,
        contract: cli.global.contract,
    })?;

    match cli.command {
        cli::Command::Reconcile { snapshot, json } => {
            commands::reconcile(&config, snapshot.as_deref(), json)
        }
        cli::Command::Profit { json } => commands::profit(&config, json),
        cli::Command::User {
            address,
            epoch,
            json,
        } => commands::user(&config, &address, epoch, json),
        cli::Command::Dump { output } => commands::dump(&config, &output),
    }
}
