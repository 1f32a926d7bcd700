use std::path::Path;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

use salsa_recon::config::ReconConfig;
use salsa_recon::model::Pubkey;
use salsa_recon::pipeline;
use salsa_recon::reconcile::lookup;
use salsa_recon::report::{self, ReconReport};
use salsa_recon::storage::RawState;
use salsa_recon::storage::fetcher::collect_raw_state;
use salsa_recon::storage::gateway::GatewayClient;

fn runtime() -> Result<Runtime> {
    Runtime::new().context("creating tokio runtime")
}

fn gateway(config: &ReconConfig) -> Result<GatewayClient> {
    GatewayClient::new(&config.gateway)
        .with_context(|| format!("building gateway client for {}", config.gateway))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn reconcile(config: &ReconConfig, snapshot: Option<&Path>, json: bool) -> Result<()> {
    let report: ReconReport = match snapshot {
        Some(path) => {
            let raw = RawState::load(path)?;
            tracing::info!(path = %path.display(), keys = raw.storage.len(), "loaded snapshot");
            pipeline::reconcile_raw(&raw, config.tolerance)?
        }
        None => {
            let client = gateway(config)?;
            runtime()?.block_on(pipeline::reconcile_contract(&client, config))?
        }
    };

    if json {
        print_json(&report)
    } else {
        report.print();
        Ok(())
    }
}

pub fn profit(config: &ReconConfig, json: bool) -> Result<()> {
    let client = gateway(config)?;
    let report = runtime()?.block_on(pipeline::evaluate_profit(&client, config))?;
    if json {
        print_json(&report)
    } else {
        report::print_profit(&report);
        Ok(())
    }
}

pub fn user(config: &ReconConfig, address: &str, epoch: Option<u64>, json: bool) -> Result<()> {
    let user: Pubkey = address
        .parse()
        .with_context(|| format!("invalid user address {address}"))?;
    let contract = config.contract()?;
    let client = gateway(config)?;
    let position = runtime()?
        .block_on(lookup::user_position(&client, contract, &user))
        .with_context(|| format!("looking up {user}"))?;

    if json {
        print_json(&position)
    } else {
        report::print_user(&position, epoch);
        Ok(())
    }
}

pub fn dump(config: &ReconConfig, output: &Path) -> Result<()> {
    let contract = config.contract()?;
    let client = gateway(config)?;
    let raw = runtime()?
        .block_on(collect_raw_state(&client, contract))
        .with_context(|| format!("fetching state of {contract}"))?;
    raw.save(output)?;
    println!(
        "Saved {} keys and {} views to {}",
        raw.storage.len(),
        raw.views.len(),
        output.display()
    );
    Ok(())
}
