use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::invariants::DEFAULT_TOLERANCE;
use crate::profit::DEFAULT_UNDELEGATE_NOW_HAIRCUT;

pub const GATEWAY_ENV: &str = "SALSA_RECON_GATEWAY";
pub const CONTRACT_ENV: &str = "SALSA_RECON_CONTRACT";

// ── Config types ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconConfig {
    /// Liquid staking contract (bech32). Required before any fetch.
    #[serde(default)]
    pub contract: Option<String>,
    #[serde(default = "default_gateway")]
    pub gateway: String,
    /// Absolute drift allowed by the invariant checks, in token units.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Fraction kept when converting stake to liquid tokens immediately.
    #[serde(default = "default_haircut")]
    pub undelegate_now_haircut: f64,
    #[serde(default)]
    pub venues: Vec<VenueConfig>,
}

fn default_gateway() -> String {
    "https://gateway.multiversx.com".to_string()
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_haircut() -> f64 {
    DEFAULT_UNDELEGATE_NOW_HAIRCUT
}

impl Default for ReconConfig {
    fn default() -> Self {
        ReconConfig {
            contract: None,
            gateway: default_gateway(),
            tolerance: default_tolerance(),
            undelegate_now_haircut: default_haircut(),
            venues: Vec::new(),
        }
    }
}

/// Which pair side holds the stake token (EGLD / WEGLD).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairSide {
    First,
    #[default]
    Second,
}

/// An LP pool the protocol provides liquidity to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VenueConfig {
    Onedex {
        /// OneDex router contract.
        address: String,
        pair_id: u32,
        lp_token: String,
        #[serde(default)]
        stake_side: PairSide,
    },
    Xexchange {
        /// xExchange pair contract.
        address: String,
        lp_token: String,
        #[serde(default)]
        stake_side: PairSide,
    },
}

impl VenueConfig {
    pub fn label(&self) -> String {
        match self {
            VenueConfig::Onedex { pair_id, .. } => format!("onedex#{pair_id}"),
            VenueConfig::Xexchange { address, .. } => {
                let tail = address.len().saturating_sub(6);
                format!("xexchange:{}", address.get(tail..).unwrap_or(address))
            }
        }
    }

    pub fn lp_token(&self) -> &str {
        match self {
            VenueConfig::Onedex { lp_token, .. } | VenueConfig::Xexchange { lp_token, .. } => {
                lp_token
            }
        }
    }

    pub fn stake_side(&self) -> PairSide {
        match self {
            VenueConfig::Onedex { stake_side, .. } | VenueConfig::Xexchange { stake_side, .. } => {
                *stake_side
            }
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────────

/// Values given on the command line, highest precedence.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub gateway: Option<String>,
    pub contract: Option<String>,
}

impl ReconConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// `<config_dir>/salsa-recon/config.json`
    #[cfg(feature = "full")]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("salsa-recon").join("config.json"))
    }

    #[cfg(not(feature = "full"))]
    pub fn default_path() -> Option<PathBuf> {
        None
    }

    /// Resolve in order: overrides, environment, config file, defaults.
    pub fn resolve(overrides: &Overrides) -> Result<Self> {
        let mut config = match &overrides.config {
            Some(path) => Self::load(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load(&path)?,
                None => Self::default(),
            },
        };

        if let Ok(gateway) = std::env::var(GATEWAY_ENV) {
            config.gateway = gateway;
        }
        if let Ok(contract) = std::env::var(CONTRACT_ENV) {
            config.contract = Some(contract);
        }
        if let Some(gateway) = &overrides.gateway {
            config.gateway = gateway.clone();
        }
        if let Some(contract) = &overrides.contract {
            config.contract = Some(contract.clone());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance >= 0.0 && self.tolerance.is_finite()) {
            bail!("tolerance must be a non-negative number, got {}", self.tolerance);
        }
        if !(self.undelegate_now_haircut > 0.0 && self.undelegate_now_haircut <= 1.0) {
            bail!(
                "undelegate_now_haircut must be within (0, 1], got {}",
                self.undelegate_now_haircut
            );
        }
        Ok(())
    }

    pub fn contract(&self) -> Result<&str> {
        self.contract.as_deref().with_context(|| {
            format!("no contract address: pass --contract, set {CONTRACT_ENV}, or add it to the config file")
        })
    }
}
