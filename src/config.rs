//! Client configuration.
//!
//! Loaded from a toml file (missing file means defaults), then overridden by
//! `DAPP_*` environment variables. Command line flags are applied on top by
//! the binaries.

use crate::history::HistoryLimits;
use anyhow::Context;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

pub const DEFAULT_CONFIG_PATH: &str = "dapp-client.toml";
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x006449DdBF47FD3a5cF7D7143B2297F0Ab7f2b2e";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub wallet: WalletConfig,
    pub contract: ContractConfig,
    pub history: HistoryConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint of the ledger node. Empty disables node detection.
    pub rpc_url: String,
    /// How often pending transactions are polled for inclusion
    pub poll_interval_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            poll_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WalletConfig {
    /// Hex encoded signing key. When unset the node's unlocked accounts are used.
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContractConfig {
    pub address: Address,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_CONTRACT_ADDRESS
                .parse()
                .expect("default contract address is valid"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_results: usize,
    pub max_blocks_scanned: u64,
    /// Blocks fetched ahead of the one being examined
    pub fetch_concurrency: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        let limits = HistoryLimits::default();
        Self {
            max_results: limits.max_results,
            max_blocks_scanned: limits.max_blocks_scanned,
            fetch_concurrency: limits.fetch_concurrency,
        }
    }
}

impl HistoryConfig {
    pub fn limits(&self) -> HistoryLimits {
        HistoryLimits {
            max_results: self.max_results,
            max_blocks_scanned: self.max_blocks_scanned,
            fetch_concurrency: self.fetch_concurrency.max(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    /// Transfers above this many ether ask for confirmation first
    pub confirm_threshold_eth: String,
    pub splash_timeout_ms: u64,
    pub dark_mode: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            confirm_threshold_eth: "10".to_string(),
            splash_timeout_ms: 2000,
            dark_mode: false,
        }
    }
}

impl UiConfig {
    pub fn confirm_threshold(&self) -> anyhow::Result<U256> {
        crate::units::parse_amount(&self.confirm_threshold_eth).with_context(|| {
            format!(
                "invalid ui.confirm_threshold_eth {:?}",
                self.confirm_threshold_eth
            )
        })
    }

    pub fn splash_timeout(&self) -> Duration {
        Duration::from_millis(self.splash_timeout_ms)
    }
}

impl Config {
    /// Reads `path` if it exists, otherwise starts from defaults. Environment
    /// overrides are applied either way.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            log::info!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<Config>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies `DAPP_RPC_URL`, `DAPP_PRIVATE_KEY` and `DAPP_CONTRACT_ADDRESS`.
    pub fn apply_env<F>(&mut self, var: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var("DAPP_RPC_URL") {
            self.network.rpc_url = url;
        }
        if let Some(key) = var("DAPP_PRIVATE_KEY").filter(|k| !k.is_empty()) {
            self.wallet.private_key = Some(key);
        }
        if let Some(address) = var("DAPP_CONTRACT_ADDRESS") {
            self.contract.address = address
                .parse()
                .with_context(|| format!("invalid DAPP_CONTRACT_ADDRESS {:?}", address))?;
        }
        Ok(())
    }
}
