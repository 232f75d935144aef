//! Deployment configuration.

use std::path::{Path, PathBuf};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::DeployError;

/// The default name for the collstake configuration file.
pub const CONFIG_FILENAME: &str = "Collstake.toml";

/// Prefix of the environment variables that override configuration values.
pub const ENV_PREFIX: &str = "COLLSTAKE_";

/// Default manifest location, relative to the working directory.
pub const DEFAULT_OUTPUT_FILE: &str = "./testnet_deployments.json";

/// Default root of the compiled Hardhat artifacts.
pub const DEFAULT_ARTIFACTS_DIR: &str = "./artifacts";

/// Default JSON-RPC endpoint (a local Hardhat or Anvil node).
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545/";

/// Connection settings for the target network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Network name, used as the top-level key of the manifest.
    pub name: String,
    /// JSON-RPC endpoint of the node.
    pub rpc_url: Url,
    /// Maximum time to wait for a transaction to reach its confirmation depth.
    pub confirmation_timeout_secs: u64,
    /// Interval between two receipt polls.
    pub poll_interval_ms: u64,
    /// Timeout of a single JSON-RPC request.
    pub request_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "testnet".to_string(),
            rpc_url: Url::parse(DEFAULT_RPC_URL).expect("default RPC URL is valid"),
            confirmation_timeout_secs: 300,
            poll_interval_ms: 1_000,
            request_timeout_secs: 30,
        }
    }
}

/// Parameters of a deployment run.
///
/// Dependency addresses are either known up front (loaded from the config file
/// or the environment) or filled in by the environment driver as each
/// prerequisite contract gets deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Path of the deployment manifest.
    pub output_file: PathBuf,
    /// Number of confirmations to await for every transaction.
    pub tx_confirmations: u64,

    /// Receiver of protocol fees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treasury_address: Option<Address>,
    /// DPX token contract.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpx_token: Option<Address>,
    /// GMX token contract.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gmx_token: Option<Address>,
    /// DPX staking rewards contract.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpx_staking_rewards: Option<Address>,
    /// GMX reward router (v2) contract.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gmx_reward_router_v2: Option<Address>,

    /// Root directory of the compiled contract artifacts.
    pub artifacts_dir: PathBuf,
    /// Index of the node-managed account used to sign every transaction.
    pub signer_index: usize,
    /// Ignore the manifest and deploy every contract again.
    ///
    /// Applies to a single run and is never written back to a config file.
    #[serde(skip_serializing)]
    pub redeploy: bool,

    /// Target network.
    pub network: NetworkConfig,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            tx_confirmations: 1,
            treasury_address: None,
            dpx_token: None,
            gmx_token: None,
            dpx_staking_rewards: None,
            gmx_reward_router_v2: None,
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            signer_index: 0,
            redeploy: false,
            network: NetworkConfig::default(),
        }
    }
}

/// The dependency addresses a deployment can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum AddressField {
    TreasuryAddress,
    DpxToken,
    GmxToken,
    DpxStakingRewards,
    GmxRewardRouterV2,
}

impl DeployConfig {
    /// Get a dependency address, failing if it has not been set yet.
    pub fn require(&self, field: AddressField) -> Result<Address, DeployError> {
        self.address(field)
            .ok_or_else(|| DeployError::MissingAddress(field.into()))
    }

    /// Get a dependency address, if set.
    pub fn address(&self, field: AddressField) -> Option<Address> {
        match field {
            AddressField::TreasuryAddress => self.treasury_address,
            AddressField::DpxToken => self.dpx_token,
            AddressField::GmxToken => self.gmx_token,
            AddressField::DpxStakingRewards => self.dpx_staking_rewards,
            AddressField::GmxRewardRouterV2 => self.gmx_reward_router_v2,
        }
    }

    /// Set a dependency address.
    pub fn set_address(&mut self, field: AddressField, address: Address) {
        let slot = match field {
            AddressField::TreasuryAddress => &mut self.treasury_address,
            AddressField::DpxToken => &mut self.dpx_token,
            AddressField::GmxToken => &mut self.gmx_token,
            AddressField::DpxStakingRewards => &mut self.dpx_staking_rewards,
            AddressField::GmxRewardRouterV2 => &mut self.gmx_reward_router_v2,
        };
        *slot = Some(address);
    }

    /// Build the layered configuration: defaults, then the TOML file (if any),
    /// then `COLLSTAKE_*` environment variables. Nested keys use `__`, e.g.
    /// `COLLSTAKE_NETWORK__RPC_URL`.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            figment = figment.merge(Toml::file(resolve_config_path(path)));
        }

        figment.merge(
            Env::prefixed(ENV_PREFIX)
                .ignore(&[
                    "config",
                    "verbosity",
                    "environment",
                    "rpc_url",
                    "network_name",
                    "artifacts",
                    "confirmations",
                    "save_config",
                ])
                .split("__"),
        )
    }

    /// Load the layered configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::figment(path)
            .extract()
            .context("Failed to load deployment configuration")
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize deploy config to TOML")?;
        std::fs::write(path, content)
            .context(format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Load the configuration from a TOML file, without any layering.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file or directory not found: {}",
                path.display()
            ));
        }

        let config_path = resolve_config_path(path);
        let content = std::fs::read_to_string(&config_path)
            .context(format!("Failed to read config from {}", config_path.display()))?;
        let config: Self =
            toml::from_str(&content).context("Failed to parse config file as TOML")?;
        tracing::info!(path = %config_path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Save the configuration next to the manifest.
    pub fn save_config(&self) -> Result<PathBuf> {
        let dir = self
            .output_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let config_path = dir.join(CONFIG_FILENAME);
        self.save_to_file(&config_path)?;
        Ok(config_path)
    }
}

/// A directory resolves to the default config file inside it.
fn resolve_config_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(CONFIG_FILENAME)
    } else {
        path.to_path_buf()
    }
}
