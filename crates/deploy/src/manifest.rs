//! Persisted record of deployed contracts, keyed by network.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use alloy_core::primitives::{Address, B256};
use derive_more::{Deref, DerefMut};
use serde::{Deserialize, Serialize};

use crate::{DeployError, artifacts::ContractArtifact, error::Result};

/// One deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    /// Artifact the contract was deployed from.
    pub artifact: String,
    /// Address to interact with. For upgradeable deployments this is the proxy.
    pub address: Address,
    /// Logic contract behind the proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<Address>,
    /// Proxy admin contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<Address>,
    /// Whether the initializer call went through. Only set for upgradeable deployments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initialized: Option<bool>,
    /// Hash of the deployment transaction.
    pub tx_hash: B256,
    /// Hash of the creation bytecode of the artifact (the implementation for proxies).
    pub bytecode_hash: B256,
    /// Hash of the ABI-encoded constructor arguments, or of the initializer calldata
    /// for proxies. Unset on a proxy whose initializer has not gone through yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args_hash: Option<B256>,
    /// Unix timestamp of the deployment.
    pub deployed_at: i64,
}

impl DeploymentRecord {
    /// Whether the record was deployed from this exact build of the artifact with these arguments.
    pub fn matches(
        &self,
        artifact: ContractArtifact,
        bytecode_hash: B256,
        args_hash: B256,
    ) -> bool {
        self.artifact == artifact.name()
            && self.bytecode_hash == bytecode_hash
            && self.args_hash == Some(args_hash)
    }
}

/// Contracts deployed on one network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDeployments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub contracts: BTreeMap<String, DeploymentRecord>,
}

/// The manifest file contents: network name to deployments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Deref, DerefMut)]
#[serde(transparent)]
pub struct Networks(BTreeMap<String, NetworkDeployments>);

/// The deployment manifest bound to its file and to the current network.
#[derive(Debug, Clone)]
pub struct DeploymentManifest {
    path: PathBuf,
    network: String,
    networks: Networks,
}

impl DeploymentManifest {
    /// Load the manifest, starting empty when the file does not exist yet.
    pub fn load(path: impl Into<PathBuf>, network: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let network = network.into();

        let networks = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| {
                DeployError::ManifestIo {
                    path: path.clone(),
                    source,
                }
            })?;
            serde_json::from_str(&content).map_err(|source| DeployError::ManifestParse {
                path: path.clone(),
                source,
            })?
        } else {
            tracing::debug!(path = %path.display(), "No deployment manifest yet, starting empty");
            Networks::default()
        };

        Ok(Self {
            path,
            network,
            networks,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// Look up a deployment on the current network.
    pub fn get(&self, name: &str) -> Option<&DeploymentRecord> {
        self.networks
            .get(&self.network)
            .and_then(|deployments| deployments.contracts.get(name))
    }

    /// All deployments on the current network, sorted by name.
    pub fn deployments(&self) -> impl Iterator<Item = (&String, &DeploymentRecord)> {
        self.networks
            .get(&self.network)
            .into_iter()
            .flat_map(|deployments| deployments.contracts.iter())
    }

    /// Record a deployment on the current network and write the file.
    ///
    /// The in-memory manifest is only updated once the file is written.
    pub fn record(&mut self, name: &str, record: DeploymentRecord) -> Result<()> {
        let mut networks = self.networks.clone();
        networks
            .entry(self.network.clone())
            .or_default()
            .contracts
            .insert(name.to_string(), record);

        self.write(&networks)?;
        self.networks = networks;
        Ok(())
    }

    /// Remember the chain ID of the current network. Written with the next record.
    pub fn set_chain_id(&mut self, chain_id: u64) {
        self.networks.entry(self.network.clone()).or_default().chain_id = Some(chain_id);
    }

    /// Write `networks` to the manifest file as formatted JSON.
    fn write(&self, networks: &Networks) -> Result<()> {
        let io_err = |source| DeployError::ManifestIo {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(networks)
            .map_err(|e| io_err(e.into()))?;
        std::fs::write(&self.path, json).map_err(io_err)?;

        Ok(())
    }
}
