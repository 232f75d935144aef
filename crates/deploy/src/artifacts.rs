//! Typed registry of the contracts this tool knows how to deploy.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy_core::{
    json_abi::JsonAbi,
    primitives::{B256, Bytes, keccak256},
};
use serde::Deserialize;

use crate::{DeployError, error::Result};

/// Compiled contracts that can be deployed.
///
/// The string form is the Hardhat contract name, which is also the artifact file stem.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
pub enum ContractArtifact {
    #[strum(serialize = "MockERC20")]
    MockErc20,
    MockDpxStakingRewards,
    MockGmxRewardRouterV2,
    CollStakingManager,
    ProxyAdmin,
    TransparentUpgradeableProxy,
}

impl ContractArtifact {
    /// Resolve a contract name, failing for anything outside the registry.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::from_str(name).map_err(|_| DeployError::UnknownArtifact(name.to_string()))
    }

    /// The Hardhat contract name.
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// The subset of a Hardhat artifact file needed for deployment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    abi: JsonAbi,
    bytecode: Bytes,
}

/// A resolved contract artifact.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub contract: ContractArtifact,
    pub path: PathBuf,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

impl Artifact {
    /// Hash of the creation bytecode, used to detect recompiled contracts.
    pub fn bytecode_hash(&self) -> B256 {
        keccak256(&self.bytecode)
    }
}

/// Loads and caches artifacts from a Hardhat `artifacts/` directory.
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    cache: HashMap<ContractArtifact, Artifact>,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    /// Resolve the artifact of a registered contract.
    pub fn get(&mut self, contract: ContractArtifact) -> Result<&Artifact> {
        if !self.cache.contains_key(&contract) {
            let artifact = self.load(contract)?;
            self.cache.insert(contract, artifact);
        }

        Ok(&self.cache[&contract])
    }

    fn load(&self, contract: ContractArtifact) -> Result<Artifact> {
        let file_name = format!("{}.json", contract.name());
        let path = find_file(&self.root, &file_name).ok_or_else(|| {
            DeployError::ArtifactNotFound {
                artifact: contract.to_string(),
                root: self.root.clone(),
            }
        })?;

        let parse_err = |reason: String| DeployError::ArtifactParse {
            path: path.clone(),
            reason,
        };

        let content = std::fs::read_to_string(&path).map_err(|e| parse_err(e.to_string()))?;
        let HardhatArtifact { abi, bytecode } =
            serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?;

        // Interfaces and abstract contracts compile to empty bytecode
        if bytecode.is_empty() {
            return Err(parse_err("artifact has no creation bytecode".to_string()));
        }

        tracing::debug!(artifact = %contract, path = %path.display(), "Loaded artifact");

        Ok(Artifact {
            contract,
            path,
            abi,
            bytecode,
        })
    }
}

/// Depth-first search for `file_name` under `dir`.
///
/// Hardhat nests artifacts as `contracts/<Source>.sol/<Name>.json`, next to a
/// `<Name>.dbg.json` debug file that never matches an exact name.
fn find_file(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    if let Some(found) = entries
        .iter()
        .find(|p| p.is_file() && p.file_name().is_some_and(|n| n == file_name))
    {
        return Some(found.clone());
    }

    entries
        .iter()
        .filter(|p| p.is_dir())
        .find_map(|p| find_file(p, file_name))
}
