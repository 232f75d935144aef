//! collstake-deploy - Deployment library for the CollStaking contracts.
//!
//! This crate deploys the upgradeable `CollStakingManager` and, on test
//! networks, the mock tokens and reward contracts it depends on. Deployed
//! addresses are kept in a JSON manifest so that re-runs skip what is
//! already on chain.

pub mod artifacts;
pub use artifacts::{Artifact, ArtifactStore, ContractArtifact};

mod config;
pub use config::{
    AddressField, CONFIG_FILENAME, DEFAULT_ARTIFACTS_DIR, DEFAULT_OUTPUT_FILE, DEFAULT_RPC_URL,
    DeployConfig, ENV_PREFIX, NetworkConfig,
};

mod deployer;
pub use deployer::{Deployer, MANAGER_DEPENDENCIES, MANAGER_DEPLOYMENT, MANAGER_INITIALIZER};

mod environment;
pub use environment::{DeploymentReport, Environment, deploy_testnet_dependencies};

pub mod error;
pub use error::DeployError;

mod helper;
pub use helper::{
    DeployedContract, DeploymentHelper, IMPLEMENTATION_SUFFIX, PROXY_ADMIN_DEPLOYMENT,
    encode_call, encode_deploy_data,
};

pub mod manifest;
pub use manifest::{DeploymentManifest, DeploymentRecord};

pub mod network;
pub use network::{Network, TransactionReceipt, TransactionRequest};

pub mod rpc;
pub use rpc::RpcNetwork;
