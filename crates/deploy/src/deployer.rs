//! Orchestration of the CollStaking deployment.

use alloy_core::dyn_abi::DynSolValue;

use crate::{
    AddressField, DeployConfig,
    artifacts::ContractArtifact,
    error::Result,
    helper::{DeployedContract, DeploymentHelper},
    network::Network,
};

/// Manifest name of the manager proxy.
pub const MANAGER_DEPLOYMENT: &str = "CollStakingManager";

/// Initializer of the manager, called through the proxy once it is deployed.
pub const MANAGER_INITIALIZER: &str = "setUp";

/// Addresses passed to the manager initializer, in argument order.
pub const MANAGER_DEPENDENCIES: [AddressField; 5] = [
    AddressField::TreasuryAddress,
    AddressField::DpxToken,
    AddressField::GmxToken,
    AddressField::DpxStakingRewards,
    AddressField::GmxRewardRouterV2,
];

/// Deploys the upgradeable `CollStakingManager` wired to its dependencies.
///
/// The configuration must hold every dependency address before [`Deployer::run`]
/// is called. Environment drivers take care of filling it in.
pub struct Deployer<N> {
    config: DeployConfig,
    helper: DeploymentHelper<N>,
}

impl<N: Network> Deployer<N> {
    pub fn new(config: DeployConfig, helper: DeploymentHelper<N>) -> Self {
        Self { config, helper }
    }

    /// Give back the configuration and the helper, to inspect the manifest after a run.
    pub fn into_parts(self) -> (DeployConfig, DeploymentHelper<N>) {
        (self.config, self.helper)
    }

    /// Deploy and initialize the manager.
    pub async fn run(&mut self) -> Result<DeployedContract> {
        tracing::info!("Starting CollStaking deployment...");

        let signer = self.helper.signer().await?;

        let args = MANAGER_DEPENDENCIES
            .iter()
            .map(|field| self.config.require(*field).map(DynSolValue::Address))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            signer = %signer,
            treasury = ?self.config.treasury_address,
            dpx_token = ?self.config.dpx_token,
            gmx_token = ?self.config.gmx_token,
            dpx_staking_rewards = ?self.config.dpx_staking_rewards,
            gmx_reward_router_v2 = ?self.config.gmx_reward_router_v2,
            "Deploying CollStakingManager..."
        );

        let manager = self
            .helper
            .deploy_upgradeable_contract_with_name(
                ContractArtifact::CollStakingManager,
                MANAGER_DEPLOYMENT,
                MANAGER_INITIALIZER,
                &args,
            )
            .await?;

        tracing::info!(
            proxy = %manager.address,
            implementation = ?manager.implementation,
            "✓ CollStaking deployment complete!"
        );

        Ok(manager)
    }
}
