//! Environment drivers: fill in the configuration, then run the [`Deployer`].

use alloy_core::dyn_abi::DynSolValue;

use crate::{
    AddressField, DeployConfig, Deployer,
    artifacts::ContractArtifact,
    deployer::MANAGER_DEPENDENCIES,
    error::Result,
    helper::{DeployedContract, DeploymentHelper},
    manifest::DeploymentManifest,
    network::Network,
};

/// The target environment of a deployment run.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Environment {
    /// Deploys mock tokens and reward contracts for every dependency not configured.
    #[default]
    Testnet,
    /// Uses the configured dependency addresses only.
    Mainnet,
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct DeploymentReport {
    /// The configuration with every dependency address filled in.
    pub config: DeployConfig,
    /// The manager proxy.
    pub manager: DeployedContract,
    /// The manifest as written at the end of the run.
    pub manifest: DeploymentManifest,
}

impl Environment {
    /// Run the full deployment for this environment.
    ///
    /// The first failing step aborts the run. Nothing deployed before it is rolled back.
    pub async fn deploy<N: Network>(
        self,
        mut config: DeployConfig,
        network: N,
    ) -> Result<DeploymentReport> {
        tracing::info!(
            environment = %self,
            network = %config.network.name,
            output_file = %config.output_file.display(),
            "Preparing deployment..."
        );

        let mut helper = DeploymentHelper::new(&config, network)?;

        match self {
            Self::Testnet => deploy_testnet_dependencies(&mut config, &mut helper).await?,
            Self::Mainnet => {
                // Fail before the first transaction
                for field in MANAGER_DEPENDENCIES {
                    config.require(field)?;
                }
            }
        }

        let mut deployer = Deployer::new(config, helper);
        let manager = deployer.run().await?;
        let (config, helper) = deployer.into_parts();

        Ok(DeploymentReport {
            config,
            manager,
            manifest: helper.manifest().clone(),
        })
    }
}

/// Deploy the mock dependencies missing from `config`, recording each address as it lands.
///
/// The treasury defaults to the signer.
pub async fn deploy_testnet_dependencies<N: Network>(
    config: &mut DeployConfig,
    helper: &mut DeploymentHelper<N>,
) -> Result<()> {
    let signer = helper.signer().await?;
    if config.treasury_address.is_none() {
        tracing::info!(treasury = %signer, "Using the signer as treasury");
        config.set_address(AddressField::TreasuryAddress, signer);
    }

    ensure_dependency(
        config,
        helper,
        AddressField::DpxToken,
        ContractArtifact::MockErc20,
        "DPX",
        vec![DynSolValue::String("DPX".into()), DynSolValue::String("DPX".into())],
    )
    .await?;

    ensure_dependency(
        config,
        helper,
        AddressField::GmxToken,
        ContractArtifact::MockErc20,
        "GMX",
        vec![DynSolValue::String("GMX".into()), DynSolValue::String("GMX".into())],
    )
    .await?;

    let dpx = config.require(AddressField::DpxToken)?;
    ensure_dependency(
        config,
        helper,
        AddressField::DpxStakingRewards,
        ContractArtifact::MockDpxStakingRewards,
        "DpxStakingRewards",
        vec![DynSolValue::Address(dpx)],
    )
    .await?;

    let gmx = config.require(AddressField::GmxToken)?;
    ensure_dependency(
        config,
        helper,
        AddressField::GmxRewardRouterV2,
        ContractArtifact::MockGmxRewardRouterV2,
        "GmxRewardRouterV2",
        vec![DynSolValue::Address(gmx)],
    )
    .await?;

    Ok(())
}

async fn ensure_dependency<N: Network>(
    config: &mut DeployConfig,
    helper: &mut DeploymentHelper<N>,
    field: AddressField,
    contract: ContractArtifact,
    deployment_name: &str,
    constructor_args: Vec<DynSolValue>,
) -> Result<()> {
    if let Some(address) = config.address(field) {
        tracing::info!(
            field = %field,
            address = %address,
            "Dependency already configured, skipping deployment"
        );
        return Ok(());
    }

    let deployed = helper
        .deploy_contract_by_name(contract, deployment_name, &constructor_args)
        .await?;
    config.set_address(field, deployed.address);

    Ok(())
}
