//! Deploys contracts from artifacts and records them in the manifest.

use alloy_core::{
    dyn_abi::{DynSolValue, JsonAbiExt},
    json_abi::JsonAbi,
    primitives::{Address, B256, Bytes, keccak256},
};

use crate::{
    DeployConfig, DeployError,
    artifacts::{Artifact, ArtifactStore, ContractArtifact},
    error::Result,
    manifest::{DeploymentManifest, DeploymentRecord},
    network::{Network, TransactionReceipt, TransactionRequest},
};

/// Manifest name of the proxy admin shared by every upgradeable deployment.
pub const PROXY_ADMIN_DEPLOYMENT: &str = "DefaultProxyAdmin";

/// Suffix of the manifest name of a proxy's logic contract.
pub const IMPLEMENTATION_SUFFIX: &str = "_Implementation";

/// Handle to a deployed contract.
#[derive(Debug, Clone)]
pub struct DeployedContract {
    /// Deployment name in the manifest.
    pub name: String,
    pub artifact: ContractArtifact,
    /// Address to interact with. For upgradeable deployments this is the proxy.
    pub address: Address,
    /// Interface of the contract (of the implementation, behind a proxy).
    pub abi: JsonAbi,
    pub implementation: Option<Address>,
    pub admin: Option<Address>,
    /// Hash of the deployment transaction.
    pub tx_hash: B256,
    /// True when the deployment was found in the manifest instead of being sent.
    pub reused: bool,
}

impl DeployedContract {
    fn from_record(name: &str, artifact: &Artifact, record: &DeploymentRecord, reused: bool) -> Self {
        Self {
            name: name.to_string(),
            artifact: artifact.contract,
            address: record.address,
            abi: artifact.abi.clone(),
            implementation: record.implementation,
            admin: record.admin,
            tx_hash: record.tx_hash,
            reused,
        }
    }
}

/// Sequential contract deployment on top of a [`Network`].
///
/// Every transaction is awaited through its confirmations before the next one
/// is sent, so transactions from the signer are mined in call order.
pub struct DeploymentHelper<N> {
    network: N,
    artifacts: ArtifactStore,
    manifest: DeploymentManifest,
    confirmations: u64,
    signer_index: usize,
    redeploy: bool,
    signer: Option<Address>,
}

impl<N: Network> DeploymentHelper<N> {
    /// Create a helper, loading the existing manifest from `config.output_file`.
    pub fn new(config: &DeployConfig, network: N) -> Result<Self> {
        let manifest = DeploymentManifest::load(&config.output_file, &config.network.name)?;

        Ok(Self {
            network,
            artifacts: ArtifactStore::new(&config.artifacts_dir),
            manifest,
            confirmations: config.tx_confirmations,
            signer_index: config.signer_index,
            redeploy: config.redeploy,
            signer: None,
        })
    }

    pub fn manifest(&self) -> &DeploymentManifest {
        &self.manifest
    }

    /// The account signing every transaction, resolved once from the node.
    pub async fn signer(&mut self) -> Result<Address> {
        if let Some(signer) = self.signer {
            return Ok(signer);
        }

        let accounts = self.network.accounts().await?;
        let signer = *accounts
            .get(self.signer_index)
            .ok_or(DeployError::NoSigner(self.signer_index))?;

        let chain_id = self.network.chain_id().await?;
        self.manifest.set_chain_id(chain_id);

        tracing::info!(
            signer = %signer,
            chain_id,
            network = self.manifest.network(),
            "Resolved deployer account"
        );

        self.signer = Some(signer);
        Ok(signer)
    }

    /// Deploy `contract` with the given constructor arguments and record it as `deployment_name`.
    ///
    /// An existing deployment of the same build with the same arguments is
    /// reused unless redeploying.
    pub async fn deploy_contract_by_name(
        &mut self,
        contract: ContractArtifact,
        deployment_name: &str,
        constructor_args: &[DynSolValue],
    ) -> Result<DeployedContract> {
        let artifact = self.artifacts.get(contract)?.clone();
        let bytecode_hash = artifact.bytecode_hash();
        let encoded_args = encode_constructor_args(&artifact, constructor_args)?;
        let args_hash = keccak256(&encoded_args);

        if let Some(record) = self
            .reusable(deployment_name, |r| r.matches(contract, bytecode_hash, args_hash))
            .await?
        {
            tracing::info!(
                deployment = deployment_name,
                address = %record.address,
                "Reusing existing deployment"
            );
            return Ok(DeployedContract::from_record(deployment_name, &artifact, &record, true));
        }

        let mut data = artifact.bytecode.to_vec();
        data.extend_from_slice(&encoded_args);

        tracing::info!(
            deployment = deployment_name,
            artifact = %contract,
            args = constructor_args.len(),
            "Deploying contract..."
        );

        let (address, tx_hash) = self.create(deployment_name, data.into()).await?;

        let record = DeploymentRecord {
            artifact: contract.name().to_string(),
            address,
            implementation: None,
            admin: None,
            initialized: None,
            tx_hash,
            bytecode_hash,
            args_hash: Some(args_hash),
            deployed_at: chrono::Utc::now().timestamp(),
        };
        self.manifest.record(deployment_name, record.clone())?;

        tracing::info!(
            deployment = deployment_name,
            address = %address,
            tx_hash = %tx_hash,
            "Contract deployed"
        );

        Ok(DeployedContract::from_record(deployment_name, &artifact, &record, false))
    }

    /// Deploy `contract` behind a transparent proxy and call `initializer` on it.
    ///
    /// The logic contract is recorded as `<deployment_name>_Implementation` and
    /// the proxy as `deployment_name`. The initializer runs as its own
    /// transaction: if it reverts the proxy stays deployed, recorded as
    /// uninitialized, and the next run only retries the initializer.
    ///
    /// A proxy initialized with other arguments cannot be initialized again, so
    /// a new proxy is deployed in front of the same implementation.
    pub async fn deploy_upgradeable_contract_with_name(
        &mut self,
        contract: ContractArtifact,
        deployment_name: &str,
        initializer: &str,
        initializer_args: &[DynSolValue],
    ) -> Result<DeployedContract> {
        let artifact = self.artifacts.get(contract)?.clone();
        // Fail on bad arguments before anything is sent
        let init_data = encode_call(&artifact, initializer, initializer_args)?;
        let init_hash = keccak256(&init_data);
        let bytecode_hash = artifact.bytecode_hash();

        let existing = self
            .reusable(deployment_name, |r| {
                r.artifact == contract.name() && r.implementation.is_some()
            })
            .await?;

        let mut record = match existing {
            Some(record)
                if record.initialized == Some(true) && record.args_hash == Some(init_hash) =>
            {
                if record.bytecode_hash != bytecode_hash {
                    tracing::warn!(
                        deployment = deployment_name,
                        proxy = %record.address,
                        "Implementation changed since the proxy was deployed; upgrades are not handled, keeping the existing proxy"
                    );
                }
                tracing::info!(
                    deployment = deployment_name,
                    proxy = %record.address,
                    "Reusing existing upgradeable deployment"
                );
                return Ok(DeployedContract::from_record(deployment_name, &artifact, &record, true));
            }
            Some(record) if record.initialized == Some(true) => {
                tracing::warn!(
                    deployment = deployment_name,
                    proxy = %record.address,
                    "Proxy was initialized with other arguments, deploying a new proxy"
                );
                self.deploy_proxy(contract, deployment_name, bytecode_hash).await?
            }
            Some(record) => {
                tracing::warn!(
                    deployment = deployment_name,
                    proxy = %record.address,
                    "Found an uninitialized proxy from a previous run, retrying initializer"
                );
                record
            }
            None => self.deploy_proxy(contract, deployment_name, bytecode_hash).await?,
        };

        let from = self.signer().await?;
        tracing::info!(
            deployment = deployment_name,
            proxy = %record.address,
            initializer,
            args = initializer_args.len(),
            "Initializing proxy..."
        );

        let receipt = self
            .send_and_confirm(TransactionRequest::call(from, record.address, init_data))
            .await?;
        if !receipt.status {
            return Err(DeployError::InitializerReverted {
                deployment: deployment_name.to_string(),
                proxy: record.address,
                tx_hash: receipt.transaction_hash,
            });
        }

        record.initialized = Some(true);
        record.args_hash = Some(init_hash);
        self.manifest.record(deployment_name, record.clone())?;

        tracing::info!(
            deployment = deployment_name,
            proxy = %record.address,
            implementation = ?record.implementation,
            admin = ?record.admin,
            "Upgradeable contract deployed and initialized"
        );

        Ok(DeployedContract::from_record(deployment_name, &artifact, &record, false))
    }

    /// Deploy the logic contract and its proxy, recording the proxy as uninitialized.
    async fn deploy_proxy(
        &mut self,
        contract: ContractArtifact,
        deployment_name: &str,
        bytecode_hash: B256,
    ) -> Result<DeploymentRecord> {
        let implementation_name = format!("{deployment_name}{IMPLEMENTATION_SUFFIX}");
        let implementation = self
            .deploy_contract_by_name(contract, &implementation_name, &[])
            .await?;
        let admin = self.proxy_admin().await?;

        let proxy_artifact = self
            .artifacts
            .get(ContractArtifact::TransparentUpgradeableProxy)?
            .clone();
        let data = encode_deploy_data(
            &proxy_artifact,
            &[
                DynSolValue::Address(implementation.address),
                DynSolValue::Address(admin),
                DynSolValue::Bytes(Vec::new()),
            ],
        )?;

        tracing::info!(
            deployment = deployment_name,
            implementation = %implementation.address,
            admin = %admin,
            "Deploying proxy..."
        );

        let (proxy, tx_hash) = self.create(deployment_name, data).await?;

        let record = DeploymentRecord {
            artifact: contract.name().to_string(),
            address: proxy,
            implementation: Some(implementation.address),
            admin: Some(admin),
            initialized: Some(false),
            tx_hash,
            bytecode_hash,
            args_hash: None,
            deployed_at: chrono::Utc::now().timestamp(),
        };
        self.manifest.record(deployment_name, record.clone())?;

        Ok(record)
    }

    /// The proxy admin shared by all proxies on this network, deployed on first use.
    async fn proxy_admin(&mut self) -> Result<Address> {
        let artifact = self.artifacts.get(ContractArtifact::ProxyAdmin)?.clone();

        // OpenZeppelin v5 takes the initial owner, v4 uses the sender
        let args = match artifact.abi.constructor() {
            Some(constructor) if constructor.inputs.len() == 1 => {
                vec![DynSolValue::Address(self.signer().await?)]
            }
            _ => Vec::new(),
        };

        let admin = self
            .deploy_contract_by_name(ContractArtifact::ProxyAdmin, PROXY_ADMIN_DEPLOYMENT, &args)
            .await?;
        Ok(admin.address)
    }

    /// Find a recorded deployment that can be reused as is.
    async fn reusable(
        &self,
        deployment_name: &str,
        accept: impl Fn(&DeploymentRecord) -> bool,
    ) -> Result<Option<DeploymentRecord>> {
        if self.redeploy {
            return Ok(None);
        }

        let Some(record) = self.manifest.get(deployment_name).filter(|r| accept(*r)).cloned()
        else {
            return Ok(None);
        };

        // The chain may have been reset since the manifest was written
        if self.network.code_at(record.address).await?.is_empty() {
            tracing::warn!(
                deployment = deployment_name,
                address = %record.address,
                "Recorded deployment has no code on chain, deploying again"
            );
            return Ok(None);
        }

        Ok(Some(record))
    }

    /// Send a contract creation and return the new contract address.
    async fn create(&mut self, deployment_name: &str, data: Bytes) -> Result<(Address, B256)> {
        let from = self.signer().await?;
        let receipt = self
            .send_and_confirm(TransactionRequest::create(from, data))
            .await?;

        if !receipt.status {
            return Err(DeployError::TransactionReverted {
                deployment: deployment_name.to_string(),
                tx_hash: receipt.transaction_hash,
            });
        }

        let address = receipt
            .contract_address
            .ok_or(DeployError::MissingContractAddress(receipt.transaction_hash))?;
        Ok((address, receipt.transaction_hash))
    }

    async fn send_and_confirm(&self, tx: TransactionRequest) -> Result<TransactionReceipt> {
        let tx_hash = self.network.send_transaction(tx).await?;
        tracing::debug!(
            tx_hash = %tx_hash,
            confirmations = self.confirmations,
            "Transaction sent, waiting for confirmations..."
        );
        self.network
            .wait_for_transaction(tx_hash, self.confirmations)
            .await
    }
}

/// Creation bytecode followed by the ABI-encoded constructor arguments.
pub fn encode_deploy_data(artifact: &Artifact, args: &[DynSolValue]) -> Result<Bytes> {
    let mut data = artifact.bytecode.to_vec();
    data.extend_from_slice(&encode_constructor_args(artifact, args)?);
    Ok(data.into())
}

fn encode_constructor_args(artifact: &Artifact, args: &[DynSolValue]) -> Result<Vec<u8>> {
    let encoding_err = |reason: String| DeployError::Encoding {
        context: format!("{} constructor", artifact.contract),
        reason,
    };

    match artifact.abi.constructor() {
        Some(constructor) => constructor
            .abi_encode_input(args)
            .map_err(|e| encoding_err(e.to_string())),
        None if args.is_empty() => Ok(Vec::new()),
        None => Err(encoding_err(format!(
            "no constructor in ABI but {} argument(s) given",
            args.len()
        ))),
    }
}

/// Selector and ABI-encoded arguments of a call to `function`.
///
/// Overloads are told apart by arity, then by whether the arguments type-check.
pub fn encode_call(artifact: &Artifact, function: &str, args: &[DynSolValue]) -> Result<Bytes> {
    let mut last_error = None;

    for candidate in artifact
        .abi
        .function(function)
        .into_iter()
        .flatten()
        .filter(|f| f.inputs.len() == args.len())
    {
        match candidate.abi_encode_input(args) {
            Ok(data) => return Ok(data.into()),
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    Err(match last_error {
        Some(reason) => DeployError::Encoding {
            context: format!("{}.{}", artifact.contract, function),
            reason,
        },
        None => DeployError::MissingFunction {
            artifact: artifact.contract.to_string(),
            function: function.to_string(),
            arity: args.len(),
        },
    })
}
