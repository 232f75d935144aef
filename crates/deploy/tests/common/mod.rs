//! Shared test infrastructure: an in-memory chain and Hardhat artifacts on disk.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use alloy_core::primitives::{Address, B256, Bytes, address, keccak256};
use collstake_deploy::{
    ArtifactStore, ContractArtifact, DeployConfig, DeployError, Network, TransactionReceipt,
    TransactionRequest, error::Result,
};
use serde_json::{Value, json};
use tempdir::TempDir;

/// First default Hardhat account.
pub const SIGNER: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
/// Second default Hardhat account.
pub const OTHER_ACCOUNT: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");

pub const CHAIN_ID: u64 = 31337;

type RevertPredicate = Box<dyn Fn(&TransactionRequest) -> bool + Send>;

#[derive(Default)]
struct ChainState {
    nonces: HashMap<Address, u64>,
    block_number: u64,
    code: HashMap<Address, Bytes>,
    sent: Vec<TransactionRequest>,
    receipts: HashMap<B256, TransactionReceipt>,
    revert_when: Option<RevertPredicate>,
    reject_at: Option<usize>,
}

/// An instant-mining chain where every account is unlocked.
///
/// Clones share the same state, so a test can keep a handle while the helper owns another.
#[derive(Clone, Default)]
pub struct MockNetwork {
    state: Arc<Mutex<ChainState>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every transaction submitted so far, including rejected ones.
    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().unwrap().sent.len()
    }

    /// Calls to existing contracts, in submission order.
    pub fn calls(&self) -> Vec<TransactionRequest> {
        self.sent().into_iter().filter(|tx| !tx.is_create()).collect()
    }

    /// Mine matching transactions with a failure status.
    pub fn revert_when(&self, predicate: impl Fn(&TransactionRequest) -> bool + Send + 'static) {
        self.state.lock().unwrap().revert_when = Some(Box::new(predicate));
    }

    pub fn stop_reverting(&self) {
        self.state.lock().unwrap().revert_when = None;
    }

    /// Refuse the transaction with the given submission index, as a node would on a bad nonce.
    pub fn reject_at(&self, index: usize) {
        self.state.lock().unwrap().reject_at = Some(index);
    }

    pub fn has_code(&self, address: Address) -> bool {
        self.state.lock().unwrap().code.contains_key(&address)
    }
}

impl Network for MockNetwork {
    async fn chain_id(&self) -> Result<u64> {
        Ok(CHAIN_ID)
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        Ok(vec![SIGNER, OTHER_ACCOUNT])
    }

    async fn code_at(&self, address: Address) -> Result<Bytes> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .code
            .get(&address)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256> {
        let mut state = self.state.lock().unwrap();
        let index = state.sent.len();
        state.sent.push(tx.clone());

        if state.reject_at == Some(index) {
            return Err(DeployError::TransactionRejected("nonce too low".to_string()));
        }

        let nonce = state.nonces.entry(tx.from).or_default();
        let tx_nonce = *nonce;
        *nonce += 1;
        state.block_number += 1;

        let tx_hash = keccak256((index as u64).to_be_bytes());
        let reverted = state.revert_when.as_ref().is_some_and(|revert| revert(&tx));

        let contract_address = if tx.is_create() && !reverted {
            let address = tx.from.create(tx_nonce);
            state.code.insert(address, Bytes::from_static(&[0x60, 0x80]));
            Some(address)
        } else {
            None
        };

        let receipt = TransactionReceipt {
            transaction_hash: tx_hash,
            block_number: state.block_number,
            contract_address,
            status: !reverted,
        };
        state.receipts.insert(tx_hash, receipt);

        Ok(tx_hash)
    }

    async fn wait_for_transaction(
        &self,
        tx_hash: B256,
        _confirmations: u64,
    ) -> Result<TransactionReceipt> {
        self.state
            .lock()
            .unwrap()
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| DeployError::Rpc(format!("unknown transaction {tx_hash}")))
    }
}

/// Address of the `n`-th contract created by [`SIGNER`] on a fresh chain.
pub fn created(nonce: u64) -> Address {
    SIGNER.create(nonce)
}

fn constructor(inputs: &[(&str, &str)]) -> Value {
    json!({
        "type": "constructor",
        "stateMutability": "nonpayable",
        "inputs": inputs
            .iter()
            .map(|(name, ty)| json!({ "name": name, "type": ty, "internalType": ty }))
            .collect::<Vec<_>>(),
    })
}

fn hardhat_artifact(contract: ContractArtifact, abi: Vec<Value>, bytecode: &str) -> String {
    serde_json::to_string_pretty(&json!({
        "_format": "hh-sol-artifact-1",
        "contractName": contract.name(),
        "sourceName": format!("contracts/{}.sol", contract.name()),
        "abi": abi,
        "bytecode": bytecode,
        "deployedBytecode": "0x6080",
        "linkReferences": {},
        "deployedLinkReferences": {}
    }))
    .unwrap()
}

fn manager_abi() -> Vec<Value> {
    vec![json!({
        "type": "function",
        "name": "setUp",
        "stateMutability": "nonpayable",
        "inputs": [
            { "name": "_treasury", "type": "address", "internalType": "address" },
            { "name": "_dpx", "type": "address", "internalType": "address" },
            { "name": "_gmx", "type": "address", "internalType": "address" },
            { "name": "_dpxStakingRewards", "type": "address", "internalType": "address" },
            { "name": "_gmxRewardRouterV2", "type": "address", "internalType": "address" }
        ],
        "outputs": []
    })]
}

/// Write a Hardhat-style artifact for `contract` under `root`.
pub fn write_artifact(root: &Path, contract: ContractArtifact, bytecode: &str) {
    let abi = match contract {
        ContractArtifact::MockErc20 => {
            vec![constructor(&[("name_", "string"), ("symbol_", "string")])]
        }
        ContractArtifact::MockDpxStakingRewards => vec![constructor(&[("_dpx", "address")])],
        ContractArtifact::MockGmxRewardRouterV2 => vec![constructor(&[("_gmx", "address")])],
        ContractArtifact::CollStakingManager => manager_abi(),
        ContractArtifact::ProxyAdmin => vec![constructor(&[("initialOwner", "address")])],
        ContractArtifact::TransparentUpgradeableProxy => vec![constructor(&[
            ("_logic", "address"),
            ("admin_", "address"),
            ("_data", "bytes"),
        ])],
    };

    let dir = root
        .join("contracts")
        .join(format!("{}.sol", contract.name()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join(format!("{}.dbg.json", contract.name())),
        r#"{ "_format": "hh-sol-dbg-1", "buildInfo": "../../build-info/0.json" }"#,
    )
    .unwrap();
    std::fs::write(
        dir.join(format!("{}.json", contract.name())),
        hardhat_artifact(contract, abi, bytecode),
    )
    .unwrap();
}

/// Distinct creation bytecode per contract.
pub fn bytecode_of(contract: ContractArtifact) -> &'static str {
    match contract {
        ContractArtifact::MockErc20 => "0x608060405201",
        ContractArtifact::MockDpxStakingRewards => "0x608060405202",
        ContractArtifact::MockGmxRewardRouterV2 => "0x608060405203",
        ContractArtifact::CollStakingManager => "0x608060405204",
        ContractArtifact::ProxyAdmin => "0x608060405205",
        ContractArtifact::TransparentUpgradeableProxy => "0x608060405206",
    }
}

/// Write every registered artifact under `root`.
pub fn write_all_artifacts(root: &Path) {
    use strum::IntoEnumIterator;

    for contract in ContractArtifact::iter() {
        write_artifact(root, contract, bytecode_of(contract));
    }
}

/// Initialize tracing for tests (idempotent).
pub fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init()
        .ok();
}

/// A scratch directory holding artifacts and the manifest, plus a shared mock chain.
pub struct TestContext {
    pub temp_dir: TempDir,
    pub network: MockNetwork,
}

impl TestContext {
    pub fn new(prefix: &str) -> Self {
        init_test_tracing();

        let temp_dir = TempDir::new(prefix).unwrap();
        write_all_artifacts(&temp_dir.path().join("artifacts"));

        Self {
            temp_dir,
            network: MockNetwork::new(),
        }
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.temp_dir.path().join("artifacts")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.temp_dir.path().join("testnet_deployments.json")
    }

    /// An empty configuration pointing at this context's files.
    pub fn config(&self) -> DeployConfig {
        DeployConfig {
            output_file: self.manifest_path(),
            artifacts_dir: self.artifacts_dir(),
            ..Default::default()
        }
    }

    pub fn artifacts(&self) -> ArtifactStore {
        ArtifactStore::new(self.artifacts_dir())
    }

    /// The manifest file as raw JSON.
    pub fn manifest_json(&self) -> Value {
        serde_json::from_str(&std::fs::read_to_string(self.manifest_path()).unwrap()).unwrap()
    }
}
