//! Errors raised while deploying contracts.

use std::{path::PathBuf, time::Duration};

use alloy_core::primitives::{Address, B256};

/// Everything that can go wrong during a deployment run.
///
/// None of these are recovered locally: they bubble up to the entry point,
/// which logs them and exits with a non-zero status.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The name does not belong to the artifact registry.
    #[error("unknown contract artifact: {0}")]
    UnknownArtifact(String),

    /// No compiled artifact file was found for a registered contract.
    #[error("artifact {artifact} not found under {}", root.display())]
    ArtifactNotFound { artifact: String, root: PathBuf },

    /// The artifact file exists but could not be used.
    #[error("failed to parse artifact {}: {reason}", path.display())]
    ArtifactParse { path: PathBuf, reason: String },

    /// Constructor or function arguments do not match the ABI.
    #[error("failed to encode arguments for {context}: {reason}")]
    Encoding { context: String, reason: String },

    /// The ABI has no function with the given name and arity.
    #[error("{artifact} has no function {function} taking {arity} argument(s)")]
    MissingFunction {
        artifact: String,
        function: String,
        arity: usize,
    },

    /// A dependency address was used before it was set.
    #[error("configuration is missing the {0} address")]
    MissingAddress(&'static str),

    /// The node exposes no account at the configured signer index.
    #[error("no signer available at index {0}")]
    NoSigner(usize),

    /// Transport or JSON-RPC failure.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The node refused the transaction (bad nonce, insufficient funds, ...).
    #[error("transaction rejected by the network: {0}")]
    TransactionRejected(String),

    /// The transaction was mined with a failure status.
    #[error("transaction {tx_hash} for {deployment} reverted")]
    TransactionReverted { deployment: String, tx_hash: B256 },

    /// The transaction did not reach the required depth in time.
    #[error("timed out after {waited:?} waiting for {confirmations} confirmation(s) of {tx_hash}")]
    ConfirmationTimeout {
        tx_hash: B256,
        confirmations: u64,
        waited: Duration,
    },

    /// A creation receipt came back without a contract address.
    #[error("receipt of {0} carries no contract address")]
    MissingContractAddress(B256),

    /// The proxy is deployed but its initializer call reverted.
    #[error("initializer of {deployment} reverted (proxy {proxy} left uninitialized, tx {tx_hash})")]
    InitializerReverted {
        deployment: String,
        proxy: Address,
        tx_hash: B256,
    },

    /// Reading or writing the deployment manifest failed.
    #[error("manifest I/O error at {}: {source}", path.display())]
    ManifestIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest file is not valid JSON.
    #[error("failed to parse manifest {}: {source}", path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl DeployError {
    /// Whether the contract artifact could not be resolved.
    pub fn is_artifact_resolution(&self) -> bool {
        matches!(
            self,
            Self::UnknownArtifact(_) | Self::ArtifactNotFound { .. } | Self::ArtifactParse { .. }
        )
    }
}

pub type Result<T, E = DeployError> = std::result::Result<T, E>;
