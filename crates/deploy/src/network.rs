//! Boundary with the blockchain node.

use std::future::Future;

use alloy_core::primitives::{Address, B256, Bytes};
use serde::Serialize;

use crate::error::Result;

/// A transaction to be signed by a node-managed account.
///
/// A request without `to` is a contract creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRequest {
    pub from: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(rename = "data")]
    pub input: Bytes,
}

impl TransactionRequest {
    /// A contract creation carrying bytecode and encoded constructor arguments.
    pub fn create(from: Address, input: Bytes) -> Self {
        Self {
            from,
            to: None,
            input,
        }
    }

    /// A call to an existing contract.
    pub fn call(from: Address, to: Address, input: Bytes) -> Self {
        Self {
            from,
            to: Some(to),
            input,
        }
    }

    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }
}

/// The outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    /// Set for contract creations.
    pub contract_address: Option<Address>,
    /// False when the transaction reverted.
    pub status: bool,
}

/// The operations a deployment needs from the network.
///
/// Implementations must submit transactions in call order: the helper never
/// sends a transaction before the previous one is confirmed.
pub trait Network: Send + Sync {
    /// The chain ID reported by the node.
    fn chain_id(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Accounts the node can sign for, in the node's order.
    fn accounts(&self) -> impl Future<Output = Result<Vec<Address>>> + Send;

    /// Runtime code at an address. Empty when nothing is deployed there.
    fn code_at(&self, address: Address) -> impl Future<Output = Result<Bytes>> + Send;

    /// Submit a transaction, returning its hash.
    fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> impl Future<Output = Result<B256>> + Send;

    /// Wait until the transaction is mined and buried under `confirmations` blocks.
    ///
    /// Reverted transactions are returned with `status == false`, not as errors.
    fn wait_for_transaction(
        &self,
        tx_hash: B256,
        confirmations: u64,
    ) -> impl Future<Output = Result<TransactionReceipt>> + Send;
}
