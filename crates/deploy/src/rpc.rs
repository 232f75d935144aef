//! [`Network`] implementation over Ethereum JSON-RPC.

use std::time::{Duration, Instant};

use alloy_core::primitives::{Address, B256, Bytes, U64};
use anyhow::Context;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use crate::{
    DeployError, NetworkConfig,
    error::Result,
    network::{Network, TransactionReceipt, TransactionRequest},
};

/// An error object returned by the node in place of a result.
#[derive(Debug, Clone, thiserror::Error)]
#[error("RPC error {code}: {message}")]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client(timeout: Duration) -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// Error responses from the node surface as a [`JsonRpcError`] inside the
/// returned `anyhow::Error`, so callers can tell them apart from transport failures.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &Url,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url.clone())
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    if let Some(error) = result.get("error") {
        return Err(JsonRpcError {
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        }
        .into());
    }

    let result_value = result
        .get("result")
        .context("No result in response")?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// Receipt fields as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: B256,
    block_number: U64,
    contract_address: Option<Address>,
    /// Absent on pre-Byzantium chains, where a mined transaction is a success.
    status: Option<U64>,
}

impl From<RpcReceipt> for TransactionReceipt {
    fn from(receipt: RpcReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number.to(),
            contract_address: receipt.contract_address,
            status: receipt.status.is_none_or(|s| s == U64::from(1)),
        }
    }
}

/// Returns true once a transaction mined in `mined_at` is buried deep enough.
///
/// The block holding the transaction counts as the first confirmation.
fn is_confirmed(mined_at: u64, head: u64, confirmations: u64) -> bool {
    confirmations <= 1 || head.saturating_add(1) >= mined_at.saturating_add(confirmations)
}

/// A node reachable over HTTP JSON-RPC that signs with its own accounts
/// (`eth_accounts` / `eth_sendTransaction`), like Hardhat or Anvil.
#[derive(Debug, Clone)]
pub struct RpcNetwork {
    client: reqwest::Client,
    url: Url,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl RpcNetwork {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let client = create_client(Duration::from_secs(config.request_timeout_secs))
            .map_err(|e| DeployError::Rpc(format!("{e:#}")))?;

        Ok(Self {
            client,
            url: config.rpc_url.clone(),
            confirmation_timeout: Duration::from_secs(config.confirmation_timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T> {
        json_rpc_call(&self.client, &self.url, method, params)
            .await
            .map_err(|e| DeployError::Rpc(format!("{e:#}")))
    }

    async fn receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>> {
        let receipt: Option<RpcReceipt> = self
            .call("eth_getTransactionReceipt", vec![serde_json::json!(tx_hash)])
            .await?;
        Ok(receipt.map(Into::into))
    }

    async fn block_number(&self) -> Result<u64> {
        let number: U64 = self.call("eth_blockNumber", vec![]).await?;
        Ok(number.to())
    }
}

impl Network for RpcNetwork {
    async fn chain_id(&self) -> Result<u64> {
        let chain_id: U64 = self.call("eth_chainId", vec![]).await?;
        Ok(chain_id.to())
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        self.call("eth_accounts", vec![]).await
    }

    async fn code_at(&self, address: Address) -> Result<Bytes> {
        self.call(
            "eth_getCode",
            vec![serde_json::json!(address), serde_json::json!("latest")],
        )
        .await
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256> {
        let params = vec![serde_json::to_value(&tx).map_err(|e| DeployError::Rpc(e.to_string()))?];

        json_rpc_call(&self.client, &self.url, "eth_sendTransaction", params)
            .await
            .map_err(|e| match e.downcast_ref::<JsonRpcError>() {
                Some(rpc_error) => DeployError::TransactionRejected(rpc_error.message.clone()),
                None => DeployError::Rpc(format!("{e:#}")),
            })
    }

    async fn wait_for_transaction(
        &self,
        tx_hash: B256,
        confirmations: u64,
    ) -> Result<TransactionReceipt> {
        let start = Instant::now();

        loop {
            if let Some(receipt) = self.receipt(tx_hash).await? {
                // A reverted transaction will not get any better with depth
                if !receipt.status {
                    return Ok(receipt);
                }

                let head = self.block_number().await?;
                if is_confirmed(receipt.block_number, head, confirmations) {
                    tracing::debug!(
                        tx_hash = %tx_hash,
                        block_number = receipt.block_number,
                        head,
                        "Transaction confirmed"
                    );
                    return Ok(receipt);
                }

                tracing::trace!(tx_hash = %tx_hash, head, "Waiting for confirmations...");
            } else {
                tracing::trace!(tx_hash = %tx_hash, "Transaction not mined yet, retrying...");
            }

            if start.elapsed() > self.confirmation_timeout {
                return Err(DeployError::ConfirmationTimeout {
                    tx_hash,
                    confirmations,
                    waited: start.elapsed(),
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
