//! Chain provider for interacting with the source chain over JSON-RPC.
//!
//! Wraps an alloy HTTP provider. Every call is bounded by the configured
//! request timeout; a timeout is surfaced as [`ProviderError::Timeout`] and
//! treated by callers as a transient failure for the next cycle.

use std::time::Duration;

use alloy::{
    primitives::{Address, Bytes, TxKind},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::{
        client::ClientBuilder,
        types::{TransactionInput, TransactionRequest},
    },
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use reqwest::ClientBuilder as ReqwestClientBuilder;
use tokio::time::timeout;

use crate::models::{ChainTransactionStatus, ProviderError, RawChainEvent};

#[cfg(test)]
use mockall::automock;

/// Interface for chain interactions used by the execution engine, the
/// reconciliation loop and the treasury monitor.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChainProviderTrait: Send + Sync {
    /// Current account nonce, counting confirmed and pool-pending
    /// transactions.
    async fn get_transaction_count(&self, address: Address) -> Result<u64, ProviderError>;

    /// Estimates gas for an unsigned transaction. Insufficient-funds style
    /// failures come back as [`ProviderError::InsufficientGas`].
    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, ProviderError>;

    async fn get_gas_price(&self) -> Result<u128, ProviderError>;

    /// Submits a batch of raw signed transactions. Returns the hashes the
    /// node accepted; a missing hash means that transaction was not sent
    /// (partial batch failure). `Err` means the submission failed outright
    /// and no per-item outcome is known.
    async fn send_raw_transactions(
        &self,
        raw_txs: Vec<Bytes>,
    ) -> Result<Vec<String>, ProviderError>;

    async fn get_transaction_status(
        &self,
        tx_hash: &str,
    ) -> Result<ChainTransactionStatus, ProviderError>;

    /// Logs emitted by a confirmed transaction, in raw form for the
    /// classifier.
    async fn get_transaction_logs(
        &self,
        tx_hash: &str,
    ) -> Result<Vec<RawChainEvent>, ProviderError>;

    async fn get_balance(&self, address: Address) -> Result<alloy::primitives::U256, ProviderError>;

    /// ERC20-style balance of `address` at `token`.
    async fn get_token_balance(
        &self,
        address: Address,
        token: Address,
    ) -> Result<alloy::primitives::U256, ProviderError>;
}

/// HTTP JSON-RPC provider implementation.
#[derive(Clone)]
pub struct EvmChainProvider {
    provider: RootProvider<Http<Client>>,
    request_timeout: Duration,
}

impl EvmChainProvider {
    pub fn new(rpc_url: &str, request_timeout: Duration) -> Result<Self, ProviderError> {
        let url = rpc_url.parse().map_err(|e| {
            ProviderError::NetworkConfiguration(format!("Invalid RPC URL: {}", e))
        })?;

        let client = ReqwestClientBuilder::default()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProviderError::Other(format!("Failed to build HTTP client: {}", e)))?;

        let mut transport = Http::new(url);
        transport.set_client(client);
        let is_local = transport.guess_local();
        let rpc_client = ClientBuilder::default().transport(transport, is_local);

        Ok(Self {
            provider: ProviderBuilder::new().on_client(rpc_client),
            request_timeout,
        })
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T, ProviderError>
    where
        F: std::future::Future<Output = Result<T, ProviderError>>,
    {
        match timeout(self.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("RPC operation '{}' timed out", operation);
                Err(ProviderError::Timeout)
            }
        }
    }
}

#[async_trait]
impl ChainProviderTrait for EvmChainProvider {
    async fn get_transaction_count(&self, address: Address) -> Result<u64, ProviderError> {
        self.bounded("get_transaction_count", async {
            self.provider
                .get_transaction_count(address)
                .await
                .map_err(|e| ProviderError::RpcError(e.to_string()))
        })
        .await
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, ProviderError> {
        self.bounded("estimate_gas", async {
            self.provider
                .estimate_gas(tx)
                .await
                .map_err(|e| ProviderError::from_estimate_error(e.to_string()))
        })
        .await
    }

    async fn get_gas_price(&self) -> Result<u128, ProviderError> {
        self.bounded("get_gas_price", async {
            self.provider
                .get_gas_price()
                .await
                .map_err(|e| ProviderError::RpcError(e.to_string()))
        })
        .await
    }

    async fn send_raw_transactions(
        &self,
        raw_txs: Vec<Bytes>,
    ) -> Result<Vec<String>, ProviderError> {
        let mut sent = Vec::with_capacity(raw_txs.len());
        let mut first_error: Option<String> = None;

        for raw in &raw_txs {
            let outcome = self
                .bounded("send_raw_transaction", async {
                    self.provider
                        .send_raw_transaction(raw)
                        .await
                        .map_err(|e| ProviderError::RpcError(e.to_string()))
                })
                .await;
            match outcome {
                Ok(pending) => sent.push(pending.tx_hash().to_string()),
                Err(e) => {
                    // Stale nonce or similar: record and keep going so the
                    // rest of the batch still lands. A missing hash is the
                    // per-item failure signal for the caller.
                    log::warn!("Raw transaction rejected: {}", e);
                    first_error.get_or_insert(e.to_string());
                }
            }
        }

        if sent.is_empty() && !raw_txs.is_empty() {
            return Err(ProviderError::RpcError(format!(
                "Batch send failed outright: {}",
                first_error.unwrap_or_else(|| "no transactions accepted".to_string())
            )));
        }
        Ok(sent)
    }

    async fn get_transaction_status(
        &self,
        tx_hash: &str,
    ) -> Result<ChainTransactionStatus, ProviderError> {
        let hash = tx_hash
            .parse()
            .map_err(|e| ProviderError::InvalidAddress(format!("Invalid tx hash: {}", e)))?;

        let receipt = self
            .bounded("get_transaction_receipt", async {
                self.provider
                    .get_transaction_receipt(hash)
                    .await
                    .map_err(|e| ProviderError::RpcError(e.to_string()))
            })
            .await?;

        if let Some(receipt) = receipt {
            return Ok(if receipt.status() {
                ChainTransactionStatus::Succeeded
            } else {
                ChainTransactionStatus::Failed
            });
        }

        let in_pool = self
            .bounded("get_transaction_by_hash", async {
                self.provider
                    .get_transaction_by_hash(hash)
                    .await
                    .map_err(|e| ProviderError::RpcError(e.to_string()))
            })
            .await?;

        Ok(if in_pool.is_some() {
            ChainTransactionStatus::Pending
        } else {
            ChainTransactionStatus::NotFound
        })
    }

    async fn get_transaction_logs(
        &self,
        tx_hash: &str,
    ) -> Result<Vec<RawChainEvent>, ProviderError> {
        let hash = tx_hash
            .parse()
            .map_err(|e| ProviderError::InvalidAddress(format!("Invalid tx hash: {}", e)))?;

        let receipt = self
            .bounded("get_transaction_receipt", async {
                self.provider
                    .get_transaction_receipt(hash)
                    .await
                    .map_err(|e| ProviderError::RpcError(e.to_string()))
            })
            .await?
            .ok_or_else(|| ProviderError::TransactionNotFound(tx_hash.to_string()))?;

        Ok(receipt
            .inner
            .logs()
            .iter()
            .map(|log| RawChainEvent {
                tx_hash: tx_hash.to_string(),
                event_index: log.log_index.unwrap_or_default(),
                address: log.address(),
                topics: log.topics().to_vec(),
                data: log.data().data.clone(),
            })
            .collect())
    }

    async fn get_balance(
        &self,
        address: Address,
    ) -> Result<alloy::primitives::U256, ProviderError> {
        self.bounded("get_balance", async {
            self.provider
                .get_balance(address)
                .await
                .map_err(|e| ProviderError::RpcError(e.to_string()))
        })
        .await
    }

    async fn get_token_balance(
        &self,
        address: Address,
        token: Address,
    ) -> Result<alloy::primitives::U256, ProviderError> {
        use alloy::sol_types::SolCall;

        alloy::sol! {
            function balanceOf(address account) returns (uint256);
        }

        let call = balanceOfCall { account: address };
        let tx = TransactionRequest {
            to: Some(TxKind::Call(token)),
            input: TransactionInput::new(Bytes::from(call.abi_encode())),
            ..Default::default()
        };

        let raw = self
            .bounded("call_balance_of", async {
                self.provider
                    .call(&tx)
                    .await
                    .map_err(|e| ProviderError::RpcError(e.to_string()))
            })
            .await?;

        alloy::primitives::U256::try_from_be_slice(&raw)
            .ok_or_else(|| ProviderError::Other("Malformed balanceOf response".to_string()))
    }
}
