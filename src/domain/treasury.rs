//! Gas treasury monitor: keeps the relayer account funded and the gas
//! service drained.
//!
//! Three independent hourly checks: collect accrued fees from the gas
//! service once they exceed a threshold (leaving a reserve behind), unwrap
//! accumulated wrapped-native tokens back into spendable balance, and warn
//! operators when the relayer account runs low. One check failing never
//! blocks the others.

use std::{sync::Arc, time::Duration};

use alloy::{
    primitives::{Address, Bytes, TxKind, U256},
    rpc::types::{TransactionInput, TransactionRequest},
    sol,
    sol_types::SolCall,
};
use log::{info, warn};
use redis::aio::ConnectionManager;
use thiserror::Error;

use crate::{
    constants::{
        BALANCE_CACHE_TTL_SECONDS, FEE_COLLECT_RESERVE, FEE_COLLECT_THRESHOLD,
        LOW_BALANCE_THRESHOLD, WRAPPED_CONVERT_THRESHOLD,
    },
    models::{ProviderError, SignerError},
    services::{ChainProviderTrait, RelayerSignerTrait},
    utils::{get_or_set, InflightTxTracker},
};

sol! {
    function collectFees(address receiver, uint256 amount);
    function withdraw(uint256 amount);
}

#[derive(Error, Debug)]
pub enum TreasuryError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("Tracking error: {0}")]
    Tracking(#[from] redis::RedisError),

    #[error("Transaction {0} not accepted by node")]
    NotAccepted(String),
}

#[derive(Debug, Default, Clone)]
pub struct TreasuryReport {
    pub fees_collected: Option<String>,
    pub unwrapped: Option<String>,
    pub low_balance: bool,
}

pub struct TreasuryMonitor {
    provider: Arc<dyn ChainProviderTrait>,
    signer: Arc<dyn RelayerSignerTrait>,
    inflight: Arc<dyn InflightTxTracker>,
    /// Balance reads go through a short-TTL cache when Redis is available.
    cache: Option<ConnectionManager>,
    chain_name: String,
    chain_id: u64,
    gas_service_address: Address,
    wrapped_token_address: Option<Address>,
}

impl TreasuryMonitor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn ChainProviderTrait>,
        signer: Arc<dyn RelayerSignerTrait>,
        inflight: Arc<dyn InflightTxTracker>,
        cache: Option<ConnectionManager>,
        chain_name: String,
        chain_id: u64,
        gas_service_address: Address,
        wrapped_token_address: Option<Address>,
    ) -> Self {
        Self {
            provider,
            signer,
            inflight,
            cache,
            chain_name,
            chain_id,
            gas_service_address,
            wrapped_token_address,
        }
    }

    pub async fn run_cycle(&self) -> TreasuryReport {
        let mut report = TreasuryReport::default();

        match self.check_fee_collection().await {
            Ok(hash) => report.fees_collected = hash,
            Err(e) => warn!("Fee collection check failed: {}", e),
        }
        match self.check_unwrap().await {
            Ok(hash) => report.unwrapped = hash,
            Err(e) => warn!("Unwrap check failed: {}", e),
        }
        match self.check_low_balance().await {
            Ok(low) => report.low_balance = low,
            Err(e) => warn!("Balance check failed: {}", e),
        }

        report
    }

    async fn balance_of(&self, address: Address) -> Result<U256, ProviderError> {
        let provider = Arc::clone(&self.provider);
        match &self.cache {
            Some(conn) => {
                let key = format!("balance:{}:{}", self.chain_name, address);
                get_or_set(
                    conn,
                    &key,
                    Duration::from_secs(BALANCE_CACHE_TTL_SECONDS),
                    || async move { provider.get_balance(address).await },
                )
                .await
            }
            None => provider.get_balance(address).await,
        }
    }

    async fn check_fee_collection(&self) -> Result<Option<String>, TreasuryError> {
        let balance = self.balance_of(self.gas_service_address).await?;
        if balance <= U256::from(FEE_COLLECT_THRESHOLD) {
            return Ok(None);
        }

        let amount = balance - U256::from(FEE_COLLECT_RESERVE);
        let calldata: Bytes = collectFeesCall {
            receiver: self.signer.address(),
            amount,
        }
        .abi_encode()
        .into();

        let hash = self
            .submit(self.gas_service_address, calldata, "collectFees")
            .await?;
        info!("Collecting {} in fees from the gas service: {}", amount, hash);
        Ok(Some(hash))
    }

    async fn check_unwrap(&self) -> Result<Option<String>, TreasuryError> {
        let Some(token) = self.wrapped_token_address else {
            return Ok(None);
        };

        let balance = self
            .provider
            .get_token_balance(self.signer.address(), token)
            .await?;
        if balance <= U256::from(WRAPPED_CONVERT_THRESHOLD) {
            return Ok(None);
        }

        let calldata: Bytes = withdrawCall { amount: balance }.abi_encode().into();
        let hash = self.submit(token, calldata, "withdraw").await?;
        info!("Unwrapping {} wrapped-native tokens: {}", balance, hash);
        Ok(Some(hash))
    }

    async fn check_low_balance(&self) -> Result<bool, TreasuryError> {
        let balance = self.balance_of(self.signer.address()).await?;
        if balance >= U256::from(LOW_BALANCE_THRESHOLD) {
            return Ok(false);
        }

        warn!(
            "Relayer balance on {} is {}, below threshold {}",
            self.chain_name, balance, LOW_BALANCE_THRESHOLD
        );
        Ok(true)
    }

    async fn submit(
        &self,
        to: Address,
        calldata: Bytes,
        operation: &str,
    ) -> Result<String, TreasuryError> {
        let mut tx = TransactionRequest {
            from: Some(self.signer.address()),
            to: Some(TxKind::Call(to)),
            input: TransactionInput::new(calldata),
            value: Some(U256::ZERO),
            chain_id: Some(self.chain_id),
            gas_price: Some(self.provider.get_gas_price().await?),
            ..Default::default()
        };
        tx.gas = Some(self.provider.estimate_gas(&tx).await?);
        tx.nonce = Some(
            self.provider
                .get_transaction_count(self.signer.address())
                .await?,
        );

        let signed = self.signer.sign_transaction(tx).await?;
        let sent = self.provider.send_raw_transactions(vec![signed.raw]).await?;
        if !sent.contains(&signed.hash) {
            return Err(TreasuryError::NotAccepted(format!(
                "{} ({})",
                signed.hash, operation
            )));
        }

        self.inflight.add(&signed.hash).await?;
        Ok(signed.hash)
    }
}
