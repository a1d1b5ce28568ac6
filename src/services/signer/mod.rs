//! Local signing of execution transactions. Builds the signed envelope so
//! the candidate transaction hash is known before submission; the execution
//! engine records it as `execute_tx_hash` ahead of the batch send.

use alloy::{
    eips::eip2718::Encodable2718,
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;

use crate::models::SignerError;

#[cfg(test)]
use mockall::automock;

/// A signed transaction ready for submission, with its hash precomputed.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub hash: String,
    pub raw: Bytes,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait RelayerSignerTrait: Send + Sync {
    async fn sign_transaction(
        &self,
        tx: TransactionRequest,
    ) -> Result<SignedTransaction, SignerError>;

    fn address(&self) -> Address;
}

/// Signer backed by a locally held private key.
#[derive(Clone)]
pub struct LocalRelayerSigner {
    wallet: EthereumWallet,
    address: Address,
}

impl LocalRelayerSigner {
    pub fn new(private_key: &str) -> Result<Self, SignerError> {
        let signer: PrivateKeySigner = private_key
            .trim_start_matches("0x")
            .parse()
            .map_err(|e| SignerError::KeyError(format!("Invalid private key: {}", e)))?;
        let address = signer.address();
        Ok(Self {
            wallet: EthereumWallet::from(signer),
            address,
        })
    }
}

#[async_trait]
impl RelayerSignerTrait for LocalRelayerSigner {
    async fn sign_transaction(
        &self,
        tx: TransactionRequest,
    ) -> Result<SignedTransaction, SignerError> {
        let envelope = tx
            .build(&self.wallet)
            .await
            .map_err(|e| SignerError::SigningError(e.to_string()))?;

        Ok(SignedTransaction {
            hash: envelope.tx_hash().to_string(),
            raw: envelope.encoded_2718().into(),
        })
    }

    fn address(&self) -> Address {
        self.address
    }
}
