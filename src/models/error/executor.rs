use thiserror::Error;

use super::{ProtocolClientError, ProviderError, RepositoryError, SignerError};

/// Errors that abort a whole drain cycle. Per-entry failures never surface
/// here; they are converted to state transitions inside the loop.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("Protocol client error: {0}")]
    Protocol(#[from] ProtocolClientError),

    #[error("Gas estimation failed: {0}")]
    GasEstimation(String),

    #[error("Nonce resolution failed: {0}")]
    NonceResolution(String),
}
