use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize)]
pub enum ProviderError {
    #[error("RPC client error: {0}")]
    RpcError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Network configuration error: {0}")]
    NetworkConfiguration(String),

    /// Gas estimation determined the transaction cannot be covered by the
    /// funds or limits in play. Drives the cap-and-send-anyway path rather
    /// than aborting the cycle.
    #[error("Insufficient gas: {0}")]
    InsufficientGas(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Unknown provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Classifies a raw RPC error message as an insufficient-gas condition.
    /// Node clients word this differently, so matching is loose by intent.
    pub fn from_estimate_error(message: String) -> Self {
        let lowered = message.to_lowercase();
        if lowered.contains("insufficient funds")
            || lowered.contains("insufficient gas")
            || lowered.contains("out of gas")
            || lowered.contains("gas required exceeds")
        {
            ProviderError::InsufficientGas(message)
        } else {
            ProviderError::RpcError(message)
        }
    }
}
