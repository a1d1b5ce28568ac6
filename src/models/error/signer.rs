use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Invalid key material: {0}")]
    KeyError(String),

    #[error("Failed to sign transaction: {0}")]
    SigningError(String),
}
