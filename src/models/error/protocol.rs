use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolClientError {
    #[error("Request error: {0}")]
    RequestError(String),

    #[error("Unexpected response ({status}): {body}")]
    UnexpectedResponse { status: u16, body: String },

    #[error("Response decode error: {0}")]
    DecodeError(String),

    /// The hub rejected the batch but the rejection is retriable; the calling
    /// job re-raises so the whole batch is retried later.
    #[error("Retriable hub error: {0}")]
    Retriable(String),
}

impl From<reqwest::Error> for ProtocolClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            ProtocolClientError::Retriable(err.to_string())
        } else {
            ProtocolClientError::RequestError(err.to_string())
        }
    }
}
