use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Malformed event data: {0}")]
    MalformedData(String),
}
