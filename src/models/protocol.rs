//! Wire types for the protocol hub API: domain events pushed with
//! `post_events`, the verification request/response pair, and terminal
//! failure notifications.

use serde::{Deserialize, Serialize};

/// A domain event forwarded to the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolEvent {
    Call {
        event_id: String,
        source_chain: String,
        source_address: String,
        destination_chain: String,
        destination_address: String,
        payload_hash: String,
        /// Hex-encoded payload bytes.
        payload: String,
    },
    GasCredit {
        event_id: String,
        message_id: String,
        refund_address: String,
        /// Smallest-unit amount, decimal string.
        amount: String,
        token: Option<String>,
    },
    GasRefunded {
        event_id: String,
        message_id: String,
        recipient: String,
        amount: String,
        token: Option<String>,
    },
    MessageExecuted {
        event_id: String,
        source_chain: String,
        message_id: String,
        status: String,
    },
    SignersRotated {
        event_id: String,
        epoch: u64,
        signers_hash: String,
    },
    ItsInterchainTransfer {
        event_id: String,
        token_id: String,
        destination_chain: String,
        amount: String,
    },
    ItsInterchainTokenDeploymentStarted {
        event_id: String,
        token_id: String,
        destination_chain: String,
        token_name: String,
        token_symbol: String,
        decimals: u8,
    },
    CannotExecuteMessage {
        event_id: String,
        message_id: String,
        reason: CannotExecuteReason,
        details: String,
    },
}

/// Reason reported to the hub when a message is marked failed locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CannotExecuteReason {
    Error,
    InsufficientGas,
}

/// Per-event outcome of a `post_events` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEventResult {
    pub accepted: bool,
    #[serde(default)]
    pub retriable: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEventsResponse {
    pub results: Vec<PostEventResult>,
}

/// Outcome of a single-shot verification round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationOutcome {
    Approved,
    Error,
}
