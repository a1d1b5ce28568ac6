//! Persisted model for a cross-chain contract call observed on the source
//! chain. Created `Pending` when the gateway event is decoded, moved to
//! `Approved` once the hub verifies it, or `Failed` after the verification
//! retry ceiling. Terminal states are never left.

use alloy::primitives::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ContractCallStatus {
    Pending,
    Approved,
    Failed,
}

impl ContractCallStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractCallEvent {
    /// Stable composite id: `{source_chain}_{tx_hash}-{event_index}`.
    pub id: String,
    pub tx_hash: String,
    pub event_index: u64,
    pub status: ContractCallStatus,
    pub source_chain: String,
    pub source_address: String,
    pub destination_chain: String,
    pub destination_address: String,
    pub payload_hash: String,
    pub payload: Bytes,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContractCallEvent {
    pub fn event_id(source_chain: &str, tx_hash: &str, event_index: u64) -> String {
        format!("{}_{}-{}", source_chain, tx_hash, event_index)
    }
}

/// Partial update applied through the repository's atomic batch write.
#[derive(Debug, Clone, Default)]
pub struct ContractCallEventUpdate {
    pub id: String,
    pub status: Option<ContractCallStatus>,
    pub retry_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_format() {
        assert_eq!(
            ContractCallEvent::event_id("sourcechain", "0xabc", 7),
            "sourcechain_0xabc-7"
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ContractCallStatus::Pending.is_terminal());
        assert!(ContractCallStatus::Approved.is_terminal());
        assert!(ContractCallStatus::Failed.is_terminal());
    }
}
