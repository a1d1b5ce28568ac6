//! Persisted model for a message the hub has approved for execution on this
//! chain. Updated by the execution engine and the reconciliation loop; rows
//! are only ever marked terminal, never deleted.

use alloy::primitives::{Bytes, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum MessageApprovedStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageApproved {
    /// Composite id: `{source_chain}_{message_id}`.
    pub id: String,
    pub source_chain: String,
    pub message_id: String,
    /// Hash of the approval transaction.
    pub tx_hash: String,
    pub status: MessageApprovedStatus,
    pub source_address: String,
    pub destination_address: String,
    pub payload_hash: String,
    pub payload: Bytes,
    /// Native-currency budget attached to the message for execution gas.
    pub available_gas_balance: U256,
    pub retry_count: u32,
    /// Candidate hash of the latest execution attempt. Cleared when a batched
    /// send for it fails.
    pub execute_tx_hash: Option<String>,
    /// Confirmed sub-executions; drives the two-phase ITS deploy case.
    pub success_times: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageApproved {
    pub fn message_key(source_chain: &str, message_id: &str) -> String {
        format!("{}_{}", source_chain, message_id)
    }
}

/// Partial update applied through the repository's atomic batch write. A
/// `None` field leaves the row value untouched; `execute_tx_hash` is doubly
/// optional so the rollback path can explicitly clear it.
#[derive(Debug, Clone, Default)]
pub struct MessageApprovedUpdate {
    pub id: String,
    pub status: Option<MessageApprovedStatus>,
    pub retry_count: Option<u32>,
    pub execute_tx_hash: Option<Option<String>>,
    pub success_times: Option<u32>,
}
