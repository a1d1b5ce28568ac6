//! Persisted model for gas credited toward a contract call. A payment may be
//! observed before its matching call event (out-of-order emission) and is
//! linked once the call event appears.

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum GasPaymentStatus {
    Pending,
    Settled,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasPayment {
    pub id: String,
    pub tx_hash: String,
    pub source_address: String,
    pub destination_address: String,
    pub destination_chain: String,
    pub payload_hash: String,
    /// `None` means the native token.
    pub gas_token: Option<String>,
    pub gas_value: U256,
    pub refund_address: String,
    pub status: GasPaymentStatus,
    pub refunded_value: Option<U256>,
    /// Back-reference, set when the matching call event is observed.
    pub contract_call_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
