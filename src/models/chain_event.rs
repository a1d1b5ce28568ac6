//! Raw and decoded chain event types.
//!
//! A `RawChainEvent` is what the node hands back for a log entry; the event
//! decoder turns relevant ones into `DecodedEvent` variants carrying typed
//! fields. Everything else in the pipeline works with the decoded form.

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use strum::Display;

/// One raw log entry as returned by the chain node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawChainEvent {
    pub tx_hash: String,
    pub event_index: u64,
    /// Contract that emitted the event.
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// Finality state of a previously submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ChainTransactionStatus {
    Pending,
    Succeeded,
    Failed,
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractCallData {
    pub source_address: Address,
    pub destination_chain: String,
    pub destination_address: String,
    pub payload_hash: B256,
    pub payload: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageApprovedData {
    pub source_chain: String,
    pub message_id: String,
    pub source_address: String,
    pub contract_address: Address,
    pub payload_hash: B256,
    pub payload: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageExecutedData {
    pub source_chain: String,
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignersRotatedData {
    pub epoch: u64,
    pub signers_hash: B256,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GasPaidData {
    pub source_address: Address,
    pub destination_chain: String,
    pub destination_address: String,
    pub payload_hash: B256,
    /// `None` means the native token.
    pub gas_token: Option<String>,
    pub gas_value: U256,
    pub refund_address: Address,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GasAddedData {
    pub payload_hash: B256,
    pub gas_token: Option<String>,
    pub gas_value: U256,
    pub refund_address: Address,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefundedData {
    pub payload_hash: B256,
    pub receiver: Address,
    pub token: Option<String>,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItsTransferData {
    pub token_id: B256,
    pub source_address: Address,
    pub destination_chain: String,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItsDeploymentStartedData {
    pub token_id: B256,
    pub destination_chain: String,
    pub token_name: String,
    pub token_symbol: String,
    pub decimals: u8,
}

/// A chain event the relayer cares about, in typed form.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    ContractCall(ContractCallData),
    MessageApproved(MessageApprovedData),
    MessageExecuted(MessageExecutedData),
    SignersRotated(SignersRotatedData),
    GasPaid(GasPaidData),
    GasAdded(GasAddedData),
    Refunded(RefundedData),
    ItsInterchainTransfer(ItsTransferData),
    ItsDeploymentStarted(ItsDeploymentStartedData),
}
