//! Shared test fixtures.

use alloy::primitives::{Bytes, U256};
use chrono::Utc;

use crate::models::{
    ContractCallEvent, ContractCallStatus, GasPayment, GasPaymentStatus, MessageApproved,
    MessageApprovedStatus,
};

pub const TEST_CHAIN: &str = "testchain";

pub fn create_contract_call_event(tx_hash: &str, event_index: u64) -> ContractCallEvent {
    let now = Utc::now();
    ContractCallEvent {
        id: ContractCallEvent::event_id(TEST_CHAIN, tx_hash, event_index),
        tx_hash: tx_hash.to_string(),
        event_index,
        status: ContractCallStatus::Pending,
        source_chain: TEST_CHAIN.to_string(),
        source_address: "0x1111111111111111111111111111111111111111".to_string(),
        destination_chain: "otherchain".to_string(),
        destination_address: "0x2222222222222222222222222222222222222222".to_string(),
        payload_hash: "0xabababababababababababababababababababababababababababababababab"
            .to_string(),
        payload: Bytes::from(vec![1u8, 2, 3]),
        retry_count: 0,
        created_at: now,
        updated_at: now,
    }
}

pub fn create_message_approved(message_id: &str) -> MessageApproved {
    let now = Utc::now();
    MessageApproved {
        id: MessageApproved::message_key(TEST_CHAIN, message_id),
        source_chain: TEST_CHAIN.to_string(),
        message_id: message_id.to_string(),
        tx_hash: "0xapproval".to_string(),
        status: MessageApprovedStatus::Pending,
        source_address: "0x1111111111111111111111111111111111111111".to_string(),
        destination_address: "0x2222222222222222222222222222222222222222".to_string(),
        payload_hash: "0xabababababababababababababababababababababababababababababababab"
            .to_string(),
        payload: Bytes::from(vec![0u8; 64]),
        available_gas_balance: U256::from(1_000_000_000_000_000_000u64),
        retry_count: 0,
        execute_tx_hash: None,
        success_times: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn create_gas_payment(id: &str, payload_hash: &str) -> GasPayment {
    let now = Utc::now();
    GasPayment {
        id: id.to_string(),
        tx_hash: "0xgaspaid".to_string(),
        source_address: "0x1111111111111111111111111111111111111111".to_string(),
        destination_address: "0x2222222222222222222222222222222222222222".to_string(),
        destination_chain: "otherchain".to_string(),
        payload_hash: payload_hash.to_string(),
        gas_token: None,
        gas_value: U256::from(100u64),
        refund_address: "0x3333333333333333333333333333333333333333".to_string(),
        status: GasPaymentStatus::Pending,
        refunded_value: None,
        contract_call_event_id: None,
        created_at: now,
        updated_at: now,
    }
}
