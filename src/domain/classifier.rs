//! Event classifier: turns a confirmed transaction's raw logs into
//! repository rows and protocol events for the hub.
//!
//! Each log is handled in isolation. A log from an unwatched contract or
//! with an unknown signature is skipped, a decode failure is logged and
//! skipped, and only repository failures abort a batch. Row creation is
//! idempotent, so re-classifying the same transaction after a crash is
//! harmless.

use std::sync::Arc;

use alloy::primitives::Address;
use chrono::Utc;
use log::{debug, warn};

use crate::{
    models::{
        ContractCallEvent, ContractCallStatus, DecodedEvent, GasPayment, GasPaymentStatus,
        MessageApproved, MessageApprovedStatus, ProtocolEvent, RawChainEvent, RepositoryError,
    },
    repositories::{
        ContractCallEventRepositoryTrait, CreateOutcome, GasPaymentRepositoryTrait,
        MessageApprovedRepositoryTrait,
    },
    services::decoder,
};

#[derive(Debug, Default)]
pub struct ClassifyOutcome {
    /// Domain events to forward to the hub, in log order.
    pub protocol_events: Vec<ProtocolEvent>,
    pub created: usize,
    pub skipped: usize,
}

pub struct EventClassifier {
    contract_call_events: Arc<dyn ContractCallEventRepositoryTrait>,
    messages: Arc<dyn MessageApprovedRepositoryTrait>,
    gas_payments: Arc<dyn GasPaymentRepositoryTrait>,
    chain_name: String,
    gateway_address: Address,
    gas_service_address: Address,
    its_address: Address,
}

impl EventClassifier {
    pub fn new(
        contract_call_events: Arc<dyn ContractCallEventRepositoryTrait>,
        messages: Arc<dyn MessageApprovedRepositoryTrait>,
        gas_payments: Arc<dyn GasPaymentRepositoryTrait>,
        chain_name: String,
        gateway_address: Address,
        gas_service_address: Address,
        its_address: Address,
    ) -> Self {
        Self {
            contract_call_events,
            messages,
            gas_payments,
            chain_name,
            gateway_address,
            gas_service_address,
            its_address,
        }
    }

    /// Classifies a batch of raw logs, creating rows as a side effect and
    /// returning the protocol events the caller should forward.
    pub async fn classify(
        &self,
        events: Vec<RawChainEvent>,
    ) -> Result<ClassifyOutcome, RepositoryError> {
        let mut outcome = ClassifyOutcome::default();

        for raw in events {
            let decoded = match decoder::decode(&raw) {
                Ok(decoded) => decoded,
                Err(e) => {
                    debug!(
                        "Skipping log {} of {}: {}",
                        raw.event_index, raw.tx_hash, e
                    );
                    outcome.skipped += 1;
                    continue;
                }
            };

            if !self.emitter_allowed(&raw, &decoded) {
                debug!(
                    "Skipping log {} of {}: unexpected emitter {}",
                    raw.event_index, raw.tx_hash, raw.address
                );
                outcome.skipped += 1;
                continue;
            }

            self.handle(&raw, decoded, &mut outcome).await?;
        }

        Ok(outcome)
    }

    /// Each event kind is only trusted from the contract that defines it.
    fn emitter_allowed(&self, raw: &RawChainEvent, decoded: &DecodedEvent) -> bool {
        match decoded {
            DecodedEvent::ContractCall(_)
            | DecodedEvent::MessageApproved(_)
            | DecodedEvent::MessageExecuted(_)
            | DecodedEvent::SignersRotated(_) => raw.address == self.gateway_address,
            DecodedEvent::GasPaid(_) | DecodedEvent::GasAdded(_) | DecodedEvent::Refunded(_) => {
                raw.address == self.gas_service_address
            }
            DecodedEvent::ItsInterchainTransfer(_) | DecodedEvent::ItsDeploymentStarted(_) => {
                raw.address == self.its_address
            }
        }
    }

    async fn handle(
        &self,
        raw: &RawChainEvent,
        decoded: DecodedEvent,
        outcome: &mut ClassifyOutcome,
    ) -> Result<(), RepositoryError> {
        let event_id = ContractCallEvent::event_id(&self.chain_name, &raw.tx_hash, raw.event_index);

        match decoded {
            DecodedEvent::ContractCall(data) => {
                let now = Utc::now();
                let row = ContractCallEvent {
                    id: event_id.clone(),
                    tx_hash: raw.tx_hash.clone(),
                    event_index: raw.event_index,
                    status: ContractCallStatus::Pending,
                    source_chain: self.chain_name.clone(),
                    source_address: data.source_address.to_string(),
                    destination_chain: data.destination_chain.clone(),
                    destination_address: data.destination_address.clone(),
                    payload_hash: data.payload_hash.to_string(),
                    payload: data.payload.clone(),
                    retry_count: 0,
                    created_at: now,
                    updated_at: now,
                };
                if self.contract_call_events.create(row).await?.is_duplicate() {
                    debug!("Contract call {} already known", event_id);
                    return Ok(());
                }
                outcome.created += 1;

                self.gas_payments
                    .link_contract_call(
                        &data.payload_hash.to_string(),
                        &data.destination_address,
                        &event_id,
                    )
                    .await?;

                outcome.protocol_events.push(ProtocolEvent::Call {
                    event_id,
                    source_chain: self.chain_name.clone(),
                    source_address: data.source_address.to_string(),
                    destination_chain: data.destination_chain,
                    destination_address: data.destination_address,
                    payload_hash: data.payload_hash.to_string(),
                    payload: data.payload.to_string(),
                });
            }

            DecodedEvent::MessageApproved(data) => {
                // Budget attribution is best-effort: a matching local gas
                // payment funds the execution, otherwise the message starts
                // with a zero budget and relies on later gas-added credits.
                let budget = self
                    .gas_payments
                    .find_matching(
                        &data.payload_hash.to_string(),
                        &data.contract_address.to_string(),
                    )
                    .await?
                    .map(|payment| payment.gas_value)
                    .unwrap_or_default();

                let now = Utc::now();
                let row = MessageApproved {
                    id: MessageApproved::message_key(&data.source_chain, &data.message_id),
                    source_chain: data.source_chain.clone(),
                    message_id: data.message_id.clone(),
                    tx_hash: raw.tx_hash.clone(),
                    status: MessageApprovedStatus::Pending,
                    source_address: data.source_address.clone(),
                    destination_address: data.contract_address.to_string(),
                    payload_hash: data.payload_hash.to_string(),
                    payload: data.payload.clone(),
                    available_gas_balance: budget,
                    retry_count: 0,
                    execute_tx_hash: None,
                    success_times: None,
                    created_at: now,
                    updated_at: now,
                };
                match self.messages.create(row).await? {
                    CreateOutcome::Created(_) => outcome.created += 1,
                    CreateOutcome::Duplicate => {
                        debug!(
                            "Approval for {}_{} already known",
                            data.source_chain, data.message_id
                        );
                    }
                }
            }

            DecodedEvent::MessageExecuted(data) => {
                if self
                    .messages
                    .mark_executed(&data.source_chain, &data.message_id)
                    .await?
                    .is_none()
                {
                    debug!(
                        "Execution of unknown message {}_{}",
                        data.source_chain, data.message_id
                    );
                }
                outcome.protocol_events.push(ProtocolEvent::MessageExecuted {
                    event_id,
                    source_chain: data.source_chain,
                    message_id: data.message_id,
                    status: "SUCCESSFUL".to_string(),
                });
            }

            DecodedEvent::SignersRotated(data) => {
                outcome.protocol_events.push(ProtocolEvent::SignersRotated {
                    event_id,
                    epoch: data.epoch,
                    signers_hash: data.signers_hash.to_string(),
                });
            }

            DecodedEvent::GasPaid(data) => {
                let now = Utc::now();
                let row = GasPayment {
                    id: event_id.clone(),
                    tx_hash: raw.tx_hash.clone(),
                    source_address: data.source_address.to_string(),
                    destination_address: data.destination_address.clone(),
                    destination_chain: data.destination_chain.clone(),
                    payload_hash: data.payload_hash.to_string(),
                    gas_token: data.gas_token.clone(),
                    gas_value: data.gas_value,
                    refund_address: data.refund_address.to_string(),
                    status: GasPaymentStatus::Pending,
                    refunded_value: None,
                    contract_call_event_id: None,
                    created_at: now,
                    updated_at: now,
                };
                if self.gas_payments.create(row).await?.is_duplicate() {
                    debug!("Gas payment {} already known", event_id);
                    return Ok(());
                }
                outcome.created += 1;

                outcome.protocol_events.push(ProtocolEvent::GasCredit {
                    event_id: event_id.clone(),
                    message_id: format!("{}-{}", raw.tx_hash, raw.event_index),
                    refund_address: data.refund_address.to_string(),
                    amount: data.gas_value.to_string(),
                    token: data.gas_token,
                });
            }

            DecodedEvent::GasAdded(data) => {
                let credited = self
                    .gas_payments
                    .add_gas(
                        &data.payload_hash.to_string(),
                        data.gas_token.as_deref(),
                        &data.refund_address.to_string(),
                        data.gas_value,
                    )
                    .await?;
                match credited {
                    Some(_) => {
                        outcome.protocol_events.push(ProtocolEvent::GasCredit {
                            event_id,
                            message_id: format!("{}-{}", raw.tx_hash, raw.event_index),
                            refund_address: data.refund_address.to_string(),
                            amount: data.gas_value.to_string(),
                            token: data.gas_token,
                        });
                    }
                    None => {
                        warn!(
                            "Gas added for unknown payment (payload hash {}), skipping",
                            data.payload_hash
                        );
                        outcome.skipped += 1;
                    }
                }
            }

            DecodedEvent::Refunded(data) => {
                let refunded = self
                    .gas_payments
                    .record_refund(
                        &data.payload_hash.to_string(),
                        &data.receiver.to_string(),
                        data.amount,
                    )
                    .await?;
                if refunded.is_none() {
                    warn!(
                        "Refund for unknown payment (payload hash {}), forwarding anyway",
                        data.payload_hash
                    );
                }
                outcome.protocol_events.push(ProtocolEvent::GasRefunded {
                    event_id,
                    message_id: format!("{}-{}", raw.tx_hash, raw.event_index),
                    recipient: data.receiver.to_string(),
                    amount: data.amount.to_string(),
                    token: data.token,
                });
            }

            DecodedEvent::ItsInterchainTransfer(data) => {
                outcome
                    .protocol_events
                    .push(ProtocolEvent::ItsInterchainTransfer {
                        event_id,
                        token_id: data.token_id.to_string(),
                        destination_chain: data.destination_chain,
                        amount: data.amount.to_string(),
                    });
            }

            DecodedEvent::ItsDeploymentStarted(data) => {
                outcome
                    .protocol_events
                    .push(ProtocolEvent::ItsInterchainTokenDeploymentStarted {
                        event_id,
                        token_id: data.token_id.to_string(),
                        destination_chain: data.destination_chain,
                        token_name: data.token_name,
                        token_symbol: data.token_symbol,
                        decimals: data.decimals,
                    });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::{
        primitives::{keccak256, Bytes, U256},
        sol_types::SolEvent,
    };

    use crate::{
        repositories::{
            MockContractCallEventRepository, MockGasPaymentRepository,
            MockMessageApprovedRepository,
        },
        services::decoder::{ContractCall, MessageExecuted, NativeGasAdded},
        utils::mocks::create_gas_payment,
    };

    const GATEWAY: Address = Address::repeat_byte(0x0a);
    const GAS_SERVICE: Address = Address::repeat_byte(0x0b);
    const ITS: Address = Address::repeat_byte(0x0c);

    struct Harness {
        calls: MockContractCallEventRepository,
        messages: MockMessageApprovedRepository,
        payments: MockGasPaymentRepository,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                calls: MockContractCallEventRepository::new(),
                messages: MockMessageApprovedRepository::new(),
                payments: MockGasPaymentRepository::new(),
            }
        }

        fn classifier(self) -> EventClassifier {
            EventClassifier::new(
                Arc::new(self.calls),
                Arc::new(self.messages),
                Arc::new(self.payments),
                "testchain".to_string(),
                GATEWAY,
                GAS_SERVICE,
                ITS,
            )
        }
    }

    fn raw(address: Address, log: alloy::primitives::LogData, index: u64) -> RawChainEvent {
        RawChainEvent {
            tx_hash: "0xtx".to_string(),
            event_index: index,
            address,
            topics: log.topics().to_vec(),
            data: log.data,
        }
    }

    fn contract_call_log() -> alloy::primitives::LogData {
        let payload = Bytes::from(vec![1u8, 2, 3]);
        ContractCall {
            sender: Address::repeat_byte(0x11),
            destinationChain: "otherchain".to_string(),
            destinationContractAddress: "0xdest".to_string(),
            payloadHash: keccak256(&payload),
            payload,
        }
        .encode_log_data()
    }

    #[tokio::test]
    async fn test_contract_call_creates_row_and_emits_call_event() {
        let mut h = Harness::new();
        h.calls
            .expect_create()
            .withf(|row| row.id == "testchain_0xtx-0" && row.status == ContractCallStatus::Pending)
            .returning(|row| Ok(CreateOutcome::Created(row)));
        h.payments
            .expect_link_contract_call()
            .times(1)
            .returning(|_, _, _| Ok(None));

        let outcome = h
            .classifier()
            .classify(vec![raw(GATEWAY, contract_call_log(), 0)])
            .await
            .unwrap();

        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.protocol_events.len(), 1);
        assert!(matches!(
            outcome.protocol_events[0],
            ProtocolEvent::Call { .. }
        ));
    }

    #[tokio::test]
    async fn test_duplicate_contract_call_is_silent_noop() {
        let mut h = Harness::new();
        h.calls
            .expect_create()
            .returning(|_| Ok(CreateOutcome::Duplicate));
        h.payments.expect_link_contract_call().times(0);

        let outcome = h
            .classifier()
            .classify(vec![raw(GATEWAY, contract_call_log(), 0)])
            .await
            .unwrap();

        assert_eq!(outcome.created, 0);
        assert!(outcome.protocol_events.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_emitter_is_skipped() {
        let h = Harness::new();
        // ContractCall emitted by the gas service: not trusted.
        let outcome = h
            .classifier()
            .classify(vec![raw(GAS_SERVICE, contract_call_log(), 0)])
            .await
            .unwrap();

        assert_eq!(outcome.skipped, 1);
        assert!(outcome.protocol_events.is_empty());
    }

    #[tokio::test]
    async fn test_decode_failure_isolates_single_event() {
        let mut h = Harness::new();
        h.calls
            .expect_create()
            .returning(|row| Ok(CreateOutcome::Created(row)));
        h.payments
            .expect_link_contract_call()
            .returning(|_, _, _| Ok(None));

        let garbage = RawChainEvent {
            tx_hash: "0xtx".to_string(),
            event_index: 0,
            address: GATEWAY,
            topics: vec![keccak256(b"Bogus()")],
            data: Bytes::new(),
        };
        let outcome = h
            .classifier()
            .classify(vec![garbage, raw(GATEWAY, contract_call_log(), 1)])
            .await
            .unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.created, 1);
    }

    #[tokio::test]
    async fn test_message_executed_marks_row_and_forwards() {
        let mut h = Harness::new();
        h.messages
            .expect_mark_executed()
            .withf(|chain, id| chain == "sourcechain" && id == "0xorigin-3")
            .returning(|_, _| Ok(None));

        let log = MessageExecuted {
            commandId: keccak256(b"cmd"),
            sourceChain: "sourcechain".to_string(),
            messageId: "0xorigin-3".to_string(),
        }
        .encode_log_data();

        let outcome = h
            .classifier()
            .classify(vec![raw(GATEWAY, log, 0)])
            .await
            .unwrap();

        assert!(matches!(
            outcome.protocol_events[0],
            ProtocolEvent::MessageExecuted { .. }
        ));
    }

    #[tokio::test]
    async fn test_gas_added_without_matching_payment_is_skipped() {
        let mut h = Harness::new();
        h.payments.expect_add_gas().returning(|_, _, _, _| Ok(None));

        let log = NativeGasAdded {
            payloadHash: keccak256(b"payload"),
            gasFeeAmount: U256::from(5u64),
            refundAddress: Address::repeat_byte(0x44),
        }
        .encode_log_data();

        let outcome = h
            .classifier()
            .classify(vec![raw(GAS_SERVICE, log, 0)])
            .await
            .unwrap();

        assert_eq!(outcome.skipped, 1);
        assert!(outcome.protocol_events.is_empty());
    }

    #[tokio::test]
    async fn test_approval_budget_from_matching_payment() {
        let mut h = Harness::new();
        let payment = create_gas_payment("0xpay", "0xhash");
        let gas_value = payment.gas_value;
        h.payments
            .expect_find_matching()
            .returning(move |_, _| Ok(Some(payment.clone())));
        h.messages
            .expect_create()
            .withf(move |row| row.available_gas_balance == gas_value)
            .returning(|row| Ok(CreateOutcome::Created(row)));

        let log = crate::services::decoder::MessageApproved {
            commandId: keccak256(b"cmd"),
            sourceChain: "sourcechain".to_string(),
            messageId: "0xorigin-9".to_string(),
            sourceAddress: "0xsender".to_string(),
            contractAddress: Address::repeat_byte(0x66),
            payloadHash: keccak256(b"payload"),
            payload: Bytes::from(vec![9u8]),
        }
        .encode_log_data();

        let outcome = h
            .classifier()
            .classify(vec![raw(GATEWAY, log, 0)])
            .await
            .unwrap();
        assert_eq!(outcome.created, 1);
    }
}
