//! Execution engine: drains approved messages into signed execution
//! transactions, nonce-sequenced within a cycle and batch-submitted.
//!
//! The cycle stages every row mutation and commits candidate outcomes in one
//! repository write after submission, so a crash mid-cycle leaves either the
//! pre-cycle state or the post-submission state, never a half-written page.
//! Terminal marks commit separately, only once the hub has accepted the
//! matching failure report. A transport-level submission failure persists
//! nothing: the candidate hashes were never on the wire, and the untouched
//! rows simply come back on a later cycle.

use std::{collections::HashSet, sync::Arc};

use alloy::{
    primitives::{Address, Bytes, TxKind, U256},
    rpc::types::{TransactionInput, TransactionRequest},
    sol,
    sol_types::SolCall,
};
use log::{debug, info, warn};

use crate::{
    constants::ITS_TOKEN_ISSUE_VALUE,
    models::{
        CannotExecuteReason, ChainTransactionStatus, ExecutorError, MessageApproved,
        MessageApprovedStatus, MessageApprovedUpdate, ProtocolEvent, ProviderError,
    },
    repositories::MessageApprovedRepositoryTrait,
    services::{
        ChainProviderTrait, FeeAccountant, ProtocolClientTrait, RelayerSignerTrait,
        SignedTransaction,
    },
    services::gas::BudgetCheck,
};

sol! {
    function execute(
        string sourceChain,
        string messageId,
        string sourceAddress,
        bytes payload
    );
}

/// Leading payload word marking an interchain-token deployment, which needs
/// a second execution carrying the token issue value.
const ITS_DEPLOY_TAG: u64 = 1;

#[derive(Debug, Default, Clone)]
pub struct ExecutionCycleReport {
    pub examined: usize,
    pub submitted: usize,
    pub rolled_back: usize,
    pub failed_terminal: usize,
    pub deferred: usize,
    /// Hashes the node accepted this cycle, for confirmation tracking.
    pub submitted_hashes: Vec<String>,
}

/// One staged execution attempt: the signed transaction plus the row update
/// to commit if the node accepts it and the rollback if it does not.
struct Candidate {
    signed: SignedTransaction,
    commit: MessageApprovedUpdate,
    rollback: MessageApprovedUpdate,
}

pub struct ExecutionEngine {
    messages: Arc<dyn MessageApprovedRepositoryTrait>,
    provider: Arc<dyn ChainProviderTrait>,
    signer: Arc<dyn RelayerSignerTrait>,
    protocol_client: Arc<dyn ProtocolClientTrait>,
    fee_accountant: Arc<FeeAccountant>,
    chain_name: String,
    chain_id: u64,
    its_address: Address,
    page_size: u32,
    max_retries: u32,
}

impl ExecutionEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        messages: Arc<dyn MessageApprovedRepositoryTrait>,
        provider: Arc<dyn ChainProviderTrait>,
        signer: Arc<dyn RelayerSignerTrait>,
        protocol_client: Arc<dyn ProtocolClientTrait>,
        fee_accountant: Arc<FeeAccountant>,
        chain_name: String,
        chain_id: u64,
        its_address: Address,
        page_size: u32,
        max_retries: u32,
    ) -> Self {
        Self {
            messages,
            provider,
            signer,
            protocol_client,
            fee_accountant,
            chain_name,
            chain_id,
            its_address,
            page_size,
            max_retries,
        }
    }

    /// Runs one drain cycle over all eligible pending messages.
    ///
    /// The page cursor only moves past deferred entries. Every other outcome
    /// removes the row from the pending query (terminal status, or the retry
    /// bump's cool-down on submitted and rolled-back rows), so a page with no
    /// deferrals is re-read in place and the next batch of eligible rows
    /// shifts into it.
    pub async fn run_cycle(&self) -> Result<ExecutionCycleReport, ExecutorError> {
        let mut report = ExecutionCycleReport::default();
        let mut nonce: Option<u64> = None;
        let mut gas_price: Option<u128> = None;
        let mut page = 1u32;

        loop {
            let entries = self.messages.find_pending(page, self.page_size).await?;
            if entries.is_empty() {
                break;
            }
            let page_full = entries.len() == self.page_size as usize;
            report.examined += entries.len();

            let deferred_before = report.deferred;
            let proceed = self
                .process_page(entries, &mut nonce, &mut gas_price, &mut report)
                .await?;

            if !proceed || !page_full {
                break;
            }
            if report.deferred > deferred_before {
                page += 1;
            }
        }

        if report.examined > 0 {
            info!(
                "Execution cycle: {} examined, {} submitted, {} rolled back, {} failed, {} deferred",
                report.examined,
                report.submitted,
                report.rolled_back,
                report.failed_terminal,
                report.deferred
            );
        }
        Ok(report)
    }

    async fn process_page(
        &self,
        entries: Vec<MessageApproved>,
        nonce: &mut Option<u64>,
        gas_price: &mut Option<u128>,
        report: &mut ExecutionCycleReport,
    ) -> Result<bool, ExecutorError> {
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut terminal_updates: Vec<MessageApprovedUpdate> = Vec::new();
        let mut notifications: Vec<ProtocolEvent> = Vec::new();

        for entry in entries {
            match self.stage_entry(&entry, nonce, gas_price).await? {
                Staged::Candidate(candidate) => candidates.push(candidate),
                Staged::Terminal { update, reason, details } => {
                    terminal_updates.push(update);
                    notifications.push(ProtocolEvent::CannotExecuteMessage {
                        event_id: format!("cannot-execute_{}", entry.id),
                        message_id: entry.message_id.clone(),
                        reason,
                        details,
                    });
                    report.failed_terminal += 1;
                }
                Staged::Deferred => report.deferred += 1,
            }
        }

        // Submit first, persist after: an outright submission failure must
        // leave every row untouched, including the terminal marks staged in
        // the same page.
        let sent: HashSet<String> = if candidates.is_empty() {
            HashSet::new()
        } else {
            let raw_txs = candidates.iter().map(|c| c.signed.raw.clone()).collect();
            match self.provider.send_raw_transactions(raw_txs).await {
                Ok(hashes) => hashes.into_iter().collect(),
                Err(e) => {
                    warn!("Batch submission failed outright, persisting nothing: {}", e);
                    *nonce = None;
                    return Ok(false);
                }
            }
        };

        let mut updates: Vec<MessageApprovedUpdate> = Vec::new();
        let mut page_rollbacks = 0usize;
        for candidate in candidates {
            if sent.contains(&candidate.signed.hash) {
                report.submitted += 1;
                report.submitted_hashes.push(candidate.signed.hash.clone());
                updates.push(candidate.commit);
            } else {
                warn!(
                    "Transaction {} rejected by node, rolling back candidate",
                    candidate.signed.hash
                );
                page_rollbacks += 1;
                updates.push(candidate.rollback);
            }
        }
        report.rolled_back += page_rollbacks;

        // A rejected candidate means nonces past it were not consumed; the
        // next page re-resolves from the node.
        if page_rollbacks > 0 {
            *nonce = None;
        }

        if !updates.is_empty() {
            self.messages.update_many_partial(updates).await?;
        }

        // The hub report gates the terminal mark: a failed delivery aborts
        // the cycle with the rows still pending, and a later cycle retries
        // the report before writing Failed.
        if !terminal_updates.is_empty() {
            for notification in notifications {
                self.protocol_client
                    .notify_cannot_execute(&self.chain_name, notification)
                    .await?;
            }
            self.messages.update_many_partial(terminal_updates).await?;
        }
        Ok(true)
    }

    async fn stage_entry(
        &self,
        entry: &MessageApproved,
        nonce: &mut Option<u64>,
        gas_price: &mut Option<u128>,
    ) -> Result<Staged, ExecutorError> {
        if entry.retry_count >= self.max_retries {
            return Ok(Staged::Terminal {
                update: MessageApprovedUpdate {
                    id: entry.id.clone(),
                    status: Some(MessageApprovedStatus::Failed),
                    ..Default::default()
                },
                reason: CannotExecuteReason::Error,
                details: format!("Retry ceiling {} reached", self.max_retries),
            });
        }

        if entry.payload.is_empty() {
            return Ok(Staged::Terminal {
                update: MessageApprovedUpdate {
                    id: entry.id.clone(),
                    status: Some(MessageApprovedStatus::Failed),
                    ..Default::default()
                },
                reason: CannotExecuteReason::Error,
                details: "Empty payload".to_string(),
            });
        }

        let mut tx_value = U256::ZERO;
        if let Some(prior_hash) = entry.execute_tx_hash.as_deref() {
            match self.provider.get_transaction_status(prior_hash).await? {
                ChainTransactionStatus::Pending => {
                    debug!("Prior execution {} still pending, deferring {}", prior_hash, entry.id);
                    return Ok(Staged::Deferred);
                }
                ChainTransactionStatus::Succeeded => {
                    // A confirmed execution only warrants another one for the
                    // second phase of an ITS deployment. Anything else is the
                    // reconciler's to finalize.
                    if self.is_its_deploy(entry) && entry.success_times == Some(1) {
                        tx_value = U256::from(ITS_TOKEN_ISSUE_VALUE);
                    } else {
                        return Ok(Staged::Deferred);
                    }
                }
                ChainTransactionStatus::Failed | ChainTransactionStatus::NotFound => {
                    debug!("Prior execution {} did not land, retrying {}", prior_hash, entry.id);
                }
            }
        }

        let destination: Address = match entry.destination_address.parse() {
            Ok(address) => address,
            Err(e) => {
                return Ok(Staged::Terminal {
                    update: MessageApprovedUpdate {
                        id: entry.id.clone(),
                        status: Some(MessageApprovedStatus::Failed),
                        ..Default::default()
                    },
                    reason: CannotExecuteReason::Error,
                    details: format!("Invalid destination address: {}", e),
                });
            }
        };

        let calldata = self.execute_calldata(entry);
        if gas_price.is_none() {
            *gas_price = Some(self.provider.get_gas_price().await?);
        }
        let mut tx = TransactionRequest {
            from: Some(self.signer.address()),
            to: Some(TxKind::Call(destination)),
            input: TransactionInput::new(calldata),
            value: Some(tx_value),
            chain_id: Some(self.chain_id),
            gas_price: *gas_price,
            ..Default::default()
        };

        // Estimation failures split three ways: an insufficient-gas verdict
        // caps the limit from the message's own budget and sends anyway, a
        // strict budget miss fails the message, and anything else aborts the
        // whole cycle before any state is written.
        let mut retry_override: Option<u32> = None;
        let gas_limit = match self.provider.estimate_gas(&tx).await {
            Ok(estimated) => {
                let check = self.fee_accountant.check_budget(
                    estimated,
                    tx_value,
                    entry.payload.len(),
                    entry.available_gas_balance,
                );
                if check == BudgetCheck::InsufficientGas {
                    return Ok(Staged::Terminal {
                        update: MessageApprovedUpdate {
                            id: entry.id.clone(),
                            status: Some(MessageApprovedStatus::Failed),
                            ..Default::default()
                        },
                        reason: CannotExecuteReason::InsufficientGas,
                        details: format!(
                            "Budget {} cannot cover estimated gas {}",
                            entry.available_gas_balance, estimated
                        ),
                    });
                }
                estimated
            }
            Err(ProviderError::InsufficientGas(details)) => {
                // The node will not estimate an underfunded call. Derive the
                // limit from the attached budget and spend the message's last
                // retries on it rather than an open-ended sequence.
                warn!("Gas estimation for {} hit funding limits: {}", entry.id, details);
                retry_override = Some((self.max_retries - 1).max(entry.retry_count + 1));
                self.fee_accountant
                    .gas_limit_from_fee_budget(entry.available_gas_balance, entry.payload.len())
            }
            Err(e) => {
                return Err(ExecutorError::GasEstimation(format!(
                    "{} (entry {})",
                    e, entry.id
                )));
            }
        };

        let cycle_nonce = match nonce {
            Some(n) => *n,
            None => {
                let fetched = self
                    .provider
                    .get_transaction_count(self.signer.address())
                    .await
                    .map_err(|e| ExecutorError::NonceResolution(e.to_string()))?;
                *nonce = Some(fetched);
                fetched
            }
        };

        tx.nonce = Some(cycle_nonce);
        tx.gas = Some(gas_limit);
        let signed = self.signer.sign_transaction(tx).await?;

        // The nonce is consumed speculatively: later entries in this cycle
        // sequence behind this candidate whether or not the node accepts it.
        *nonce = Some(cycle_nonce + 1);

        let commit = MessageApprovedUpdate {
            id: entry.id.clone(),
            retry_count: Some(retry_override.unwrap_or(entry.retry_count + 1)),
            execute_tx_hash: Some(Some(signed.hash.clone())),
            ..Default::default()
        };
        // A rejected candidate gets its hash cleared but no free retry: the
        // attempt consumed node-side work and the floor stops hot-looping on
        // an entry the node keeps rejecting.
        let rollback = MessageApprovedUpdate {
            id: entry.id.clone(),
            retry_count: Some(entry.retry_count.max(1)),
            execute_tx_hash: Some(None),
            ..Default::default()
        };

        Ok(Staged::Candidate(Candidate {
            signed,
            commit,
            rollback,
        }))
    }

    fn execute_calldata(&self, entry: &MessageApproved) -> Bytes {
        executeCall {
            sourceChain: entry.source_chain.clone(),
            messageId: entry.message_id.clone(),
            sourceAddress: entry.source_address.clone(),
            payload: entry.payload.clone(),
        }
        .abi_encode()
        .into()
    }

    fn is_its_deploy(&self, entry: &MessageApproved) -> bool {
        if entry.destination_address.parse::<Address>() != Ok(self.its_address) {
            return false;
        }
        entry.payload.len() >= 32
            && U256::from_be_slice(&entry.payload[..32]) == U256::from(ITS_DEPLOY_TAG)
    }
}

enum Staged {
    Candidate(Candidate),
    Terminal {
        update: MessageApprovedUpdate,
        reason: CannotExecuteReason,
        details: String,
    },
    Deferred,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::{DEFAULT_MAX_RETRIES, MAX_GAS_LIMIT},
        models::ProtocolClientError,
        repositories::MockMessageApprovedRepository,
        services::{MockChainProviderTrait, MockProtocolClientTrait, MockRelayerSignerTrait},
        utils::mocks::create_message_approved,
    };
    use mockall::predicate::eq;

    const PAGE_SIZE: u32 = 10;
    const ITS: Address = Address::repeat_byte(0x77);
    const RELAYER: Address = Address::repeat_byte(0x99);

    struct Harness {
        messages: MockMessageApprovedRepository,
        provider: MockChainProviderTrait,
        signer: MockRelayerSignerTrait,
        protocol: MockProtocolClientTrait,
    }

    impl Harness {
        fn new() -> Self {
            let mut signer = MockRelayerSignerTrait::new();
            signer.expect_address().return_const(RELAYER);
            Self {
                messages: MockMessageApprovedRepository::new(),
                provider: MockChainProviderTrait::new(),
                signer,
                protocol: MockProtocolClientTrait::new(),
            }
        }

        fn engine(self) -> ExecutionEngine {
            ExecutionEngine::new(
                Arc::new(self.messages),
                Arc::new(self.provider),
                Arc::new(self.signer),
                Arc::new(self.protocol),
                Arc::new(FeeAccountant::new(MAX_GAS_LIMIT, false)),
                "testchain".to_string(),
                1337,
                ITS,
                PAGE_SIZE,
                DEFAULT_MAX_RETRIES,
            )
        }
    }

    fn expect_single_page(messages: &mut MockMessageApprovedRepository, entries: Vec<MessageApproved>) {
        messages
            .expect_find_pending()
            .returning(move |page, _| {
                if page == 1 {
                    Ok(entries.clone())
                } else {
                    Ok(vec![])
                }
            });
    }

    fn signed(hash: &str) -> SignedTransaction {
        SignedTransaction {
            hash: hash.to_string(),
            raw: Bytes::from(vec![0xfeu8]),
        }
    }

    #[tokio::test]
    async fn test_cycle_submits_candidate_and_records_hash() {
        let mut h = Harness::new();
        let entry = create_message_approved("0xmsg-1");
        let entry_id = entry.id.clone();
        expect_single_page(&mut h.messages, vec![entry]);

        h.provider.expect_get_gas_price().returning(|| Ok(1_000_000_000));
        h.provider.expect_estimate_gas().returning(|_| Ok(100_000));
        h.provider
            .expect_get_transaction_count()
            .with(eq(RELAYER))
            .returning(|_| Ok(5));
        h.signer
            .expect_sign_transaction()
            .returning(|_| Ok(signed("0xcand")));
        h.provider
            .expect_send_raw_transactions()
            .returning(|_| Ok(vec!["0xcand".to_string()]));
        h.messages
            .expect_update_many_partial()
            .withf(move |updates| {
                updates.len() == 1
                    && updates[0].id == entry_id
                    && updates[0].execute_tx_hash == Some(Some("0xcand".to_string()))
                    && updates[0].retry_count == Some(1)
                    && updates[0].status.is_none()
            })
            .returning(|_| Ok(()));

        let report = h.engine().run_cycle().await.unwrap();
        assert_eq!(report.submitted, 1);
        assert_eq!(report.rolled_back, 0);
    }

    #[tokio::test]
    async fn test_nonce_increments_across_entries_in_cycle() {
        let mut h = Harness::new();
        let entries = vec![
            create_message_approved("0xmsg-a"),
            create_message_approved("0xmsg-b"),
        ];
        expect_single_page(&mut h.messages, entries);

        h.provider.expect_get_gas_price().returning(|| Ok(1_000_000_000));
        h.provider.expect_estimate_gas().returning(|_| Ok(100_000));
        // Nonce fetched once for the whole cycle.
        h.provider
            .expect_get_transaction_count()
            .times(1)
            .returning(|_| Ok(7));

        let mut seq = mockall::Sequence::new();
        h.signer
            .expect_sign_transaction()
            .withf(|tx| tx.nonce == Some(7))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(signed("0xfirst")));
        h.signer
            .expect_sign_transaction()
            .withf(|tx| tx.nonce == Some(8))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(signed("0xsecond")));

        h.provider
            .expect_send_raw_transactions()
            .returning(|_| Ok(vec!["0xfirst".to_string(), "0xsecond".to_string()]));
        h.messages
            .expect_update_many_partial()
            .returning(|_| Ok(()));

        let report = h.engine().run_cycle().await.unwrap();
        assert_eq!(report.submitted, 2);
    }

    #[tokio::test]
    async fn test_partial_send_rolls_back_unsent_candidate() {
        let mut h = Harness::new();
        let first = create_message_approved("0xmsg-a");
        let second = create_message_approved("0xmsg-b");
        let second_id = second.id.clone();
        expect_single_page(&mut h.messages, vec![first, second]);

        h.provider.expect_get_gas_price().returning(|| Ok(1_000_000_000));
        h.provider.expect_estimate_gas().returning(|_| Ok(100_000));
        h.provider
            .expect_get_transaction_count()
            .returning(|_| Ok(0));

        let mut hashes = vec!["0xone", "0xtwo"].into_iter();
        h.signer
            .expect_sign_transaction()
            .returning(move |_| Ok(signed(hashes.next().unwrap())));

        // Node accepts only the first transaction.
        h.provider
            .expect_send_raw_transactions()
            .returning(|_| Ok(vec!["0xone".to_string()]));

        h.messages
            .expect_update_many_partial()
            .withf(move |updates| {
                let rolled = updates.iter().find(|u| u.id == second_id).unwrap();
                // Cleared hash, retry floored at one: no free retry.
                rolled.execute_tx_hash == Some(None) && rolled.retry_count == Some(1)
            })
            .returning(|_| Ok(()));

        let report = h.engine().run_cycle().await.unwrap();
        assert_eq!(report.submitted, 1);
        assert_eq!(report.rolled_back, 1);
    }

    #[tokio::test]
    async fn test_outright_send_failure_persists_nothing() {
        let mut h = Harness::new();
        expect_single_page(&mut h.messages, vec![create_message_approved("0xmsg-a")]);

        h.provider.expect_get_gas_price().returning(|| Ok(1_000_000_000));
        h.provider.expect_estimate_gas().returning(|_| Ok(100_000));
        h.provider
            .expect_get_transaction_count()
            .returning(|_| Ok(0));
        h.signer
            .expect_sign_transaction()
            .returning(|_| Ok(signed("0xcand")));
        h.provider
            .expect_send_raw_transactions()
            .returning(|_| Err(ProviderError::Timeout));
        h.messages.expect_update_many_partial().times(0);

        let report = h.engine().run_cycle().await.unwrap();
        assert_eq!(report.submitted, 0);
    }

    #[tokio::test]
    async fn test_retry_ceiling_marks_failed_and_notifies_hub() {
        let mut h = Harness::new();
        let mut entry = create_message_approved("0xmsg-dead");
        entry.retry_count = DEFAULT_MAX_RETRIES;
        let entry_id = entry.id.clone();
        expect_single_page(&mut h.messages, vec![entry]);

        h.messages
            .expect_update_many_partial()
            .withf(move |updates| {
                updates.len() == 1
                    && updates[0].id == entry_id
                    && updates[0].status == Some(MessageApprovedStatus::Failed)
            })
            .returning(|_| Ok(()));
        h.protocol
            .expect_notify_cannot_execute()
            .times(1)
            .returning(|_, _| Ok(()));

        let report = h.engine().run_cycle().await.unwrap();
        assert_eq!(report.failed_terminal, 1);
        assert_eq!(report.submitted, 0);
    }

    #[tokio::test]
    async fn test_failed_hub_report_keeps_terminal_mark_unwritten() {
        let mut h = Harness::new();
        let mut entry = create_message_approved("0xmsg-dead");
        entry.retry_count = DEFAULT_MAX_RETRIES;
        expect_single_page(&mut h.messages, vec![entry]);

        h.protocol
            .expect_notify_cannot_execute()
            .times(1)
            .returning(|_, _| Err(ProtocolClientError::Retriable("hub unreachable".to_string())));
        // The row stays pending until the hub has taken the report, so the
        // next cycle re-attempts the delivery.
        h.messages.expect_update_many_partial().times(0);

        assert!(h.engine().run_cycle().await.is_err());
    }

    #[tokio::test]
    async fn test_drained_page_is_reread_in_place() {
        let mut h = Harness::new();
        let entries: Vec<MessageApproved> = (0..PAGE_SIZE)
            .map(|i| create_message_approved(&format!("0xmsg-{}", i)))
            .collect();

        // A fully-submitted page leaves the eligible set, so the follow-up
        // query stays on page one instead of skipping ahead.
        let mut seq = mockall::Sequence::new();
        h.messages
            .expect_find_pending()
            .with(eq(1u32), eq(PAGE_SIZE))
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, _| Ok(entries.clone()));
        h.messages
            .expect_find_pending()
            .with(eq(1u32), eq(PAGE_SIZE))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec![]));

        h.provider.expect_get_gas_price().returning(|| Ok(1_000_000_000));
        h.provider.expect_estimate_gas().returning(|_| Ok(100_000));
        h.provider
            .expect_get_transaction_count()
            .returning(|_| Ok(0));
        let mut next = 0u32;
        h.signer
            .expect_sign_transaction()
            .returning(move |_| {
                next += 1;
                Ok(signed(&format!("0xh{}", next)))
            });
        h.provider
            .expect_send_raw_transactions()
            .returning(|_| Ok((1..=PAGE_SIZE).map(|i| format!("0xh{}", i)).collect()));
        h.messages
            .expect_update_many_partial()
            .returning(|_| Ok(()));

        let report = h.engine().run_cycle().await.unwrap();
        assert_eq!(report.submitted, PAGE_SIZE as usize);
    }

    #[tokio::test]
    async fn test_deferred_page_advances_cursor() {
        let mut h = Harness::new();
        let entries: Vec<MessageApproved> = (0..PAGE_SIZE)
            .map(|i| {
                let mut entry = create_message_approved(&format!("0xmsg-{}", i));
                entry.execute_tx_hash = Some(format!("0xprior{}", i));
                entry
            })
            .collect();

        let mut seq = mockall::Sequence::new();
        h.messages
            .expect_find_pending()
            .with(eq(1u32), eq(PAGE_SIZE))
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, _| Ok(entries.clone()));
        h.messages
            .expect_find_pending()
            .with(eq(2u32), eq(PAGE_SIZE))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec![]));

        h.provider
            .expect_get_transaction_status()
            .returning(|_| Ok(ChainTransactionStatus::Pending));
        h.messages.expect_update_many_partial().times(0);

        let report = h.engine().run_cycle().await.unwrap();
        assert_eq!(report.deferred, PAGE_SIZE as usize);
    }

    #[tokio::test]
    async fn test_empty_payload_fails_immediately() {
        let mut h = Harness::new();
        let mut entry = create_message_approved("0xmsg-empty");
        entry.payload = Bytes::new();
        expect_single_page(&mut h.messages, vec![entry]);

        h.messages
            .expect_update_many_partial()
            .withf(|updates| updates[0].status == Some(MessageApprovedStatus::Failed))
            .returning(|_| Ok(()));
        h.protocol
            .expect_notify_cannot_execute()
            .times(1)
            .returning(|_, _| Ok(()));

        let report = h.engine().run_cycle().await.unwrap();
        assert_eq!(report.failed_terminal, 1);
    }

    #[tokio::test]
    async fn test_fatal_estimation_error_aborts_cycle() {
        let mut h = Harness::new();
        expect_single_page(&mut h.messages, vec![create_message_approved("0xmsg-a")]);

        h.provider.expect_get_gas_price().returning(|| Ok(1_000_000_000));
        h.provider
            .expect_estimate_gas()
            .returning(|_| Err(ProviderError::RpcError("node down".to_string())));
        h.messages.expect_update_many_partial().times(0);

        assert!(h.engine().run_cycle().await.is_err());
    }

    #[tokio::test]
    async fn test_insufficient_gas_estimate_caps_limit_and_spends_retries() {
        let mut h = Harness::new();
        let entry = create_message_approved("0xmsg-poor");
        let budget = entry.available_gas_balance;
        let payload_len = entry.payload.len();
        expect_single_page(&mut h.messages, vec![entry]);

        let expected_limit = FeeAccountant::new(MAX_GAS_LIMIT, false)
            .gas_limit_from_fee_budget(budget, payload_len);

        h.provider.expect_get_gas_price().returning(|| Ok(1_000_000_000));
        h.provider
            .expect_estimate_gas()
            .returning(|_| Err(ProviderError::InsufficientGas("insufficient funds".to_string())));
        h.provider
            .expect_get_transaction_count()
            .returning(|_| Ok(0));
        h.signer
            .expect_sign_transaction()
            .withf(move |tx| tx.gas == Some(expected_limit))
            .returning(|_| Ok(signed("0xcapped")));
        h.provider
            .expect_send_raw_transactions()
            .returning(|_| Ok(vec!["0xcapped".to_string()]));
        h.messages
            .expect_update_many_partial()
            .withf(|updates| updates[0].retry_count == Some(DEFAULT_MAX_RETRIES - 1))
            .returning(|_| Ok(()));

        let report = h.engine().run_cycle().await.unwrap();
        assert_eq!(report.submitted, 1);
    }

    #[tokio::test]
    async fn test_pending_prior_execution_defers_entry() {
        let mut h = Harness::new();
        let mut entry = create_message_approved("0xmsg-wait");
        entry.execute_tx_hash = Some("0xprior".to_string());
        expect_single_page(&mut h.messages, vec![entry]);

        h.provider
            .expect_get_transaction_status()
            .withf(|hash| hash == "0xprior")
            .returning(|_| Ok(ChainTransactionStatus::Pending));
        h.messages.expect_update_many_partial().times(0);
        h.signer.expect_sign_transaction().times(0);

        let report = h.engine().run_cycle().await.unwrap();
        assert_eq!(report.deferred, 1);
    }

    #[tokio::test]
    async fn test_its_deploy_second_phase_attaches_issue_value() {
        let mut h = Harness::new();
        let mut entry = create_message_approved("0xmsg-its");
        entry.destination_address = ITS.to_string();
        // Deployment-tagged payload, first execution confirmed.
        let mut payload = vec![0u8; 32];
        payload[31] = 1;
        entry.payload = Bytes::from(payload);
        entry.execute_tx_hash = Some("0xphase1".to_string());
        entry.success_times = Some(1);
        expect_single_page(&mut h.messages, vec![entry]);

        h.provider
            .expect_get_transaction_status()
            .withf(|hash| hash == "0xphase1")
            .returning(|_| Ok(ChainTransactionStatus::Succeeded));
        h.provider.expect_get_gas_price().returning(|| Ok(1_000_000_000));
        h.provider.expect_estimate_gas().returning(|_| Ok(200_000));
        h.provider
            .expect_get_transaction_count()
            .returning(|_| Ok(0));
        h.signer
            .expect_sign_transaction()
            .withf(|tx| tx.value == Some(U256::from(ITS_TOKEN_ISSUE_VALUE)))
            .returning(|_| Ok(signed("0xphase2")));
        h.provider
            .expect_send_raw_transactions()
            .returning(|_| Ok(vec!["0xphase2".to_string()]));
        h.messages
            .expect_update_many_partial()
            .withf(|updates| updates[0].execute_tx_hash == Some(Some("0xphase2".to_string())))
            .returning(|_| Ok(()));

        let report = h.engine().run_cycle().await.unwrap();
        assert_eq!(report.submitted, 1);
    }

    #[tokio::test]
    async fn test_confirmed_non_its_execution_is_left_to_reconciler() {
        let mut h = Harness::new();
        let mut entry = create_message_approved("0xmsg-done");
        entry.execute_tx_hash = Some("0xlanded".to_string());
        expect_single_page(&mut h.messages, vec![entry]);

        h.provider
            .expect_get_transaction_status()
            .returning(|_| Ok(ChainTransactionStatus::Succeeded));
        h.messages.expect_update_many_partial().times(0);
        h.signer.expect_sign_transaction().times(0);

        let report = h.engine().run_cycle().await.unwrap();
        assert_eq!(report.deferred, 1);
    }
}
