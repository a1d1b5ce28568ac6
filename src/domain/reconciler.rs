//! Reconciliation loop: converges persisted state with what actually
//! happened on chain.
//!
//! Two independent passes per cycle. The message pass polls stale execution
//! candidates and records confirmed sub-executions, feeding the second phase
//! of ITS deployments. The in-flight pass polls the TTL'd hash set of
//! submitted transactions; confirmed ones have their logs classified, which
//! is where `MessageExecuted` finalizes rows and newly discovered events
//! enter the pipeline.

use std::sync::Arc;

use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    domain::classifier::EventClassifier,
    models::{
        ChainTransactionStatus, MessageApprovedUpdate, ProtocolClientError, ProtocolEvent,
        ProviderError, RepositoryError,
    },
    repositories::MessageApprovedRepositoryTrait,
    services::{ChainProviderTrait, ProtocolClientTrait},
    utils::InflightTxTracker,
};

#[derive(Error, Debug)]
pub enum ReconcilerError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Hub error: {0}")]
    Protocol(#[from] ProtocolClientError),

    #[error("Tracking error: {0}")]
    Tracking(#[from] redis::RedisError),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ReconcileReport {
    pub confirmed_executions: usize,
    pub classified_transactions: usize,
    pub dropped_hashes: usize,
    pub forwarded_events: usize,
    pub rejected_events: usize,
}

pub struct Reconciler {
    messages: Arc<dyn MessageApprovedRepositoryTrait>,
    provider: Arc<dyn ChainProviderTrait>,
    protocol_client: Arc<dyn ProtocolClientTrait>,
    classifier: Arc<EventClassifier>,
    inflight: Arc<dyn InflightTxTracker>,
    chain_name: String,
    page_size: u32,
}

impl Reconciler {
    pub fn new(
        messages: Arc<dyn MessageApprovedRepositoryTrait>,
        provider: Arc<dyn ChainProviderTrait>,
        protocol_client: Arc<dyn ProtocolClientTrait>,
        classifier: Arc<EventClassifier>,
        inflight: Arc<dyn InflightTxTracker>,
        chain_name: String,
        page_size: u32,
    ) -> Self {
        Self {
            messages,
            provider,
            protocol_client,
            classifier,
            inflight,
            chain_name,
            page_size,
        }
    }

    pub async fn run_cycle(&self) -> Result<ReconcileReport, ReconcilerError> {
        let mut report = ReconcileReport::default();
        self.reconcile_messages(&mut report).await?;
        self.reconcile_inflight(&mut report).await?;

        if report.confirmed_executions + report.classified_transactions + report.dropped_hashes > 0
        {
            info!(
                "Reconciled: {} executions confirmed, {} transactions classified, {} hashes dropped",
                report.confirmed_executions, report.classified_transactions, report.dropped_hashes
            );
        }
        Ok(report)
    }

    /// Pass (a): messages whose candidate execution went stale without a
    /// recorded sub-execution. A confirmed candidate bumps `success_times`;
    /// a failed or vanished one is left for the engine's retry path.
    async fn reconcile_messages(&self, report: &mut ReconcileReport) -> Result<(), ReconcilerError> {
        let mut page = 1u32;
        loop {
            let entries = self
                .messages
                .find_stale_with_execute_hash(page, self.page_size)
                .await?;
            if entries.is_empty() {
                break;
            }
            let page_full = entries.len() == self.page_size as usize;

            let mut updates = Vec::new();
            for entry in &entries {
                let Some(hash) = entry.execute_tx_hash.as_deref() else {
                    continue;
                };
                match self.provider.get_transaction_status(hash).await? {
                    ChainTransactionStatus::Succeeded => {
                        report.confirmed_executions += 1;
                        updates.push(MessageApprovedUpdate {
                            id: entry.id.clone(),
                            success_times: Some(entry.success_times.unwrap_or(0) + 1),
                            ..Default::default()
                        });
                    }
                    ChainTransactionStatus::Pending => {
                        debug!("Execution {} of {} still pending", hash, entry.id);
                    }
                    ChainTransactionStatus::Failed | ChainTransactionStatus::NotFound => {
                        debug!("Execution {} of {} did not land", hash, entry.id);
                    }
                }
            }
            if !updates.is_empty() {
                self.messages.update_many_partial(updates).await?;
            }

            if !page_full {
                break;
            }
            page += 1;
        }
        Ok(())
    }

    /// Pass (b): submitted transactions awaiting confirmation. Confirmed
    /// ones get their logs classified and the resulting protocol events
    /// forwarded; failed ones just leave the set.
    async fn reconcile_inflight(&self, report: &mut ReconcileReport) -> Result<(), ReconcilerError> {
        for tx_hash in self.inflight.list().await? {
            match self.provider.get_transaction_status(&tx_hash).await? {
                ChainTransactionStatus::Pending => {}
                ChainTransactionStatus::Failed | ChainTransactionStatus::NotFound => {
                    self.inflight.remove(&tx_hash).await?;
                    report.dropped_hashes += 1;
                }
                ChainTransactionStatus::Succeeded => {
                    let logs = self.provider.get_transaction_logs(&tx_hash).await?;
                    let outcome = self.classifier.classify(logs).await?;
                    report.classified_transactions += 1;

                    if !outcome.protocol_events.is_empty() {
                        report.forwarded_events += outcome.protocol_events.len();
                        self.forward_events(outcome.protocol_events, report).await?;
                    }
                    self.inflight.remove(&tx_hash).await?;
                }
            }
        }
        Ok(())
    }

    async fn forward_events(
        &self,
        events: Vec<ProtocolEvent>,
        report: &mut ReconcileReport,
    ) -> Result<(), ReconcilerError> {
        let response = self
            .protocol_client
            .post_events(&self.chain_name, events)
            .await?;

        let mut retriable = 0usize;
        for result in &response.results {
            if !result.accepted {
                if result.retriable {
                    retriable += 1;
                } else {
                    report.rejected_events += 1;
                    warn!(
                        "Hub permanently rejected event: {}",
                        result.error.as_deref().unwrap_or("no detail")
                    );
                }
            }
        }
        // Retriable rejections re-raise so the whole batch comes back on the
        // next cycle; the creates behind it are idempotent.
        if retriable > 0 {
            return Err(ReconcilerError::Protocol(ProtocolClientError::Retriable(
                format!("{} events rejected retriably", retriable),
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::{
        primitives::{keccak256, Address, Bytes},
        sol_types::SolEvent,
    };

    use crate::{
        models::{PostEventResult, PostEventsResponse, RawChainEvent},
        repositories::{
            MockContractCallEventRepository, MockGasPaymentRepository,
            MockMessageApprovedRepository,
        },
        services::{decoder, MockChainProviderTrait, MockProtocolClientTrait},
        utils::{mocks::create_message_approved, MockInflightTxTracker},
    };

    const GATEWAY: Address = Address::repeat_byte(0x0a);

    struct Harness {
        messages: MockMessageApprovedRepository,
        provider: MockChainProviderTrait,
        protocol: MockProtocolClientTrait,
        inflight: MockInflightTxTracker,
        classifier_messages: MockMessageApprovedRepository,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                messages: MockMessageApprovedRepository::new(),
                provider: MockChainProviderTrait::new(),
                protocol: MockProtocolClientTrait::new(),
                inflight: MockInflightTxTracker::new(),
                classifier_messages: MockMessageApprovedRepository::new(),
            }
        }

        fn no_stale_messages(&mut self) {
            self.messages
                .expect_find_stale_with_execute_hash()
                .returning(|_, _| Ok(vec![]));
        }

        fn empty_inflight(&mut self) {
            self.inflight.expect_list().returning(|| Ok(vec![]));
        }

        fn reconciler(self) -> Reconciler {
            let classifier = Arc::new(EventClassifier::new(
                Arc::new(MockContractCallEventRepository::new()),
                Arc::new(self.classifier_messages),
                Arc::new(MockGasPaymentRepository::new()),
                "testchain".to_string(),
                GATEWAY,
                Address::repeat_byte(0x0b),
                Address::repeat_byte(0x0c),
            ));
            Reconciler::new(
                Arc::new(self.messages),
                Arc::new(self.provider),
                Arc::new(self.protocol),
                classifier,
                Arc::new(self.inflight),
                "testchain".to_string(),
                10,
            )
        }
    }

    #[tokio::test]
    async fn test_confirmed_stale_execution_bumps_success_times() {
        let mut h = Harness::new();
        let mut entry = create_message_approved("0xmsg-stale");
        entry.execute_tx_hash = Some("0xlanded".to_string());
        entry.success_times = Some(0);
        let entry_id = entry.id.clone();
        h.messages
            .expect_find_stale_with_execute_hash()
            .returning(move |page, _| {
                if page == 1 {
                    Ok(vec![entry.clone()])
                } else {
                    Ok(vec![])
                }
            });
        h.messages
            .expect_update_many_partial()
            .withf(move |updates| {
                updates.len() == 1
                    && updates[0].id == entry_id
                    && updates[0].success_times == Some(1)
                    && updates[0].status.is_none()
            })
            .returning(|_| Ok(()));
        h.provider
            .expect_get_transaction_status()
            .returning(|_| Ok(ChainTransactionStatus::Succeeded));
        h.empty_inflight();

        let report = h.reconciler().run_cycle().await.unwrap();
        assert_eq!(report.confirmed_executions, 1);
    }

    #[tokio::test]
    async fn test_failed_stale_execution_left_for_engine() {
        let mut h = Harness::new();
        let mut entry = create_message_approved("0xmsg-failed");
        entry.execute_tx_hash = Some("0xreverted".to_string());
        h.messages
            .expect_find_stale_with_execute_hash()
            .returning(move |page, _| {
                if page == 1 {
                    Ok(vec![entry.clone()])
                } else {
                    Ok(vec![])
                }
            });
        h.messages.expect_update_many_partial().times(0);
        h.provider
            .expect_get_transaction_status()
            .returning(|_| Ok(ChainTransactionStatus::Failed));
        h.empty_inflight();

        let report = h.reconciler().run_cycle().await.unwrap();
        assert_eq!(report.confirmed_executions, 0);
    }

    #[tokio::test]
    async fn test_confirmed_inflight_tx_is_classified_and_dropped() {
        let mut h = Harness::new();
        h.no_stale_messages();
        h.inflight
            .expect_list()
            .returning(|| Ok(vec!["0xdone".to_string()]));
        h.inflight
            .expect_remove()
            .withf(|hash| hash == "0xdone")
            .times(1)
            .returning(|_| Ok(()));

        h.provider
            .expect_get_transaction_status()
            .returning(|_| Ok(ChainTransactionStatus::Succeeded));
        // The confirmed transaction executed a message.
        let log = decoder::MessageExecuted {
            commandId: keccak256(b"cmd"),
            sourceChain: "sourcechain".to_string(),
            messageId: "0xorigin-1".to_string(),
        }
        .encode_log_data();
        h.provider.expect_get_transaction_logs().returning(move |_| {
            Ok(vec![RawChainEvent {
                tx_hash: "0xdone".to_string(),
                event_index: 0,
                address: GATEWAY,
                topics: log.topics().to_vec(),
                data: log.data.clone(),
            }])
        });
        h.classifier_messages
            .expect_mark_executed()
            .times(1)
            .returning(|_, _| Ok(None));
        h.protocol.expect_post_events().returning(|_, events| {
            Ok(PostEventsResponse {
                results: events
                    .iter()
                    .map(|_| PostEventResult {
                        accepted: true,
                        retriable: false,
                        error: None,
                    })
                    .collect(),
            })
        });

        let report = h.reconciler().run_cycle().await.unwrap();
        assert_eq!(report.classified_transactions, 1);
        assert_eq!(report.forwarded_events, 1);
    }

    #[tokio::test]
    async fn test_failed_inflight_tx_is_dropped_without_classification() {
        let mut h = Harness::new();
        h.no_stale_messages();
        h.inflight
            .expect_list()
            .returning(|| Ok(vec!["0xgone".to_string()]));
        h.inflight.expect_remove().times(1).returning(|_| Ok(()));
        h.provider
            .expect_get_transaction_status()
            .returning(|_| Ok(ChainTransactionStatus::NotFound));
        h.provider.expect_get_transaction_logs().times(0);

        let report = h.reconciler().run_cycle().await.unwrap();
        assert_eq!(report.dropped_hashes, 1);
    }

    #[tokio::test]
    async fn test_retriable_hub_rejection_re_raises() {
        let mut h = Harness::new();
        h.protocol.expect_post_events().returning(|_, _| {
            Ok(PostEventsResponse {
                results: vec![PostEventResult {
                    accepted: false,
                    retriable: true,
                    error: Some("busy".to_string()),
                }],
            })
        });

        let rec = h.reconciler();
        let events = vec![ProtocolEvent::SignersRotated {
            event_id: "testchain_0xtx-0".to_string(),
            epoch: 1,
            signers_hash: "0x11".to_string(),
        }];
        let mut report = ReconcileReport::default();
        assert!(rec.forward_events(events, &mut report).await.is_err());
    }

    #[tokio::test]
    async fn test_permanent_hub_rejection_is_dropped() {
        let mut h = Harness::new();
        h.protocol.expect_post_events().returning(|_, _| {
            Ok(PostEventsResponse {
                results: vec![PostEventResult {
                    accepted: false,
                    retriable: false,
                    error: Some("malformed".to_string()),
                }],
            })
        });

        let rec = h.reconciler();
        let events = vec![ProtocolEvent::SignersRotated {
            event_id: "testchain_0xtx-0".to_string(),
            epoch: 1,
            signers_hash: "0x11".to_string(),
        }];
        let mut report = ReconcileReport::default();
        assert!(rec.forward_events(events, &mut report).await.is_ok());
        assert_eq!(report.rejected_events, 1);
    }
}
