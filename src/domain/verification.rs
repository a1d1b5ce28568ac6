//! Verification dispatch: drives pending contract-call events through the
//! hub's verification, with the same cool-down/retry-ceiling lifecycle the
//! execution engine applies to approved messages.

use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;

use crate::{
    models::{
        ContractCallEvent, ContractCallEventUpdate, ContractCallStatus, ProtocolClientError,
        RepositoryError, VerificationOutcome,
    },
    repositories::ContractCallEventRepositoryTrait,
    services::ProtocolClientTrait,
};

#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Hub error: {0}")]
    Protocol(#[from] ProtocolClientError),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct VerificationReport {
    pub examined: usize,
    pub approved: usize,
    pub retried: usize,
    pub failed_terminal: usize,
}

pub struct VerificationDispatcher {
    contract_call_events: Arc<dyn ContractCallEventRepositoryTrait>,
    protocol_client: Arc<dyn ProtocolClientTrait>,
    page_size: u32,
    max_retries: u32,
}

impl VerificationDispatcher {
    pub fn new(
        contract_call_events: Arc<dyn ContractCallEventRepositoryTrait>,
        protocol_client: Arc<dyn ProtocolClientTrait>,
        page_size: u32,
        max_retries: u32,
    ) -> Self {
        Self {
            contract_call_events,
            protocol_client,
            page_size,
            max_retries,
        }
    }

    pub async fn run_cycle(&self) -> Result<VerificationReport, VerificationError> {
        let mut report = VerificationReport::default();
        let mut page = 1u32;

        loop {
            let events = self
                .contract_call_events
                .find_pending(page, self.page_size)
                .await?;
            if events.is_empty() {
                break;
            }
            let page_full = events.len() == self.page_size as usize;
            report.examined += events.len();

            let mut updates = Vec::new();
            for event in events {
                updates.push(self.verify_one(&event, &mut report).await?);
            }
            self.contract_call_events.update_many_partial(updates).await?;

            if !page_full {
                break;
            }
            page += 1;
        }

        if report.examined > 0 {
            info!(
                "Verification cycle: {} examined, {} approved, {} retried, {} failed",
                report.examined, report.approved, report.retried, report.failed_terminal
            );
        }
        Ok(report)
    }

    async fn verify_one(
        &self,
        event: &ContractCallEvent,
        report: &mut VerificationReport,
    ) -> Result<ContractCallEventUpdate, VerificationError> {
        if event.retry_count >= self.max_retries {
            warn!("Verification of {} exhausted retries", event.id);
            report.failed_terminal += 1;
            return Ok(ContractCallEventUpdate {
                id: event.id.clone(),
                status: Some(ContractCallStatus::Failed),
                ..Default::default()
            });
        }

        let message_id = format!("{}-{}", event.tx_hash, event.event_index);
        match self
            .protocol_client
            .verify_message(&event.source_chain, &message_id)
            .await?
        {
            VerificationOutcome::Approved => {
                report.approved += 1;
                Ok(ContractCallEventUpdate {
                    id: event.id.clone(),
                    status: Some(ContractCallStatus::Approved),
                    ..Default::default()
                })
            }
            VerificationOutcome::Error => {
                report.retried += 1;
                Ok(ContractCallEventUpdate {
                    id: event.id.clone(),
                    retry_count: Some(event.retry_count + 1),
                    ..Default::default()
                })
            }
        }
    }
}
