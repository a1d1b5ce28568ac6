//! Reconciliation sweep, fired on a cron schedule.
//!
//! Confirms stale candidate executions, classifies the logs of landed
//! in-flight transactions, and forwards the resulting protocol events.
//! Permanent hub rejections raise an operator alert.

use apalis::prelude::{Attempt, Data, *};
use eyre::Result;
use log::warn;
use std::sync::Arc;

use crate::{
    constants::{TASK_LOCK_TTL_MS, WORKER_DEFAULT_MAXIMUM_RETRIES},
    domain::{EventClassifier, Reconciler},
    jobs::{handle_result, AlertSend},
    models::AppState,
    services::{AlertSeverity, OperatorAlert},
};

#[derive(Default, Debug, Clone)]
pub struct ReconciliationCronReminder();

impl From<chrono::DateTime<chrono::Utc>> for ReconciliationCronReminder {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self()
    }
}

pub async fn reconciliation_handler(
    _job: ReconciliationCronReminder,
    state: Data<AppState>,
    attempt: Attempt,
) -> Result<(), Error> {
    let result = handle_request(&state).await;

    handle_result(
        result,
        attempt,
        "Reconciliation",
        WORKER_DEFAULT_MAXIMUM_RETRIES,
    )
}

async fn handle_request(state: &AppState) -> Result<()> {
    if !state
        .task_lock
        .try_acquire("reconciliation", TASK_LOCK_TTL_MS)
        .await?
    {
        return Ok(());
    }

    let classifier = Arc::new(EventClassifier::new(
        Arc::clone(&state.contract_call_events),
        Arc::clone(&state.messages),
        Arc::clone(&state.gas_payments),
        state.config.chain_name.clone(),
        state.config.gateway_address,
        state.config.gas_service_address,
        state.config.its_address,
    ));
    let reconciler = Reconciler::new(
        Arc::clone(&state.messages),
        Arc::clone(&state.provider),
        Arc::clone(&state.protocol_client),
        classifier,
        Arc::clone(&state.inflight),
        state.config.chain_name.clone(),
        state.config.page_size,
    );
    let cycle = reconciler.run_cycle().await;

    if let Err(e) = state.task_lock.release("reconciliation").await {
        warn!("Failed to release reconciliation lock: {}", e);
    }

    let report = cycle?;
    if report.rejected_events > 0 {
        let alert = OperatorAlert::new(
            "hub_rejection",
            &state.config.chain_name,
            AlertSeverity::Warning,
            format!(
                "{} protocol events were permanently rejected by the hub",
                report.rejected_events
            ),
        );
        state
            .job_producer
            .produce_send_alert_job(AlertSend::new(alert), None)
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cron_reminder_is_constructible() {
        let reminder = ReconciliationCronReminder::default();
        assert!(format!("{:?}", reminder).contains("ReconciliationCronReminder"));
    }
}
