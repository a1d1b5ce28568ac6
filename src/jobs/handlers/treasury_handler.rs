//! Hourly treasury sweep: fee collection, unwrapping, balance watch.

use apalis::prelude::{Attempt, Data, *};
use eyre::Result;
use log::{info, warn};
use std::sync::Arc;

use crate::{
    constants::{TASK_LOCK_TTL_MS, WORKER_DEFAULT_MAXIMUM_RETRIES},
    domain::TreasuryMonitor,
    jobs::{handle_result, AlertSend},
    models::AppState,
    services::{AlertSeverity, OperatorAlert},
};

#[derive(Default, Debug, Clone)]
pub struct TreasuryCronReminder();

impl From<chrono::DateTime<chrono::Utc>> for TreasuryCronReminder {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self()
    }
}

pub async fn treasury_handler(
    _job: TreasuryCronReminder,
    state: Data<AppState>,
    attempt: Attempt,
) -> Result<(), Error> {
    let result = handle_request(&state).await;

    handle_result(result, attempt, "Treasury", WORKER_DEFAULT_MAXIMUM_RETRIES)
}

async fn handle_request(state: &AppState) -> Result<()> {
    if !state
        .task_lock
        .try_acquire("treasury", TASK_LOCK_TTL_MS)
        .await?
    {
        return Ok(());
    }

    let monitor = TreasuryMonitor::new(
        Arc::clone(&state.provider),
        Arc::clone(&state.signer),
        Arc::clone(&state.inflight),
        Some(state.redis.clone()),
        state.config.chain_name.clone(),
        state.config.chain_id,
        state.config.gas_service_address,
        state.config.wrapped_token_address,
    );
    let report = monitor.run_cycle().await;

    if let Err(e) = state.task_lock.release("treasury").await {
        warn!("Failed to release treasury lock: {}", e);
    }

    if let Some(hash) = &report.fees_collected {
        info!("Fee collection submitted: {}", hash);
    }
    if let Some(hash) = &report.unwrapped {
        info!("Unwrap submitted: {}", hash);
    }
    if report.low_balance {
        let alert = OperatorAlert::new(
            "low_gas_balance",
            &state.config.chain_name,
            AlertSeverity::Critical,
            "Relayer account balance is below the funding threshold",
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
        let reminder = TreasuryCronReminder::default();
        assert!(format!("{:?}", reminder).contains("TreasuryCronReminder"));
    }
}
