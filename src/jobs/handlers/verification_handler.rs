//! Verification dispatch sweep, fired on a cron schedule.
//!
//! Walks pending inbound call events and asks the hub to verify each one.

use apalis::prelude::{Attempt, Data, *};
use eyre::Result;
use log::{info, warn};
use std::sync::Arc;

use crate::{
    constants::{TASK_LOCK_TTL_MS, WORKER_DEFAULT_MAXIMUM_RETRIES},
    domain::VerificationDispatcher,
    jobs::handle_result,
    models::AppState,
};

#[derive(Default, Debug, Clone)]
pub struct VerificationCronReminder();

impl From<chrono::DateTime<chrono::Utc>> for VerificationCronReminder {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self()
    }
}

pub async fn verification_handler(
    _job: VerificationCronReminder,
    state: Data<AppState>,
    attempt: Attempt,
) -> Result<(), Error> {
    let result = handle_request(&state).await;

    handle_result(
        result,
        attempt,
        "Verification",
        WORKER_DEFAULT_MAXIMUM_RETRIES,
    )
}

async fn handle_request(state: &AppState) -> Result<()> {
    if !state
        .task_lock
        .try_acquire("verification", TASK_LOCK_TTL_MS)
        .await?
    {
        return Ok(());
    }

    let dispatcher = VerificationDispatcher::new(
        Arc::clone(&state.contract_call_events),
        Arc::clone(&state.protocol_client),
        state.config.page_size,
        state.config.max_retries,
    );
    let cycle = dispatcher.run_cycle().await;

    if let Err(e) = state.task_lock.release("verification").await {
        warn!("Failed to release verification lock: {}", e);
    }

    let report = cycle?;
    if report.examined > 0 {
        info!(
            "Verification cycle: {} examined, {} approved, {} retried, {} failed",
            report.examined, report.approved, report.retried, report.failed_terminal
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cron_reminder_is_constructible() {
        let reminder = VerificationCronReminder::default();
        assert!(format!("{:?}", reminder).contains("VerificationCronReminder"));
    }
}
