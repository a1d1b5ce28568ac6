//! Execution drain cycle, fired on a short cron schedule.
//!
//! Each tick takes the cluster-wide execution lock, drains the pending
//! approved messages in nonce-sequenced batches, and records submitted
//! hashes for the reconciler to confirm.

use apalis::prelude::{Attempt, Data, *};
use eyre::Result;
use log::{info, warn};
use std::sync::Arc;

use crate::{
    constants::{TASK_LOCK_TTL_MS, WORKER_DEFAULT_MAXIMUM_RETRIES},
    domain::ExecutionEngine,
    jobs::handle_result,
    models::AppState,
};

#[derive(Default, Debug, Clone)]
pub struct ExecutionCronReminder();

impl From<chrono::DateTime<chrono::Utc>> for ExecutionCronReminder {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self()
    }
}

pub async fn execution_cycle_handler(
    _job: ExecutionCronReminder,
    state: Data<AppState>,
    attempt: Attempt,
) -> Result<(), Error> {
    let result = handle_request(&state).await;

    handle_result(result, attempt, "Execution", WORKER_DEFAULT_MAXIMUM_RETRIES)
}

async fn handle_request(state: &AppState) -> Result<()> {
    if !state
        .task_lock
        .try_acquire("execution", TASK_LOCK_TTL_MS)
        .await?
    {
        return Ok(());
    }

    let engine = ExecutionEngine::new(
        Arc::clone(&state.messages),
        Arc::clone(&state.provider),
        Arc::clone(&state.signer),
        Arc::clone(&state.protocol_client),
        Arc::clone(&state.fee_accountant),
        state.config.chain_name.clone(),
        state.config.chain_id,
        state.config.its_address,
        state.config.page_size,
        state.config.max_retries,
    );
    let cycle = engine.run_cycle().await;

    if let Err(e) = state.task_lock.release("execution").await {
        warn!("Failed to release execution lock: {}", e);
    }

    let report = cycle?;
    for hash in &report.submitted_hashes {
        state.inflight.add(hash).await?;
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

    Ok(())
}
