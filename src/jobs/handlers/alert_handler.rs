//! Delivers queued operator alerts to the configured webhook.

use apalis::prelude::{Attempt, Data, *};
use eyre::Result;
use log::{info, warn};

use crate::{
    constants::WORKER_DEFAULT_MAXIMUM_RETRIES,
    jobs::{handle_result, AlertSend, Job},
    models::AppState,
};

pub async fn alert_handler(
    job: Job<AlertSend>,
    state: Data<AppState>,
    attempt: Attempt,
) -> Result<(), Error> {
    info!("Handling alert job: {}", job.data.alert.kind);

    let result = handle_request(job.data, &state).await;

    handle_result(result, attempt, "Alert", WORKER_DEFAULT_MAXIMUM_RETRIES)
}

async fn handle_request(alert_job: AlertSend, state: &AppState) -> Result<()> {
    match &state.alerts {
        Some(alerts) => {
            alerts.send_alert(alert_job.alert).await?;
            Ok(())
        }
        None => {
            warn!(
                "No operator webhook configured, dropping alert: {}",
                alert_job.alert.kind
            );
            Ok(())
        }
    }
}
