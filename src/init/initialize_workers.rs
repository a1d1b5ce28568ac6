//! Builds the apalis workers and runs the monitor until shutdown.

use apalis::{layers::ErrorHandlingLayer, prelude::*};
use apalis_cron::CronStream;
use color_eyre::eyre::eyre;
use eyre::Result;
use log::{error, info};
use std::{str::FromStr, time::Duration};
use tokio::signal::unix::SignalKind;

use crate::{
    jobs::{
        alert_handler, execution_cycle_handler, reconciliation_handler, treasury_handler,
        verification_handler, BackoffRetryPolicy, Queue,
    },
    models::AppState,
};

const DEFAULT_CONCURRENCY: usize = 2;
const DEFAULT_RATE_LIMIT: u64 = 20;
const DEFAULT_RATE_LIMIT_DURATION: Duration = Duration::from_secs(1);

const EXECUTION_CYCLE: &str = "execution_cycle";
const RECONCILIATION: &str = "reconciliation";
const VERIFICATION: &str = "verification";
const TREASURY: &str = "treasury";
const ALERT_SENDER: &str = "alert_sender";

fn schedule(expr: &str, task: &str) -> Result<apalis_cron::Schedule> {
    apalis_cron::Schedule::from_str(expr)
        .map_err(|e| eyre!("Invalid cron expression {:?} for {}: {}", expr, task, e))
}

/// Registers one cron worker per periodic task plus the alert queue worker,
/// then blocks until SIGINT or SIGTERM.
pub async fn initialize_workers(app_state: AppState, queue: Queue) -> Result<()> {
    let execution_worker = WorkerBuilder::new(EXECUTION_CYCLE)
        .layer(ErrorHandlingLayer::new())
        .enable_tracing()
        .catch_panic()
        .retry(BackoffRetryPolicy::default())
        .concurrency(1)
        .data(app_state.clone())
        .backend(CronStream::new(schedule(
            &app_state.config.execution_schedule,
            EXECUTION_CYCLE,
        )?))
        .build_fn(execution_cycle_handler);

    let reconciliation_worker = WorkerBuilder::new(RECONCILIATION)
        .layer(ErrorHandlingLayer::new())
        .enable_tracing()
        .catch_panic()
        .retry(BackoffRetryPolicy::default())
        .concurrency(1)
        .data(app_state.clone())
        .backend(CronStream::new(schedule(
            &app_state.config.reconciliation_schedule,
            RECONCILIATION,
        )?))
        .build_fn(reconciliation_handler);

    let verification_worker = WorkerBuilder::new(VERIFICATION)
        .layer(ErrorHandlingLayer::new())
        .enable_tracing()
        .catch_panic()
        .retry(BackoffRetryPolicy::default())
        .concurrency(1)
        .data(app_state.clone())
        .backend(CronStream::new(schedule(
            &app_state.config.verification_schedule,
            VERIFICATION,
        )?))
        .build_fn(verification_handler);

    let treasury_worker = WorkerBuilder::new(TREASURY)
        .layer(ErrorHandlingLayer::new())
        .enable_tracing()
        .catch_panic()
        .retry(BackoffRetryPolicy::default())
        .concurrency(1)
        .data(app_state.clone())
        .backend(CronStream::new(schedule(
            &app_state.config.treasury_schedule,
            TREASURY,
        )?))
        .build_fn(treasury_handler);

    let alert_worker = WorkerBuilder::new(ALERT_SENDER)
        .layer(ErrorHandlingLayer::new())
        .enable_tracing()
        .catch_panic()
        .rate_limit(DEFAULT_RATE_LIMIT, DEFAULT_RATE_LIMIT_DURATION)
        .retry(BackoffRetryPolicy::default())
        .concurrency(DEFAULT_CONCURRENCY)
        .data(app_state.clone())
        .backend(queue.alert_queue.clone())
        .build_fn(alert_handler);

    Monitor::new()
        .register(execution_worker)
        .register(reconciliation_worker)
        .register(verification_worker)
        .register(treasury_worker)
        .register(alert_worker)
        .on_event(monitor_handle_event)
        .shutdown_timeout(Duration::from_millis(5000))
        .run_with_signal(async {
            let mut sigint = tokio::signal::unix::signal(SignalKind::interrupt())
                .expect("Failed to create SIGINT signal");
            let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())
                .expect("Failed to create SIGTERM signal");

            info!("Monitor started");

            tokio::select! {
                _ = sigint.recv() => info!("Received SIGINT."),
                _ = sigterm.recv() => info!("Received SIGTERM."),
            };

            info!("Monitor shutting down");

            Ok(())
        })
        .await?;

    info!("Monitor shutdown complete");
    Ok(())
}

fn monitor_handle_event(e: Worker<Event>) {
    let worker_id = e.id();
    match e.inner() {
        Event::Engage(task_id) => {
            info!("Worker [{worker_id}] got a job with id: {task_id}");
        }
        Event::Error(e) => {
            error!("Worker [{worker_id}] encountered an error: {e}");
        }
        Event::Exit => {
            info!("Worker [{worker_id}] exited");
        }
        Event::Idle => {}
        Event::Start => {
            info!("Worker [{worker_id}] started");
        }
        Event::Stop => {
            info!("Worker [{worker_id}] stopped");
        }
        _ => {}
    }
}
