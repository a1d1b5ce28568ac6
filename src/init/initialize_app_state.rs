//! Wires repositories, chain services, and the job queue into the shared
//! application state.

use std::{sync::Arc, time::Duration};

use color_eyre::Result;
use redis::aio::ConnectionManager;

use crate::{
    config::RelayerConfig,
    constants::MAX_GAS_LIMIT,
    jobs::{JobProducer, Queue},
    models::AppState,
    repositories::{
        InMemoryContractCallEventRepository, InMemoryGasPaymentRepository,
        InMemoryMessageApprovedRepository,
    },
    services::{
        EvmChainProvider, FeeAccountant, HttpProtocolClient, LocalRelayerSigner,
        WebhookAlertService,
    },
    utils::{RedisInflightTracker, TaskLock},
};

pub async fn initialize_app_state(config: RelayerConfig) -> Result<(AppState, Queue)> {
    let redis_client = redis::Client::open(config.redis_url.as_str())?;
    let redis = ConnectionManager::new(redis_client).await?;

    let contract_call_events = Arc::new(InMemoryContractCallEventRepository::new());
    let messages = Arc::new(InMemoryMessageApprovedRepository::new());
    let gas_payments = Arc::new(InMemoryGasPaymentRepository::new());

    let provider = Arc::new(EvmChainProvider::new(
        &config.rpc_url,
        Duration::from_secs(config.rpc_timeout_seconds),
    )?);
    let signer = Arc::new(LocalRelayerSigner::new(&config.relayer_private_key)?);
    let protocol_client = Arc::new(HttpProtocolClient::new(
        config.hub_url.clone(),
        config.hub_api_key.clone(),
    )?);
    let fee_accountant = Arc::new(FeeAccountant::new(
        MAX_GAS_LIMIT,
        config.strict_budget_check,
    ));
    let alerts = config.operator_webhook_url.clone().map(|url| {
        Arc::new(WebhookAlertService::new(
            url,
            config.operator_webhook_secret.clone(),
        ))
    });

    let queue = Queue::setup(&config.redis_url).await?;
    let job_producer = Arc::new(JobProducer::new(queue.clone()));

    let task_lock = TaskLock::new(redis.clone());
    let inflight = Arc::new(RedisInflightTracker::new(
        redis.clone(),
        config.chain_name.clone(),
    ));

    let app_state = AppState {
        config: Arc::new(config),
        contract_call_events,
        messages,
        gas_payments,
        provider,
        signer,
        protocol_client,
        fee_accountant,
        alerts,
        job_producer,
        task_lock,
        inflight,
        redis,
    };

    Ok((app_state, queue))
}
