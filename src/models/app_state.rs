//! Shared application state handed to job handlers.

use std::sync::Arc;

use redis::aio::ConnectionManager;

use crate::{
    config::RelayerConfig,
    jobs::JobProducerTrait,
    repositories::{
        ContractCallEventRepositoryTrait, GasPaymentRepositoryTrait, MessageApprovedRepositoryTrait,
    },
    services::{
        ChainProviderTrait, FeeAccountant, ProtocolClientTrait, RelayerSignerTrait,
        WebhookAlertService,
    },
    utils::{InflightTxTracker, TaskLock},
};

/// Everything a worker needs, behind `Arc`s so handlers clone cheaply.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayerConfig>,
    pub contract_call_events: Arc<dyn ContractCallEventRepositoryTrait>,
    pub messages: Arc<dyn MessageApprovedRepositoryTrait>,
    pub gas_payments: Arc<dyn GasPaymentRepositoryTrait>,
    pub provider: Arc<dyn ChainProviderTrait>,
    pub signer: Arc<dyn RelayerSignerTrait>,
    pub protocol_client: Arc<dyn ProtocolClientTrait>,
    pub fee_accountant: Arc<FeeAccountant>,
    pub alerts: Option<Arc<WebhookAlertService>>,
    pub job_producer: Arc<dyn JobProducerTrait>,
    pub task_lock: TaskLock,
    pub inflight: Arc<dyn InflightTxTracker>,
    pub redis: ConnectionManager,
}
