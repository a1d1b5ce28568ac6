//! Repository for [`GasPayment`] rows. Payments arrive out of order with
//! their call events, so matching is by `(payload_hash, destination)` and
//! "gas added" events increment an existing row instead of creating one.

use std::collections::HashMap;

use alloy::primitives::U256;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    models::{GasPayment, GasPaymentStatus, RepositoryError},
    repositories::CreateOutcome,
};

#[async_trait]
pub trait GasPaymentRepositoryTrait: Send + Sync {
    async fn create(
        &self,
        payment: GasPayment,
    ) -> Result<CreateOutcome<GasPayment>, RepositoryError>;

    /// Finds the pending payment matching a call by payload hash and
    /// destination address.
    async fn find_matching(
        &self,
        payload_hash: &str,
        destination_address: &str,
    ) -> Result<Option<GasPayment>, RepositoryError>;

    /// Credits additional gas to the payment matching
    /// `(payload_hash, gas_token, refund_address)`. Returns the updated row,
    /// or `None` when no payment matches (logged and skipped by callers).
    async fn add_gas<'a>(
        &self,
        payload_hash: &'a str,
        gas_token: Option<&'a str>,
        refund_address: &'a str,
        amount: U256,
    ) -> Result<Option<GasPayment>, RepositoryError>;

    /// Records a refund against the matching payment.
    async fn record_refund(
        &self,
        payload_hash: &str,
        refund_address: &str,
        amount: U256,
    ) -> Result<Option<GasPayment>, RepositoryError>;

    /// Links a payment to its call event once the event is observed.
    async fn link_contract_call(
        &self,
        payload_hash: &str,
        destination_address: &str,
        contract_call_event_id: &str,
    ) -> Result<Option<GasPayment>, RepositoryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryGasPaymentRepository {
    store: Mutex<HashMap<String, GasPayment>>,
}

impl InMemoryGasPaymentRepository {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
        }
    }

    async fn acquire_lock<T>(lock: &Mutex<T>) -> Result<MutexGuard<T>, RepositoryError> {
        Ok(lock.lock().await)
    }
}

#[async_trait]
impl GasPaymentRepositoryTrait for InMemoryGasPaymentRepository {
    async fn create(
        &self,
        payment: GasPayment,
    ) -> Result<CreateOutcome<GasPayment>, RepositoryError> {
        let mut store = Self::acquire_lock(&self.store).await?;
        if store.contains_key(&payment.id) {
            return Ok(CreateOutcome::Duplicate);
        }
        store.insert(payment.id.clone(), payment.clone());
        Ok(CreateOutcome::Created(payment))
    }

    async fn find_matching(
        &self,
        payload_hash: &str,
        destination_address: &str,
    ) -> Result<Option<GasPayment>, RepositoryError> {
        let store = Self::acquire_lock(&self.store).await?;
        Ok(store
            .values()
            .find(|payment| {
                payment.payload_hash == payload_hash
                    && payment.destination_address == destination_address
                    && payment.status == GasPaymentStatus::Pending
            })
            .cloned())
    }

    async fn add_gas<'a>(
        &self,
        payload_hash: &'a str,
        gas_token: Option<&'a str>,
        refund_address: &'a str,
        amount: U256,
    ) -> Result<Option<GasPayment>, RepositoryError> {
        let mut store = Self::acquire_lock(&self.store).await?;
        let payment = store.values_mut().find(|payment| {
            payment.payload_hash == payload_hash
                && payment.gas_token.as_deref() == gas_token
                && payment.refund_address == refund_address
        });
        let Some(payment) = payment else {
            return Ok(None);
        };
        payment.gas_value = payment.gas_value.saturating_add(amount);
        payment.updated_at = Utc::now();
        Ok(Some(payment.clone()))
    }

    async fn record_refund(
        &self,
        payload_hash: &str,
        refund_address: &str,
        amount: U256,
    ) -> Result<Option<GasPayment>, RepositoryError> {
        let mut store = Self::acquire_lock(&self.store).await?;
        let payment = store.values_mut().find(|payment| {
            payment.payload_hash == payload_hash && payment.refund_address == refund_address
        });
        let Some(payment) = payment else {
            return Ok(None);
        };
        payment.refunded_value = Some(payment.refunded_value.unwrap_or(U256::ZERO) + amount);
        payment.status = GasPaymentStatus::Refunded;
        payment.updated_at = Utc::now();
        Ok(Some(payment.clone()))
    }

    async fn link_contract_call(
        &self,
        payload_hash: &str,
        destination_address: &str,
        contract_call_event_id: &str,
    ) -> Result<Option<GasPayment>, RepositoryError> {
        let mut store = Self::acquire_lock(&self.store).await?;
        let payment = store.values_mut().find(|payment| {
            payment.payload_hash == payload_hash
                && payment.destination_address == destination_address
                && payment.contract_call_event_id.is_none()
        });
        let Some(payment) = payment else {
            return Ok(None);
        };
        payment.contract_call_event_id = Some(contract_call_event_id.to_string());
        payment.updated_at = Utc::now();
        Ok(Some(payment.clone()))
    }
}

#[cfg(test)]
mockall::mock! {
    pub GasPaymentRepository {}

    #[async_trait]
    impl GasPaymentRepositoryTrait for GasPaymentRepository {
        async fn create(&self, payment: GasPayment) -> Result<CreateOutcome<GasPayment>, RepositoryError>;
        async fn find_matching(&self, payload_hash: &str, destination_address: &str) -> Result<Option<GasPayment>, RepositoryError>;
        async fn add_gas<'a>(&self, payload_hash: &'a str, gas_token: Option<&'a str>, refund_address: &'a str, amount: U256) -> Result<Option<GasPayment>, RepositoryError>;
        async fn record_refund(&self, payload_hash: &str, refund_address: &str, amount: U256) -> Result<Option<GasPayment>, RepositoryError>;
        async fn link_contract_call(&self, payload_hash: &str, destination_address: &str, contract_call_event_id: &str) -> Result<Option<GasPayment>, RepositoryError>;
    }
}
