//! Repository for [`ContractCallEvent`] rows. The in-memory implementation
//! stores rows in a `Mutex`-protected `HashMap`, matching the storage shape
//! used across the relayer's repositories.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use itertools::Itertools;
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    constants::PENDING_COOLDOWN_SECONDS,
    models::{ContractCallEvent, ContractCallEventUpdate, ContractCallStatus, RepositoryError},
    repositories::CreateOutcome,
};

#[async_trait]
pub trait ContractCallEventRepositoryTrait: Send + Sync {
    /// Idempotent insert keyed on the event id (`(tx_hash, event_index)`
    /// composite). A duplicate returns [`CreateOutcome::Duplicate`].
    async fn create(
        &self,
        event: ContractCallEvent,
    ) -> Result<CreateOutcome<ContractCallEvent>, RepositoryError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<ContractCallEvent>, RepositoryError>;

    /// Pending rows eligible for processing: `retry_count == 0` or last
    /// touched outside the cool-down window. Fresh work first, stale retries
    /// never starved: ordered by retry count ascending, then creation time.
    async fn find_pending(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<ContractCallEvent>, RepositoryError>;

    async fn update_status(
        &self,
        id: &str,
        status: ContractCallStatus,
    ) -> Result<ContractCallEvent, RepositoryError>;

    /// Applies a batch of partial updates atomically: a single lock
    /// acquisition so no subset of the batch can become visible on its own.
    async fn update_many_partial(
        &self,
        updates: Vec<ContractCallEventUpdate>,
    ) -> Result<(), RepositoryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryContractCallEventRepository {
    store: Mutex<HashMap<String, ContractCallEvent>>,
}

impl InMemoryContractCallEventRepository {
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
impl ContractCallEventRepositoryTrait for InMemoryContractCallEventRepository {
    async fn create(
        &self,
        event: ContractCallEvent,
    ) -> Result<CreateOutcome<ContractCallEvent>, RepositoryError> {
        let mut store = Self::acquire_lock(&self.store).await?;
        if store.contains_key(&event.id) {
            return Ok(CreateOutcome::Duplicate);
        }
        store.insert(event.id.clone(), event.clone());
        Ok(CreateOutcome::Created(event))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<ContractCallEvent>, RepositoryError> {
        let store = Self::acquire_lock(&self.store).await?;
        Ok(store.get(id).cloned())
    }

    async fn find_pending(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<ContractCallEvent>, RepositoryError> {
        let store = Self::acquire_lock(&self.store).await?;
        let cutoff = Utc::now() - Duration::seconds(PENDING_COOLDOWN_SECONDS);
        let start = ((page.max(1) - 1) * page_size) as usize;

        Ok(store
            .values()
            .filter(|event| event.status == ContractCallStatus::Pending)
            .filter(|event| event.retry_count == 0 || event.updated_at < cutoff)
            .sorted_by(|a, b| {
                a.retry_count
                    .cmp(&b.retry_count)
                    .then(a.created_at.cmp(&b.created_at))
            })
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: &str,
        status: ContractCallStatus,
    ) -> Result<ContractCallEvent, RepositoryError> {
        let mut store = Self::acquire_lock(&self.store).await?;
        let event = store
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Contract call event {}", id)))?;
        event.status = status;
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    async fn update_many_partial(
        &self,
        updates: Vec<ContractCallEventUpdate>,
    ) -> Result<(), RepositoryError> {
        let mut store = Self::acquire_lock(&self.store).await?;
        let now = Utc::now();
        for update in updates {
            let event = store.get_mut(&update.id).ok_or_else(|| {
                RepositoryError::NotFound(format!("Contract call event {}", update.id))
            })?;
            if let Some(status) = update.status {
                event.status = status;
            }
            if let Some(retry_count) = update.retry_count {
                event.retry_count = retry_count;
            }
            event.updated_at = now;
        }
        Ok(())
    }
}

#[cfg(test)]
mockall::mock! {
    pub ContractCallEventRepository {}

    #[async_trait]
    impl ContractCallEventRepositoryTrait for ContractCallEventRepository {
        async fn create(&self, event: ContractCallEvent) -> Result<CreateOutcome<ContractCallEvent>, RepositoryError>;
        async fn get_by_id(&self, id: &str) -> Result<Option<ContractCallEvent>, RepositoryError>;
        async fn find_pending(&self, page: u32, page_size: u32) -> Result<Vec<ContractCallEvent>, RepositoryError>;
        async fn update_status(&self, id: &str, status: ContractCallStatus) -> Result<ContractCallEvent, RepositoryError>;
        async fn update_many_partial(&self, updates: Vec<ContractCallEventUpdate>) -> Result<(), RepositoryError>;
    }
}
