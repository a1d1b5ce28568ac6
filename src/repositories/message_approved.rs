//! Repository for [`MessageApproved`] rows. The atomic `update_many_partial`
//! is what keeps nonce-adjacent entries consistent across a crash: the
//! execution engine stages every mutation of a drain page and commits them
//! under one lock acquisition.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use itertools::Itertools;
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    constants::PENDING_COOLDOWN_SECONDS,
    models::{MessageApproved, MessageApprovedStatus, MessageApprovedUpdate, RepositoryError},
    repositories::CreateOutcome,
};

#[async_trait]
pub trait MessageApprovedRepositoryTrait: Send + Sync {
    /// Idempotent insert keyed on `(source_chain, message_id)`.
    async fn create(
        &self,
        message: MessageApproved,
    ) -> Result<CreateOutcome<MessageApproved>, RepositoryError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<MessageApproved>, RepositoryError>;

    /// Pending rows eligible for an execution attempt, cool-down filtered and
    /// ordered retry count ascending then creation time ascending.
    async fn find_pending(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<MessageApproved>, RepositoryError>;

    /// Pending rows with a candidate `execute_tx_hash` that has gone stale
    /// (outside the cool-down window) and no confirmed sub-execution yet.
    /// Input to the reconciliation loop.
    async fn find_stale_with_execute_hash(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<MessageApproved>, RepositoryError>;

    /// Marks the row for `(source_chain, message_id)` as successfully
    /// executed, bumping `success_times`. No-op when the row is unknown
    /// (the execution may have been observed before the approval).
    async fn mark_executed(
        &self,
        source_chain: &str,
        message_id: &str,
    ) -> Result<Option<MessageApproved>, RepositoryError>;

    /// Applies a batch of partial updates atomically.
    async fn update_many_partial(
        &self,
        updates: Vec<MessageApprovedUpdate>,
    ) -> Result<(), RepositoryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryMessageApprovedRepository {
    store: Mutex<HashMap<String, MessageApproved>>,
}

impl InMemoryMessageApprovedRepository {
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
impl MessageApprovedRepositoryTrait for InMemoryMessageApprovedRepository {
    async fn create(
        &self,
        message: MessageApproved,
    ) -> Result<CreateOutcome<MessageApproved>, RepositoryError> {
        let mut store = Self::acquire_lock(&self.store).await?;
        if store.contains_key(&message.id) {
            return Ok(CreateOutcome::Duplicate);
        }
        store.insert(message.id.clone(), message.clone());
        Ok(CreateOutcome::Created(message))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<MessageApproved>, RepositoryError> {
        let store = Self::acquire_lock(&self.store).await?;
        Ok(store.get(id).cloned())
    }

    async fn find_pending(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<MessageApproved>, RepositoryError> {
        let store = Self::acquire_lock(&self.store).await?;
        let cutoff = Utc::now() - Duration::seconds(PENDING_COOLDOWN_SECONDS);
        let start = ((page.max(1) - 1) * page_size) as usize;

        Ok(store
            .values()
            .filter(|message| message.status == MessageApprovedStatus::Pending)
            .filter(|message| message.retry_count == 0 || message.updated_at < cutoff)
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

    async fn find_stale_with_execute_hash(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<MessageApproved>, RepositoryError> {
        let store = Self::acquire_lock(&self.store).await?;
        let cutoff = Utc::now() - Duration::seconds(PENDING_COOLDOWN_SECONDS);
        let start = ((page.max(1) - 1) * page_size) as usize;

        Ok(store
            .values()
            .filter(|message| message.status == MessageApprovedStatus::Pending)
            .filter(|message| message.execute_tx_hash.is_some())
            .filter(|message| message.success_times.unwrap_or(0) == 0)
            .filter(|message| message.updated_at < cutoff)
            .sorted_by(|a, b| a.updated_at.cmp(&b.updated_at))
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect())
    }

    async fn mark_executed(
        &self,
        source_chain: &str,
        message_id: &str,
    ) -> Result<Option<MessageApproved>, RepositoryError> {
        let mut store = Self::acquire_lock(&self.store).await?;
        let key = MessageApproved::message_key(source_chain, message_id);
        let Some(message) = store.get_mut(&key) else {
            return Ok(None);
        };
        message.status = MessageApprovedStatus::Success;
        message.success_times = Some(message.success_times.unwrap_or(0) + 1);
        message.updated_at = Utc::now();
        Ok(Some(message.clone()))
    }

    async fn update_many_partial(
        &self,
        updates: Vec<MessageApprovedUpdate>,
    ) -> Result<(), RepositoryError> {
        let mut store = Self::acquire_lock(&self.store).await?;
        let now = Utc::now();
        for update in updates {
            let message = store.get_mut(&update.id).ok_or_else(|| {
                RepositoryError::NotFound(format!("Message approved {}", update.id))
            })?;
            if let Some(status) = update.status {
                message.status = status;
            }
            if let Some(retry_count) = update.retry_count {
                message.retry_count = retry_count;
            }
            if let Some(execute_tx_hash) = update.execute_tx_hash {
                message.execute_tx_hash = execute_tx_hash;
            }
            if let Some(success_times) = update.success_times {
                message.success_times = Some(success_times);
            }
            message.updated_at = now;
        }
        Ok(())
    }
}

#[cfg(test)]
mockall::mock! {
    pub MessageApprovedRepository {}

    #[async_trait]
    impl MessageApprovedRepositoryTrait for MessageApprovedRepository {
        async fn create(&self, message: MessageApproved) -> Result<CreateOutcome<MessageApproved>, RepositoryError>;
        async fn get_by_id(&self, id: &str) -> Result<Option<MessageApproved>, RepositoryError>;
        async fn find_pending(&self, page: u32, page_size: u32) -> Result<Vec<MessageApproved>, RepositoryError>;
        async fn find_stale_with_execute_hash(&self, page: u32, page_size: u32) -> Result<Vec<MessageApproved>, RepositoryError>;
        async fn mark_executed(&self, source_chain: &str, message_id: &str) -> Result<Option<MessageApproved>, RepositoryError>;
        async fn update_many_partial(&self, updates: Vec<MessageApprovedUpdate>) -> Result<(), RepositoryError>;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::mocks::create_message_approved;

    #[tokio::test]
    async fn test_create_duplicate_is_noop() {
        let repo = InMemoryMessageApprovedRepository::new();
        let message = create_message_approved("msg-1");

        assert!(matches!(
            repo.create(message.clone()).await.unwrap(),
            CreateOutcome::Created(_)
        ));
        assert!(repo.create(message).await.unwrap().is_duplicate());
    }

    #[tokio::test]
    async fn test_update_many_partial_clears_execute_hash() {
        let repo = InMemoryMessageApprovedRepository::new();
        let mut message = create_message_approved("msg-2");
        message.execute_tx_hash = Some("0xold".to_string());
        repo.create(message.clone()).await.unwrap();

        let update = MessageApprovedUpdate {
            id: message.id.clone(),
            execute_tx_hash: Some(None),
            retry_count: Some(1),
            ..Default::default()
        };
        repo.update_many_partial(vec![update]).await.unwrap();

        let stored = repo.get_by_id(&message.id).await.unwrap().unwrap();
        assert_eq!(stored.execute_tx_hash, None);
        assert_eq!(stored.retry_count, 1);
    }

    #[tokio::test]
    async fn test_update_many_partial_unknown_id_errors() {
        let repo = InMemoryMessageApprovedRepository::new();
        let update = MessageApprovedUpdate {
            id: "missing".to_string(),
            ..Default::default()
        };
        assert!(repo.update_many_partial(vec![update]).await.is_err());
    }

    #[tokio::test]
    async fn test_mark_executed_bumps_success_times() {
        let repo = InMemoryMessageApprovedRepository::new();
        let message = create_message_approved("msg-3");
        repo.create(message.clone()).await.unwrap();

        let updated = repo
            .mark_executed(&message.source_chain, &message.message_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, MessageApprovedStatus::Success);
        assert_eq!(updated.success_times, Some(1));

        // Unknown message: no-op, not an error.
        assert!(repo
            .mark_executed("otherchain", "0xnope-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_find_pending_cooldown_and_ordering() {
        let repo = InMemoryMessageApprovedRepository::new();

        // Retried within the cool-down window: excluded.
        let mut cooling = create_message_approved("msg-cooling");
        cooling.retry_count = 1;
        repo.create(cooling).await.unwrap();

        // Terminal row: excluded regardless of age.
        let mut done = create_message_approved("msg-done");
        done.status = MessageApprovedStatus::Success;
        repo.create(done).await.unwrap();

        // Retried long enough ago: eligible again, ordered after fresh rows.
        let mut retried = create_message_approved("msg-retried");
        retried.retry_count = 2;
        repo.create(retried.clone()).await.unwrap();
        {
            let mut store = repo.store.lock().await;
            store.get_mut(&retried.id).unwrap().updated_at =
                Utc::now() - Duration::seconds(PENDING_COOLDOWN_SECONDS + 1);
        }

        // Two fresh rows: creation time breaks the retry-count tie.
        let late = create_message_approved("msg-late");
        let mut early = create_message_approved("msg-early");
        early.created_at = late.created_at - Duration::seconds(30);
        repo.create(late.clone()).await.unwrap();
        repo.create(early.clone()).await.unwrap();

        let found = repo.find_pending(1, 10).await.unwrap();
        let ids: Vec<&str> = found.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![early.id.as_str(), late.id.as_str(), retried.id.as_str()]
        );
    }

    #[tokio::test]
    async fn test_find_stale_with_execute_hash_filters() {
        let repo = InMemoryMessageApprovedRepository::new();

        let mut stale = create_message_approved("msg-4");
        stale.execute_tx_hash = Some("0xhash".to_string());
        stale.retry_count = 1;
        repo.create(stale.clone()).await.unwrap();

        // Freshly updated: not yet stale.
        assert!(repo
            .find_stale_with_execute_hash(1, 10)
            .await
            .unwrap()
            .is_empty());

        {
            let mut store = repo.store.lock().await;
            store.get_mut(&stale.id).unwrap().updated_at =
                Utc::now() - Duration::seconds(PENDING_COOLDOWN_SECONDS + 1);
        }
        let found = repo.find_stale_with_execute_hash(1, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, stale.id);
    }
}
