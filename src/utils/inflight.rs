//! TTL-bounded tracking of transaction hashes awaiting confirmation.
//!
//! The execution engine and treasury record every hash they submit; the
//! reconciler drains the set once a transaction is final. One Redis key per
//! hash so each entry ages out independently if a node never confirms the
//! transaction.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};

use crate::constants::INFLIGHT_TX_TTL_SECONDS;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait InflightTxTracker: Send + Sync {
    async fn add(&self, tx_hash: &str) -> Result<(), redis::RedisError>;

    async fn remove(&self, tx_hash: &str) -> Result<(), redis::RedisError>;

    /// Hashes currently awaiting confirmation.
    async fn list(&self) -> Result<Vec<String>, redis::RedisError>;
}

#[derive(Clone)]
pub struct RedisInflightTracker {
    conn: ConnectionManager,
    chain: String,
}

impl RedisInflightTracker {
    pub fn new(conn: ConnectionManager, chain: String) -> Self {
        Self { conn, chain }
    }

    fn key(&self, tx_hash: &str) -> String {
        format!("inflight:{}:{}", self.chain, tx_hash)
    }

    fn pattern(&self) -> String {
        format!("inflight:{}:*", self.chain)
    }
}

#[async_trait]
impl InflightTxTracker for RedisInflightTracker {
    async fn add(&self, tx_hash: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(self.key(tx_hash), 1u8, INFLIGHT_TX_TTL_SECONDS)
            .await
    }

    async fn remove(&self, tx_hash: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(self.key(tx_hash)).await
    }

    async fn list(&self) -> Result<Vec<String>, redis::RedisError> {
        let mut conn = self.conn.clone();
        let prefix = format!("inflight:{}:", self.chain);
        let mut hashes = Vec::new();
        let mut iter = conn.scan_match::<_, String>(self.pattern()).await?;
        while let Some(key) = iter.next_item().await {
            if let Some(hash) = key.strip_prefix(&prefix) {
                hashes.push(hash.to_string());
            }
        }
        Ok(hashes)
    }
}
