//! Redis-backed queue storage for asynchronous jobs.

use apalis_redis::{Config, RedisStorage};
use color_eyre::{eyre, Result};
use log::error;
use serde::{Deserialize, Serialize};
use tokio::time::{timeout, Duration};

use crate::constants::REDIS_CONNECTION_TIMEOUT_MS;

use super::{AlertSend, Job};

#[derive(Clone, Debug)]
pub struct Queue {
    pub alert_queue: RedisStorage<Job<AlertSend>>,
}

impl Queue {
    async fn storage<T: Serialize + for<'de> Deserialize<'de>>(
        redis_url: &str,
        namespace: &str,
    ) -> Result<RedisStorage<T>> {
        let conn = match timeout(
            Duration::from_millis(REDIS_CONNECTION_TIMEOUT_MS),
            apalis_redis::connect(redis_url.to_string()),
        )
        .await
        {
            Ok(result) => result.map_err(|e| {
                error!("Failed to connect to Redis at {}: {}", redis_url, e);
                eyre::eyre!(
                    "Failed to connect to Redis at {}. Error: {}",
                    redis_url,
                    e
                )
            })?,
            Err(_) => {
                error!("Timeout connecting to Redis at {}", redis_url);
                return Err(eyre::eyre!(
                    "Timed out after {} milliseconds while connecting to Redis at {}",
                    REDIS_CONNECTION_TIMEOUT_MS,
                    redis_url
                ));
            }
        };
        let config = Config::default()
            .set_namespace(namespace)
            .set_max_retries(5);

        Ok(RedisStorage::new_with_config(conn, config))
    }

    pub async fn setup(redis_url: &str) -> Result<Self> {
        Ok(Self {
            alert_queue: Self::storage(redis_url, "alert_queue").await?,
        })
    }
}
