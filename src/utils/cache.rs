//! Cache-aside helper over Redis.
//!
//! Reads go to Redis first; on a miss the loader runs and the result is
//! stored with a TTL. Cache failures are logged and degrade to a direct
//! load, they never fail the caller.

use std::{future::Future, time::Duration};

use log::warn;
use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{de::DeserializeOwned, Serialize};

/// Returns the cached value under `key`, or runs `loader`, caches its result
/// for `ttl`, and returns it. Only the loader's error can surface.
pub async fn get_or_set<T, E, F, Fut>(
    conn: &ConnectionManager,
    key: &str,
    ttl: Duration,
    loader: F,
) -> Result<T, E>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut conn = conn.clone();

    match conn.get::<_, Option<String>>(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => return Ok(value),
            Err(e) => warn!("Discarding undecodable cache entry {}: {}", key, e),
        },
        Ok(None) => {}
        Err(e) => warn!("Cache read failed for {}: {}", key, e),
    }

    let value = loader().await?;

    match serde_json::to_string(&value) {
        Ok(raw) => {
            if let Err(e) = conn.set_ex::<_, _, ()>(key, raw, ttl.as_secs()).await {
                warn!("Cache write failed for {}: {}", key, e);
            }
        }
        Err(e) => warn!("Skipping cache write for {}: {}", key, e),
    }

    Ok(value)
}
