//! Distributed single-flight lock for scheduled tasks.
//!
//! Each cron tick tries a `SET NX PX` on a task-scoped key; only the
//! instance that wins runs the task body. The TTL bounds how long a crashed
//! holder can block the task, and release is compare-and-delete so an
//! expired holder cannot free a lock someone else now owns.

use log::debug;
use redis::{aio::ConnectionManager, Script};
use uuid::Uuid;

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

#[derive(Clone)]
pub struct TaskLock {
    conn: ConnectionManager,
    instance_id: String,
}

impl TaskLock {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    fn key(task: &str) -> String {
        format!("task-lock:{}", task)
    }

    /// Attempts to take the lock for `task`. Returns `false` when another
    /// instance currently holds it.
    pub async fn try_acquire(&self, task: &str, ttl_ms: u64) -> Result<bool, redis::RedisError> {
        let mut conn = self.conn.clone();
        let outcome: Option<String> = redis::cmd("SET")
            .arg(Self::key(task))
            .arg(&self.instance_id)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;
        let acquired = outcome.is_some();
        if !acquired {
            debug!("Task {} already locked by another instance", task);
        }
        Ok(acquired)
    }

    /// Releases the lock for `task` if this instance still holds it.
    pub async fn release(&self, task: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        let _: i64 = Script::new(RELEASE_SCRIPT)
            .key(Self::key(task))
            .arg(&self.instance_id)
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }
}
