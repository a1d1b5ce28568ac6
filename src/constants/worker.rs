//! Worker and scheduling constants.

/// Maximum apalis attempts for queued jobs before they are aborted.
pub const WORKER_DEFAULT_MAXIMUM_RETRIES: usize = 3;

/// Default cron schedule for the execution engine drain (every 6 seconds).
pub const DEFAULT_EXECUTION_SCHEDULE: &str = "*/6 * * * * *";

/// Default cron schedule for the reconciliation loop (every 15 seconds).
pub const DEFAULT_RECONCILIATION_SCHEDULE: &str = "*/15 * * * * *";

/// Default cron schedule for the verification dispatch (every 10 seconds).
pub const DEFAULT_VERIFICATION_SCHEDULE: &str = "*/10 * * * * *";

/// Default cron schedule for the gas treasury monitor (hourly).
pub const DEFAULT_TREASURY_SCHEDULE: &str = "0 0 * * * *";

/// TTL for the single-flight task locks, per task type.
pub const TASK_LOCK_TTL_MS: u64 = 5 * 60 * 1000;

/// How long to wait for the initial Redis connection before giving up.
pub const REDIS_CONNECTION_TIMEOUT_MS: u64 = 10_000;
