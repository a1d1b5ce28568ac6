/// Redis-backed queue storage.
mod queue;
pub use queue::*;

/// Cron and queue job handlers.
mod handlers;
pub use handlers::*;

/// Job production onto the queues.
mod job_producer;
pub use job_producer::*;

/// Job envelope and payload types.
mod job;
pub use job::*;

/// Backoff retry policy for queue workers.
mod retry_backoff;
pub use retry_backoff::*;
