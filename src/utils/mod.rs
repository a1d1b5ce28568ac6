pub mod cache;
pub mod inflight;
pub mod lock;

#[cfg(test)]
pub mod mocks;

pub use cache::get_or_set;
pub use inflight::{InflightTxTracker, RedisInflightTracker};
pub use lock::TaskLock;

#[cfg(test)]
pub use inflight::MockInflightTxTracker;
