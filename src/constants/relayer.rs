//! Lifecycle and treasury constants for the relayer pipeline.

/// Maximum number of execution or verification attempts before an entry is
/// marked failed and reported outward.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Cool-down window before a previously attempted pending entry becomes
/// eligible for another attempt.
pub const PENDING_COOLDOWN_SECONDS: i64 = 60;

/// Page size used when draining pending entries.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// TTL for entries in the in-flight transaction hash set.
pub const INFLIGHT_TX_TTL_SECONDS: u64 = 2 * 60 * 60;

/// Gas-service balance above which fees are collected (0.3 native units).
pub const FEE_COLLECT_THRESHOLD: u128 = 300_000_000_000_000_000;

/// Amount left behind in the gas-service contract when collecting fees
/// (0.1 native units).
pub const FEE_COLLECT_RESERVE: u128 = 100_000_000_000_000_000;

/// Wrapped-native balance above which the relayer unwraps back to the native
/// token (0.2 native units).
pub const WRAPPED_CONVERT_THRESHOLD: u128 = 200_000_000_000_000_000;

/// Relayer balance below which a low-balance warning is emitted (0.1 native
/// units).
pub const LOW_BALANCE_THRESHOLD: u128 = 100_000_000_000_000_000;

/// TTL for cached account balance reads in the treasury monitor.
pub const BALANCE_CACHE_TTL_SECONDS: u64 = 30;
