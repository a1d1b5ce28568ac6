//! Network-wide gas and fee constants used by the fee accountant and the
//! execution engine. Values mirror the network's fee model; the hard gas
//! ceiling is overridable through configuration.

/// Minimum gas limit charged for any transaction.
pub const MIN_GAS_LIMIT: u64 = 50_000;

/// Gas charged per byte of transaction payload data.
pub const GAS_PER_DATA_BYTE: u64 = 1_500;

/// Minimum gas price accepted by the network, in the smallest native unit.
pub const MIN_GAS_PRICE: u128 = 1_000_000_000;

/// Execution gas is charged at `MIN_GAS_PRICE / GAS_PRICE_MODIFIER_DIVISOR`.
/// Integer divisor form of the network's 0.01 price modifier.
pub const GAS_PRICE_MODIFIER_DIVISOR: u128 = 100;

/// Hard ceiling on the gas limit of a single transaction.
pub const MAX_GAS_LIMIT: u64 = 600_000_000;

/// Fixed native value attached to the second phase of an interchain token
/// deployment, covering on-chain token issuance cost (0.05 native units).
pub const ITS_TOKEN_ISSUE_VALUE: u128 = 50_000_000_000_000_000;
