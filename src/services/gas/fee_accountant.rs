//! Fee accountant: conversions between a message's attached native-currency
//! budget and a transaction gas limit, plus the pre-send budget check.
//!
//! The fee model charges the data-gas floor (minimum gas limit plus per-byte
//! data gas) at the full minimum gas price, and execution gas above the floor
//! at the modifier-discounted price. All arithmetic is `U256`; currency
//! values never touch floating point.

use alloy::primitives::U256;
use log::warn;

use crate::constants::{
    GAS_PER_DATA_BYTE, GAS_PRICE_MODIFIER_DIVISOR, MAX_GAS_LIMIT, MIN_GAS_LIMIT, MIN_GAS_PRICE,
};

/// Outcome of [`FeeAccountant::check_budget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetCheck {
    Ok,
    /// Estimated cost exceeds the message's budget. Only raised in strict
    /// mode; otherwise the check logs and lets execution proceed so the
    /// failure manifests on-chain instead of stalling the pipeline.
    InsufficientGas,
}

#[derive(Debug, Clone)]
pub struct FeeAccountant {
    max_gas_limit: u64,
    strict_budget_check: bool,
}

impl FeeAccountant {
    pub fn new(max_gas_limit: u64, strict_budget_check: bool) -> Self {
        Self {
            max_gas_limit,
            strict_budget_check,
        }
    }

    /// Gas that any transaction with this payload must pay for, regardless of
    /// execution.
    fn data_gas_floor(payload_len: usize) -> u64 {
        MIN_GAS_LIMIT + GAS_PER_DATA_BYTE * payload_len as u64
    }

    /// Converts an available native-currency budget into a gas limit.
    ///
    /// If the budget cannot cover even the data-gas floor at minimum price,
    /// the floor itself is returned: the caller then sends underfunded,
    /// expecting on-chain failure, which is preferred over silently dropping
    /// the message. Otherwise the floor plus whatever marginal execution gas
    /// the remaining budget affords, capped at the hard ceiling.
    pub fn gas_limit_from_fee_budget(&self, available_fee: U256, payload_len: usize) -> u64 {
        let floor = Self::data_gas_floor(payload_len);
        let floor_fee = U256::from(floor) * U256::from(MIN_GAS_PRICE);

        if available_fee <= floor_fee {
            return floor;
        }

        let remaining = available_fee - floor_fee;
        let marginal = remaining * U256::from(GAS_PRICE_MODIFIER_DIVISOR) / U256::from(MIN_GAS_PRICE);
        let marginal: u64 = marginal.try_into().unwrap_or(u64::MAX);

        floor.saturating_add(marginal).min(self.max_gas_limit)
    }

    /// Fee charged for a transaction with the given gas limit and payload
    /// size: the inverse of [`Self::gas_limit_from_fee_budget`].
    pub fn fee_from_gas_limit(&self, gas_limit: u64, payload_len: usize) -> U256 {
        let floor = Self::data_gas_floor(payload_len);
        let floor_fee = U256::from(floor.min(gas_limit)) * U256::from(MIN_GAS_PRICE);

        let execution_gas = gas_limit.saturating_sub(floor);
        let execution_fee = U256::from(execution_gas) * U256::from(MIN_GAS_PRICE)
            / U256::from(GAS_PRICE_MODIFIER_DIVISOR);

        floor_fee + execution_fee
    }

    /// Compares the total estimated cost (fee plus attached value) against
    /// the message's budget.
    pub fn check_budget(
        &self,
        estimated_gas: u64,
        tx_value: U256,
        payload_len: usize,
        available_budget: U256,
    ) -> BudgetCheck {
        let total_cost = self.fee_from_gas_limit(estimated_gas, payload_len) + tx_value;
        if total_cost <= available_budget {
            return BudgetCheck::Ok;
        }

        if self.strict_budget_check {
            BudgetCheck::InsufficientGas
        } else {
            warn!(
                "Estimated cost {} exceeds budget {}; proceeding anyway (strict check disabled)",
                total_cost, available_budget
            );
            BudgetCheck::Ok
        }
    }
}
