//! # Repository Module
//!
//! Data persistence layer for the relayer pipeline, following the Repository
//! pattern. Uniqueness constraints are the sole deduplication mechanism:
//! `create` reports a duplicate key as [`CreateOutcome::Duplicate`] rather
//! than an error, and callers treat it as "skip downstream side effects".

mod contract_call_event;
pub use contract_call_event::*;

mod message_approved;
pub use message_approved::*;

mod gas_payment;
pub use gas_payment::*;

/// Result of an idempotent insert.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome<T> {
    Created(T),
    /// A row with the same unique key already exists. Success-no-op.
    Duplicate,
}

impl<T> CreateOutcome<T> {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, CreateOutcome::Duplicate)
    }
}
