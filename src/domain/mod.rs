//! Relayer domain logic: event classification, batched execution,
//! transaction reconciliation, verification dispatch, and treasury upkeep.

pub mod classifier;
pub mod executor;
pub mod reconciler;
pub mod treasury;
pub mod verification;

pub use classifier::{ClassifyOutcome, EventClassifier};
pub use executor::{ExecutionCycleReport, ExecutionEngine};
pub use reconciler::{ReconcileReport, Reconciler};
pub use treasury::{TreasuryMonitor, TreasuryReport};
pub use verification::{VerificationDispatcher, VerificationReport};
