//! Cross-chain message relayer library surface.
//!
//! The binary wires everything together; this crate root re-exports the
//! logging setup for external tooling.

pub mod logging;
