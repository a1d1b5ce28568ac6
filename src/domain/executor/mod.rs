mod engine;

pub use engine::{ExecutionCycleReport, ExecutionEngine};
