//! Per-turn tool pipeline: admission, cache, bounded execution, invalidation.

mod executor;
mod outcome;

pub use executor::ToolExecutor;
pub use outcome::{ToolOutcome, ToolOutcomeKind};
