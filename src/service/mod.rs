//! The service object tying the subsystems together.

mod builder;
mod runtime;

pub use builder::AgentCoreBuilder;
pub use runtime::{AgentCore, TurnPlan};
