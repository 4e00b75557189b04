//! Permission policy engine: admission control for tool invocations.

mod config;
mod confirm;
pub mod danger;
mod engine;
mod manager;
mod modes;
mod pattern;
mod rules;
mod session;
mod store;

pub use config::PermissionsConfig;
pub use confirm::{ConfirmError, Confirmer, DefaultAnswer, Unattended};
pub use engine::{DecisionRecord, DecisionSource, PermissionDecision, PermissionEngine};
pub use manager::PermissionManager;
pub use modes::PermissionMode;
pub use pattern::{ArgConstraint, NameMatcher, ToolPattern, ValueMatcher};
pub use rules::{PermissionRule, RuleAction, RuleScope};
pub use session::SessionDecisions;
pub use store::{JsonFileRuleStore, MemoryRuleStore, RuleStore};
