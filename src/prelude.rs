//! Common imports for embedding the core.
//!
//! ```rust
//! use agent_core::prelude::*;
//! ```

pub use crate::cache::ToolCache;
pub use crate::client::{Completion, ModelClient, ModelSummarizer};
pub use crate::compression::{CompressionOptions, ContextCompressor, Summarizer};
pub use crate::config::CoreConfig;
pub use crate::execution::{ToolExecutor, ToolOutcome, ToolOutcomeKind};
pub use crate::hooks::{Hook, HookEvent, HookOutput};
pub use crate::permissions::{
    Confirmer, PermissionDecision, PermissionEngine, PermissionMode, PermissionsConfig,
    RuleAction, RuleScope,
};
pub use crate::routing::{ModelRouter, ModelTier, RoutingConfig, RoutingMode, TaskClassification};
pub use crate::service::{AgentCore, TurnPlan};
pub use crate::tools::{ExecutionContext, Tool, ToolRegistry, ToolSet};
pub use crate::types::{Message, Role, ToolId, ToolInvocation, ToolResult};
pub use crate::{Error, Result};
