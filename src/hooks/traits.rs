//! Hook traits and types.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{ToolInvocation, ToolResult};

/// Points in the tool pipeline where hooks run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    /// Before a tool is executed (can block)
    PreToolUse,

    /// After successful tool execution
    PostToolUse,

    /// After failed tool execution
    PostToolUseFailure,
}

impl HookEvent {
    /// Blocking events turn hook failures and timeouts into denials.
    pub fn can_block(&self) -> bool {
        matches!(self, HookEvent::PreToolUse)
    }

    pub fn all() -> &'static [HookEvent] {
        &[
            HookEvent::PreToolUse,
            HookEvent::PostToolUse,
            HookEvent::PostToolUseFailure,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::PreToolUse => "pre_tool_use",
            HookEvent::PostToolUse => "post_tool_use",
            HookEvent::PostToolUseFailure => "post_tool_use_failure",
        }
    }
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input data for hook execution.
#[derive(Clone, Debug, Serialize)]
pub struct HookInput {
    pub event: HookEvent,

    pub session_id: String,

    /// Qualified tool name (`server:name` for adapter tools)
    pub tool_name: String,

    pub tool_input: Value,

    /// Tool result (post events only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResult>,

    pub timestamp: DateTime<Utc>,
}

impl HookInput {
    fn new(event: HookEvent, session_id: impl Into<String>, invocation: &ToolInvocation) -> Self {
        Self {
            event,
            session_id: session_id.into(),
            tool_name: invocation.tool.qualified_name(),
            tool_input: Value::Object(invocation.arguments.clone()),
            tool_result: None,
            timestamp: Utc::now(),
        }
    }

    pub fn pre_tool_use(session_id: impl Into<String>, invocation: &ToolInvocation) -> Self {
        Self::new(HookEvent::PreToolUse, session_id, invocation)
    }

    /// Post-execution input; the event follows the result's success flag.
    pub fn post_tool_use(
        session_id: impl Into<String>,
        invocation: &ToolInvocation,
        result: &ToolResult,
    ) -> Self {
        let event = if result.success {
            HookEvent::PostToolUse
        } else {
            HookEvent::PostToolUseFailure
        };
        Self {
            tool_result: Some(result.clone()),
            ..Self::new(event, session_id, invocation)
        }
    }
}

/// Output from hook execution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HookOutput {
    /// Whether to continue execution (false = block)
    pub continue_execution: bool,

    pub stop_reason: Option<String>,

    /// Extra text appended to the tool's transcript message
    pub additional_context: Option<String>,
}

impl HookOutput {
    pub fn allow() -> Self {
        Self {
            continue_execution: true,
            ..Default::default()
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            continue_execution: false,
            stop_reason: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.additional_context = Some(context.into());
        self
    }

    pub fn is_blocked(&self) -> bool {
        !self.continue_execution
    }

    /// Fold a later hook's output into this one. Any block wins; the latest
    /// stop reason is kept and contexts accumulate one per line.
    pub fn merge(self, later: HookOutput) -> HookOutput {
        let additional_context = match (self.additional_context, later.additional_context) {
            (Some(earlier), Some(next)) => Some(format!("{earlier}\n{next}")),
            (earlier, next) => earlier.or(next),
        };
        HookOutput {
            continue_execution: self.continue_execution && later.continue_execution,
            stop_reason: later.stop_reason.or(self.stop_reason),
            additional_context,
        }
    }
}

/// Context provided to hook execution.
#[derive(Clone, Debug, Default)]
pub struct HookContext {
    pub session_id: String,
    pub cwd: Option<PathBuf>,
    pub env: HashMap<String, String>,
}

impl HookContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Default::default()
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

/// A user-supplied interceptor around tool execution.
///
/// ```rust,no_run
/// use agent_core::hooks::{Hook, HookContext, HookEvent, HookInput, HookOutput};
/// use async_trait::async_trait;
///
/// struct NoForcePush;
///
/// #[async_trait]
/// impl Hook for NoForcePush {
///     fn name(&self) -> &str {
///         "no-force-push"
///     }
///
///     fn events(&self) -> &[HookEvent] {
///         &[HookEvent::PreToolUse]
///     }
///
///     async fn execute(&self, input: HookInput, _ctx: &HookContext)
///         -> Result<HookOutput, agent_core::Error>
///     {
///         let command = input.tool_input.get("command").and_then(|v| v.as_str());
///         if command.is_some_and(|c| c.contains("push --force")) {
///             return Ok(HookOutput::block("force push is not allowed"));
///         }
///         Ok(HookOutput::allow())
///     }
/// }
/// ```
#[async_trait]
pub trait Hook: Send + Sync {
    fn name(&self) -> &str;

    fn events(&self) -> &[HookEvent];

    /// Tool name matcher. `None` applies to every tool.
    fn tool_matcher(&self) -> Option<&Regex> {
        None
    }

    /// Per-hook timeout; `None` uses the manager default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Higher runs first.
    fn priority(&self) -> i32 {
        0
    }

    async fn execute(&self, input: HookInput, ctx: &HookContext)
    -> Result<HookOutput, crate::Error>;
}
