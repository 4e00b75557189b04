use std::time::Duration;

use serde::Serialize;

use crate::permissions::PermissionDecision;
use crate::types::{Message, ToolInvocation, ToolResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcomeKind {
    /// Ran and succeeded.
    Executed,
    /// Served from the result cache.
    Cached,
    /// Refused by a hook or the permission engine.
    Denied,
    /// Ran (or could not be dispatched) and reported failure.
    Failed,
    /// Exceeded the per-call timeout.
    TimedOut,
}

impl ToolOutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Executed => "executed",
            Self::Cached => "cached",
            Self::Denied => "denied",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for ToolOutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one proposed invocation.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutcome {
    pub invocation: ToolInvocation,
    pub result: ToolResult,
    pub kind: ToolOutcomeKind,
    /// The permission engine's decision. `None` only when the call was refused
    /// before reaching the engine (unknown tool or a blocking hook).
    pub decision: Option<PermissionDecision>,
    pub duration: Duration,
    /// Text contributed by post-execution hooks.
    pub additional_context: Option<String>,
}

impl ToolOutcome {
    pub(crate) fn new(invocation: ToolInvocation, result: ToolResult, kind: ToolOutcomeKind) -> Self {
        Self {
            invocation,
            result,
            kind,
            decision: None,
            duration: Duration::ZERO,
            additional_context: None,
        }
    }

    pub(crate) fn denied(
        invocation: ToolInvocation,
        reason: &str,
        decision: Option<PermissionDecision>,
    ) -> Self {
        let result = ToolResult::failure(format!("Permission denied: {}", reason));
        Self {
            decision,
            ..Self::new(invocation, result, ToolOutcomeKind::Denied)
        }
    }

    pub(crate) fn failed(invocation: ToolInvocation, message: impl Into<String>) -> Self {
        Self::new(invocation, ToolResult::failure(message), ToolOutcomeKind::Failed)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.kind, ToolOutcomeKind::Executed | ToolOutcomeKind::Cached)
    }

    /// The user-visible error for unsuccessful outcomes.
    pub fn error(&self) -> Option<crate::Error> {
        let tool = self.invocation.tool.qualified_name();
        let message = self.result.error.clone().unwrap_or_default();
        match self.kind {
            ToolOutcomeKind::Executed | ToolOutcomeKind::Cached => None,
            ToolOutcomeKind::Denied => Some(crate::Error::PermissionDenied {
                tool,
                reason: message,
            }),
            ToolOutcomeKind::Failed => Some(crate::Error::ToolExecutionFailed { tool, message }),
            ToolOutcomeKind::TimedOut => Some(crate::Error::Timeout(self.duration)),
        }
    }

    /// Tool-role transcript entry. Denials and failures become error text.
    pub fn to_message(&self) -> Message {
        let mut text = self.result.transcript_text();
        if let Some(context) = &self.additional_context {
            text.push_str("\n\n");
            text.push_str(context);
        }
        Message::tool(text)
    }
}
