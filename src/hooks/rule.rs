//! Declarative hook entries as they appear in configuration.

use serde::{Deserialize, Serialize};

/// One command hook entry.
///
/// Format: `{"name": "fmt", "matcher": "write|edit", "command": "cargo fmt", "timeoutSecs": 10}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookRule {
    #[serde(default)]
    pub name: Option<String>,
    /// Regex over the qualified tool name
    #[serde(default)]
    pub matcher: Option<String>,
    pub command: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl HookRule {
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            name: None,
            matcher: None,
            command: command.into(),
            timeout_secs: None,
        }
    }

    pub fn with_matcher(mut self, matcher: impl Into<String>) -> Self {
        self.matcher = Some(matcher.into());
        self
    }
}

/// Hook entries grouped by event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HooksConfig {
    pub pre_tool_use: Vec<HookRule>,
    pub post_tool_use: Vec<HookRule>,
}

impl HooksConfig {
    pub fn is_empty(&self) -> bool {
        self.pre_tool_use.is_empty() && self.post_tool_use.is_empty()
    }
}
