//! Command-based hooks that execute shell commands.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::rule::{HookRule, HooksConfig};
use super::{Hook, HookContext, HookEvent, HookInput, HookOutput};

/// Runs `sh -c <command>` with the hook input as JSON on stdin.
///
/// A non-zero exit blocks. Stdout may carry `{"continue_execution": false,
/// "stop_reason": "..."}`; empty or non-JSON stdout allows.
pub struct CommandHook {
    name: String,
    command: String,
    events: Vec<HookEvent>,
    tool_pattern: Option<Regex>,
    timeout: Option<Duration>,
}

impl CommandHook {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        events: Vec<HookEvent>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            events,
            tool_pattern: None,
            timeout: None,
        }
    }

    /// Restrict the hook to tools whose qualified name matches `pattern`.
    pub fn with_matcher(mut self, pattern: &str) -> crate::Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| {
            crate::Error::Config(format!("Invalid hook matcher '{}': {}", pattern, e))
        })?;
        self.tool_pattern = Some(regex);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn from_rule(rule: &HookRule, event: HookEvent, index: usize) -> crate::Result<Self> {
        let name = rule
            .name
            .clone()
            .unwrap_or_else(|| format!("{}-{}", event, index));
        let events = match event {
            // Configured post hooks also observe failed executions.
            HookEvent::PostToolUse => vec![HookEvent::PostToolUse, HookEvent::PostToolUseFailure],
            other => vec![other],
        };
        let mut hook = Self::new(name, &rule.command, events);
        if let Some(matcher) = &rule.matcher {
            hook = hook.with_matcher(matcher)?;
        }
        if let Some(secs) = rule.timeout_secs {
            hook = hook.with_timeout(Duration::from_secs(secs));
        }
        Ok(hook)
    }

    pub fn from_config(config: &HooksConfig) -> crate::Result<Vec<Self>> {
        let pre = config
            .pre_tool_use
            .iter()
            .enumerate()
            .map(|(i, rule)| Self::from_rule(rule, HookEvent::PreToolUse, i));
        let post = config
            .post_tool_use
            .iter()
            .enumerate()
            .map(|(i, rule)| Self::from_rule(rule, HookEvent::PostToolUse, i));
        pre.chain(post).collect()
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl std::fmt::Debug for CommandHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHook")
            .field("name", &self.name)
            .field("command", &self.command)
            .field("events", &self.events)
            .field("matcher", &self.tool_pattern.as_ref().map(Regex::as_str))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl Hook for CommandHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn events(&self) -> &[HookEvent] {
        &self.events
    }

    fn tool_matcher(&self) -> Option<&Regex> {
        self.tool_pattern.as_ref()
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn execute(
        &self,
        input: HookInput,
        hook_context: &HookContext,
    ) -> Result<HookOutput, crate::Error> {
        let input_json = serde_json::to_string(&input)?;

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .current_dir(
                hook_context
                    .cwd
                    .as_deref()
                    .unwrap_or(std::path::Path::new(".")),
            )
            .envs(&hook_context.env)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| crate::Error::HookFailed {
                hook: self.name.clone(),
                reason: format!("failed to spawn: {}", e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A hook that ignores stdin may exit before reading it.
            if let Err(e) = stdin.write_all(input_json.as_bytes()).await {
                tracing::debug!(hook = %self.name, error = %e, "Hook closed stdin early");
            }
        }

        let run = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                crate::Error::HookTimeout {
                    hook: self.name.clone(),
                    duration_secs: limit.as_secs(),
                }
            })?,
            None => run.await,
        }
        .map_err(|e| crate::Error::HookFailed {
            hook: self.name.clone(),
            reason: e.to_string(),
        })?;

        if !output.status.success() {
            return Ok(HookOutput::block(format!(
                "Hook '{}' failed with exit code: {:?}",
                self.name,
                output.status.code()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok(HookOutput::allow());
        }

        match serde_json::from_str::<OutputPayload>(stdout.trim()) {
            Ok(payload) => Ok(payload.into_output()),
            Err(_) => Ok(HookOutput::allow()),
        }
    }
}

#[derive(serde::Deserialize)]
struct OutputPayload {
    #[serde(default = "default_true")]
    continue_execution: bool,
    stop_reason: Option<String>,
    additional_context: Option<String>,
}

fn default_true() -> bool {
    true
}

impl OutputPayload {
    fn into_output(self) -> HookOutput {
        HookOutput {
            continue_execution: self.continue_execution,
            stop_reason: self.stop_reason,
            additional_context: self.additional_context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolInvocation;
    use serde_json::json;

    fn bash_input() -> HookInput {
        HookInput::pre_tool_use(
            "test-session",
            &ToolInvocation::from_value("bash", json!({"command": "ls"})),
        )
    }

    #[test]
    fn test_command_hook_creation() {
        let hook = CommandHook::new("test", "echo hello", vec![HookEvent::PreToolUse])
            .with_matcher("bash")
            .unwrap()
            .with_timeout(Duration::from_secs(30));

        assert_eq!(hook.name(), "test");
        assert!(hook.tool_matcher().is_some());
        assert_eq!(hook.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_matcher_rejected() {
        let result = CommandHook::new("bad", "true", vec![HookEvent::PreToolUse]).with_matcher("(");
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_from_config() {
        let config = HooksConfig {
            pre_tool_use: vec![HookRule::command("check.sh").with_matcher("bash")],
            post_tool_use: vec![HookRule {
                name: Some("fmt".into()),
                matcher: None,
                command: "fmt.sh".into(),
                timeout_secs: Some(10),
            }],
        };

        let hooks = CommandHook::from_config(&config).unwrap();
        assert_eq!(hooks.len(), 2);
        assert_eq!(hooks[0].name(), "pre_tool_use-0");
        assert_eq!(hooks[1].name(), "fmt");
        assert_eq!(hooks[1].timeout(), Some(Duration::from_secs(10)));
        assert!(hooks[1].events().contains(&HookEvent::PostToolUseFailure));
    }

    #[tokio::test]
    async fn test_command_hook_allows() {
        let hook = CommandHook::new("echo-test", "echo '{}'", vec![HookEvent::PreToolUse]);
        let output = hook
            .execute(bash_input(), &HookContext::new("test-session"))
            .await
            .unwrap();
        assert!(output.continue_execution);
    }

    #[tokio::test]
    async fn test_command_hook_blocks_via_stdout() {
        let hook = CommandHook::new(
            "guard",
            r#"echo '{"continue_execution": false, "stop_reason": "nope"}'"#,
            vec![HookEvent::PreToolUse],
        );
        let output = hook
            .execute(bash_input(), &HookContext::new("test-session"))
            .await
            .unwrap();
        assert!(output.is_blocked());
        assert_eq!(output.stop_reason.as_deref(), Some("nope"));
    }

    #[tokio::test]
    async fn test_command_hook_sees_stdin() {
        let hook = CommandHook::new(
            "grep-stdin",
            "grep -q '\"tool_name\":\"bash\"'",
            vec![HookEvent::PreToolUse],
        );
        let output = hook
            .execute(bash_input(), &HookContext::new("test-session"))
            .await
            .unwrap();
        assert!(output.continue_execution);
    }

    #[tokio::test]
    async fn test_nonzero_exit_blocks() {
        let hook = CommandHook::new("fail", "exit 3", vec![HookEvent::PreToolUse]);
        let output = hook
            .execute(bash_input(), &HookContext::new("test-session"))
            .await
            .unwrap();
        assert!(output.is_blocked());
    }

    #[tokio::test]
    async fn test_command_hook_timeout() {
        let hook = CommandHook::new("slow", "sleep 5", vec![HookEvent::PreToolUse])
            .with_timeout(Duration::from_millis(100));
        let err = hook
            .execute(bash_input(), &HookContext::new("test-session"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::HookTimeout { .. }));
    }
}
