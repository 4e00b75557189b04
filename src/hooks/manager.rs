//! Ordered hook registry and the event dispatcher.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use super::rule::HooksConfig;
use super::{CommandHook, Hook, HookContext, HookEvent, HookInput, HookOutput};

const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(60);

/// Hooks kept in descending priority order; equal priorities run in
/// registration order.
#[derive(Clone)]
pub struct HookManager {
    hooks: Vec<Arc<dyn Hook>>,
    default_timeout: Duration,
}

impl Default for HookManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HookManager {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_HOOK_TIMEOUT)
    }

    pub fn with_timeout(default_timeout: Duration) -> Self {
        Self {
            hooks: Vec::new(),
            default_timeout,
        }
    }

    /// Build a manager holding one [`CommandHook`] per configured entry.
    pub fn from_config(config: &HooksConfig, default_timeout: Duration) -> crate::Result<Self> {
        let mut manager = Self::with_timeout(default_timeout);
        for hook in CommandHook::from_config(config)? {
            manager.register(hook);
        }
        Ok(manager)
    }

    pub fn register<H: Hook + 'static>(&mut self, hook: H) {
        self.register_arc(Arc::new(hook));
    }

    pub fn register_arc(&mut self, hook: Arc<dyn Hook>) {
        let at = self
            .hooks
            .partition_point(|existing| existing.priority() >= hook.priority());
        self.hooks.insert(at, hook);
    }

    /// Remove every hook called `name`; returns how many were removed.
    pub fn unregister(&mut self, name: &str) -> usize {
        let before = self.hooks.len();
        self.hooks.retain(|h| h.name() != name);
        before - self.hooks.len()
    }

    pub fn hook_names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    pub fn has_hook(&self, name: &str) -> bool {
        self.hooks.iter().any(|h| h.name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn hooks_for_event(&self, event: HookEvent) -> impl Iterator<Item = &Arc<dyn Hook>> {
        self.hooks
            .iter()
            .filter(move |hook| hook.events().contains(&event))
    }

    /// Run every hook registered for `event` whose matcher accepts the tool.
    ///
    /// For blocking events a failing or timed-out hook is an error, which the
    /// pipeline turns into a denial. For the other events it is logged and
    /// skipped.
    pub async fn execute(
        &self,
        event: HookEvent,
        input: HookInput,
        hook_context: &HookContext,
    ) -> Result<HookOutput, crate::Error> {
        let mut combined = HookOutput::allow();

        for hook in self.hooks_for_event(event) {
            if let Some(matcher) = hook.tool_matcher()
                && !matcher.is_match(&input.tool_name)
            {
                continue;
            }

            let hook_timeout = hook.timeout().unwrap_or(self.default_timeout);
            let result = timeout(hook_timeout, hook.execute(input.clone(), hook_context)).await;

            let failure = match result {
                Ok(Ok(output)) => {
                    combined = combined.merge(output);
                    if combined.is_blocked() {
                        break;
                    }
                    continue;
                }
                Ok(Err(e)) => e,
                Err(_) => crate::Error::HookTimeout {
                    hook: hook.name().to_string(),
                    duration_secs: hook_timeout.as_secs(),
                },
            };

            tracing::warn!(
                hook = hook.name(),
                event = %event,
                tool = %input.tool_name,
                error = %failure,
                "Hook execution failed"
            );
            if event.can_block() {
                return Err(failure);
            }
        }

        Ok(combined)
    }
}

impl std::fmt::Debug for HookManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookManager")
            .field("hooks", &self.hook_names())
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ToolInvocation, ToolResult};
    use async_trait::async_trait;
    use regex::Regex;
    use serde_json::json;

    enum Behavior {
        Allow,
        Block,
        Context(&'static str),
        Fail,
        Hang,
    }

    struct TestHook {
        name: String,
        events: Vec<HookEvent>,
        priority: i32,
        behavior: Behavior,
        matcher: Option<Regex>,
    }

    impl TestHook {
        fn new(name: &str, events: Vec<HookEvent>, priority: i32, behavior: Behavior) -> Self {
            Self {
                name: name.into(),
                events,
                priority,
                behavior,
                matcher: None,
            }
        }

        fn matching(mut self, pattern: &str) -> Self {
            self.matcher = Some(Regex::new(pattern).unwrap());
            self
        }
    }

    #[async_trait]
    impl Hook for TestHook {
        fn name(&self) -> &str {
            &self.name
        }

        fn events(&self) -> &[HookEvent] {
            &self.events
        }

        fn tool_matcher(&self) -> Option<&Regex> {
            self.matcher.as_ref()
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        async fn execute(
            &self,
            _input: HookInput,
            _hook_context: &HookContext,
        ) -> Result<HookOutput, crate::Error> {
            match self.behavior {
                Behavior::Allow => Ok(HookOutput::allow()),
                Behavior::Block => Ok(HookOutput::block(format!("Blocked by {}", self.name))),
                Behavior::Context(text) => Ok(HookOutput::allow().with_context(text)),
                Behavior::Fail => Err(crate::Error::HookFailed {
                    hook: self.name.clone(),
                    reason: "crashed".into(),
                }),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(HookOutput::allow())
                }
            }
        }
    }

    fn call(name: &str) -> ToolInvocation {
        ToolInvocation::from_value(name, json!({}))
    }

    fn pre(name: &str) -> HookInput {
        HookInput::pre_tool_use("session-1", &call(name))
    }

    fn post(name: &str) -> HookInput {
        HookInput::post_tool_use("session-1", &call(name), &ToolResult::success("ok"))
    }

    #[test]
    fn test_registration() {
        let mut manager = HookManager::new();
        manager.register(TestHook::new("hook1", vec![HookEvent::PreToolUse], 0, Behavior::Allow));
        manager.register(TestHook::new("hook2", vec![HookEvent::PostToolUse], 0, Behavior::Allow));

        assert!(manager.has_hook("hook1"));
        assert!(!manager.has_hook("hook3"));

        assert_eq!(manager.unregister("hook1"), 1);
        assert_eq!(manager.unregister("hook1"), 0);
        assert_eq!(manager.hook_names(), vec!["hook2"]);
    }

    #[test]
    fn test_hooks_for_event_priority_order() {
        let mut manager = HookManager::new();
        manager.register(TestHook::new("low", vec![HookEvent::PreToolUse], 1, Behavior::Allow));
        manager.register(TestHook::new(
            "high",
            vec![HookEvent::PreToolUse, HookEvent::PostToolUse],
            10,
            Behavior::Allow,
        ));

        manager.register(TestHook::new("low-later", vec![HookEvent::PreToolUse], 1, Behavior::Allow));

        let pre_hooks: Vec<&str> = manager
            .hooks_for_event(HookEvent::PreToolUse)
            .map(|h| h.name())
            .collect();
        assert_eq!(pre_hooks, vec!["high", "low", "low-later"]);
        assert_eq!(manager.hooks_for_event(HookEvent::PostToolUse).count(), 1);
    }

    #[tokio::test]
    async fn test_no_hooks_allows() {
        let manager = HookManager::new();
        let output = manager
            .execute(HookEvent::PreToolUse, pre("read"), &HookContext::new("session-1"))
            .await
            .unwrap();
        assert!(output.continue_execution);
    }

    #[tokio::test]
    async fn test_execute_blocks() {
        let mut manager = HookManager::new();
        manager.register(TestHook::new("hook1", vec![HookEvent::PreToolUse], 0, Behavior::Allow));
        manager.register(TestHook::new("hook2", vec![HookEvent::PreToolUse], 10, Behavior::Block));

        let output = manager
            .execute(HookEvent::PreToolUse, pre("read"), &HookContext::new("session-1"))
            .await
            .unwrap();
        assert!(!output.continue_execution);
        assert_eq!(output.stop_reason.as_deref(), Some("Blocked by hook2"));
    }

    #[tokio::test]
    async fn test_matcher_skips_other_tools() {
        let mut manager = HookManager::new();
        manager.register(
            TestHook::new("bash-guard", vec![HookEvent::PreToolUse], 0, Behavior::Block)
                .matching("^bash$"),
        );
        let ctx = HookContext::new("session-1");

        let output = manager.execute(HookEvent::PreToolUse, pre("read"), &ctx).await.unwrap();
        assert!(output.continue_execution);

        let output = manager.execute(HookEvent::PreToolUse, pre("bash"), &ctx).await.unwrap();
        assert!(output.is_blocked());
    }

    #[tokio::test]
    async fn test_contexts_are_joined() {
        let mut manager = HookManager::new();
        manager.register(TestHook::new("a", vec![HookEvent::PostToolUse], 2, Behavior::Context("one")));
        manager.register(TestHook::new("b", vec![HookEvent::PostToolUse], 1, Behavior::Context("two")));

        let output = manager
            .execute(HookEvent::PostToolUse, post("read"), &HookContext::new("session-1"))
            .await
            .unwrap();
        assert_eq!(output.additional_context.as_deref(), Some("one\ntwo"));
    }

    #[tokio::test]
    async fn test_pre_hook_failure_is_error() {
        let mut manager = HookManager::new();
        manager.register(TestHook::new("broken", vec![HookEvent::PreToolUse], 0, Behavior::Fail));

        let err = manager
            .execute(HookEvent::PreToolUse, pre("read"), &HookContext::new("session-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::HookFailed { .. }));
    }

    #[tokio::test]
    async fn test_pre_hook_timeout_blocks_post_hook_timeout_does_not() {
        let mut manager = HookManager::with_timeout(Duration::from_millis(50));
        manager.register(TestHook::new(
            "stuck",
            vec![HookEvent::PreToolUse, HookEvent::PostToolUse],
            0,
            Behavior::Hang,
        ));
        let ctx = HookContext::new("session-1");

        let err = manager
            .execute(HookEvent::PreToolUse, pre("read"), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::HookTimeout { .. }));

        let output = manager
            .execute(HookEvent::PostToolUse, post("read"), &ctx)
            .await
            .unwrap();
        assert!(output.continue_execution);
    }
}
