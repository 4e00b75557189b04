use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use super::outcome::{ToolOutcome, ToolOutcomeKind};
use crate::cache::ToolCache;
use crate::concurrency::{ReadGuard, RwLock, Settled, TaskRunner, WriteGuard};
use crate::config::{CacheConfig, ExecutionConfig};
use crate::hooks::{HookContext, HookEvent, HookInput, HookManager};
use crate::permissions::{PermissionDecision, PermissionEngine};
use crate::tools::{ExecutionContext, ToolRegistry, is_write_tool, referenced_paths};
use crate::types::{Message, ToolInvocation, ToolResult};

/// Runs the tool calls of one model turn.
///
/// Admission (hooks, then permissions) happens one invocation at a time in
/// input order, so prompts never interleave. Admitted calls then run under a
/// bounded [`TaskRunner`]; outcomes come back in input order.
///
/// Write-class calls run exclusively: they wait for in-progress calls to
/// finish, and calls arriving after them wait for the write to finish.
pub struct ToolExecutor {
    registry: Arc<dyn ToolRegistry>,
    engine: Arc<PermissionEngine>,
    cache: Arc<ToolCache>,
    hooks: Arc<HookManager>,
    cache_config: CacheConfig,
    runner: TaskRunner,
    tool_timeout: Duration,
    workspace: RwLock,
}

enum Admission {
    Allowed(PermissionDecision),
    Refused(ToolOutcome),
}

/// Held for the execution of one admitted call.
enum WorkspaceAccess<'a> {
    Shared { _guard: ReadGuard<'a> },
    Exclusive { _guard: WriteGuard<'a> },
}

impl WorkspaceAccess<'_> {
    fn is_exclusive(&self) -> bool {
        matches!(self, WorkspaceAccess::Exclusive { .. })
    }
}

impl ToolExecutor {
    pub fn new(
        registry: Arc<dyn ToolRegistry>,
        engine: Arc<PermissionEngine>,
        cache: Arc<ToolCache>,
    ) -> Self {
        let execution = ExecutionConfig::default();
        Self {
            registry,
            engine,
            cache,
            hooks: Arc::new(HookManager::new()),
            cache_config: CacheConfig::default(),
            runner: TaskRunner::new(execution.max_concurrency),
            tool_timeout: execution.tool_timeout(),
            workspace: RwLock::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<HookManager>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    pub fn with_execution_config(mut self, config: &ExecutionConfig) -> Self {
        self.runner = TaskRunner::new(config.max_concurrency);
        self.tool_timeout = config.tool_timeout();
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.runner = TaskRunner::new(max_concurrency);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.runner.max_concurrency()
    }

    pub fn tool_timeout(&self) -> Duration {
        self.tool_timeout
    }

    /// Run every invocation and return one outcome per invocation, in order.
    #[instrument(
        skip(self, invocations, context),
        fields(session = %context.session_id(), count = invocations.len())
    )]
    pub async fn execute_all(
        &self,
        invocations: &[ToolInvocation],
        context: &ExecutionContext,
    ) -> Vec<ToolOutcome> {
        let hook_context = HookContext::new(context.session_id())
            .with_cwd(context.working_dir())
            .with_env(context.env().clone());

        let mut outcomes: Vec<Option<ToolOutcome>> = vec![None; invocations.len()];
        let mut admitted = Vec::new();
        for (index, invocation) in invocations.iter().enumerate() {
            match self.admit(invocation, &hook_context).await {
                Admission::Refused(refusal) => outcomes[index] = Some(refusal),
                Admission::Allowed(decision) => {
                    admitted.push((index, invocation.clone(), decision))
                }
            }
        }

        let hook_context = &hook_context;
        let tasks: Vec<_> = admitted
            .iter()
            .map(|(_, invocation, decision)| {
                let invocation = invocation.clone();
                let decision = decision.clone();
                move || async move {
                    Ok::<_, Infallible>(
                        self.run_admitted(invocation, decision, context, hook_context)
                            .await,
                    )
                }
            })
            .collect();
        let settled = self.runner.settle_all(tasks).await;

        for ((index, invocation, decision), settled) in admitted.into_iter().zip(settled) {
            outcomes[index] = Some(match settled {
                Settled::Fulfilled(outcome) => outcome,
                Settled::Rejected(failure) => {
                    warn!(tool = %invocation.tool, error = %failure, "Tool task aborted");
                    let mut outcome = ToolOutcome::failed(invocation, failure.to_string());
                    outcome.decision = Some(decision);
                    outcome
                }
            });
        }

        outcomes.into_iter().flatten().collect()
    }

    /// Convenience: run the invocations and return their transcript messages.
    pub async fn execute_to_messages(
        &self,
        invocations: &[ToolInvocation],
        context: &ExecutionContext,
    ) -> Vec<Message> {
        self.execute_all(invocations, context)
            .await
            .iter()
            .map(ToolOutcome::to_message)
            .collect()
    }

    async fn admit(&self, invocation: &ToolInvocation, hook_context: &HookContext) -> Admission {
        if !self.registry.contains(&invocation.tool) {
            return Admission::Refused(ToolOutcome::failed(
                invocation.clone(),
                format!("Unknown tool: {}", invocation.tool),
            ));
        }

        if !self.hooks.is_empty() {
            let input = HookInput::pre_tool_use(&hook_context.session_id, invocation);
            let reason = match self
                .hooks
                .execute(HookEvent::PreToolUse, input, hook_context)
                .await
            {
                Ok(output) if output.is_blocked() => Some(
                    output
                        .stop_reason
                        .unwrap_or_else(|| "Blocked by hook".to_string()),
                ),
                Ok(_) => None,
                Err(e) => Some(e.to_string()),
            };
            if let Some(reason) = reason {
                debug!(tool = %invocation.tool, reason = %reason, "Pre-tool hook refused invocation");
                return Admission::Refused(ToolOutcome::denied(invocation.clone(), &reason, None));
            }
        }

        let decision = if self.registry.requires_permission(&invocation.tool) {
            self.engine.check(invocation).await
        } else {
            self.engine
                .decide_exempt(&invocation.tool, &invocation.arguments)
        };
        if decision.is_denied() {
            let reason = decision.reason.clone();
            return Admission::Refused(ToolOutcome::denied(
                invocation.clone(),
                &reason,
                Some(decision),
            ));
        }
        Admission::Allowed(decision)
    }

    fn is_cacheable(&self, invocation: &ToolInvocation) -> bool {
        invocation.tool.is_builtin() && self.cache_config.is_cacheable(&invocation.tool.name)
    }

    async fn enter_workspace(&self, invocation: &ToolInvocation) -> WorkspaceAccess<'_> {
        if invocation.tool.is_builtin() && is_write_tool(&invocation.tool.name) {
            WorkspaceAccess::Exclusive {
                _guard: self.workspace.write().await,
            }
        } else {
            WorkspaceAccess::Shared {
                _guard: self.workspace.read().await,
            }
        }
    }

    #[instrument(
        skip_all,
        fields(tool = %invocation.tool, category = %self.registry.category(&invocation.tool))
    )]
    async fn run_admitted(
        &self,
        invocation: ToolInvocation,
        decision: PermissionDecision,
        context: &ExecutionContext,
        hook_context: &HookContext,
    ) -> ToolOutcome {
        let started = Instant::now();
        let cacheable = self.is_cacheable(&invocation);
        let access = self.enter_workspace(&invocation).await;
        if access.is_exclusive() {
            debug!("Running write-class tool exclusively");
        }

        // Identical concurrent calls execute once; the second one hits the cache.
        let _in_flight = if cacheable {
            Some(self.cache.lock_key(invocation.fingerprint()).await)
        } else {
            None
        };

        if cacheable
            && let Some(result) = self.cache.get(&invocation.tool, &invocation.arguments).await
        {
            let mut outcome = ToolOutcome::new(invocation, result, ToolOutcomeKind::Cached);
            outcome.decision = Some(decision);
            outcome.duration = started.elapsed();
            return outcome;
        }

        let snapshot = if cacheable {
            Some(self.cache.snapshot(&invocation.arguments).await)
        } else {
            None
        };

        let limit = context.timeout().unwrap_or(self.tool_timeout);
        let (result, kind) =
            match tokio::time::timeout(limit, self.registry.execute(&invocation, context)).await {
                Ok(result) if result.success => (result, ToolOutcomeKind::Executed),
                Ok(result) => (result, ToolOutcomeKind::Failed),
                Err(_) => {
                    warn!(timeout_secs = limit.as_secs_f64(), "Tool execution timed out");
                    (
                        ToolResult::failure(format!(
                            "Tool timed out after {:.1}s",
                            limit.as_secs_f64()
                        )),
                        ToolOutcomeKind::TimedOut,
                    )
                }
            };

        if let Some(snapshot) = snapshot {
            self.cache
                .set_with_snapshot(&invocation.tool, &invocation.arguments, result.clone(), snapshot);
        }
        drop(_in_flight);

        self.invalidate_after(&invocation);
        drop(access);

        let mut outcome = ToolOutcome::new(invocation, result, kind);
        outcome.decision = Some(decision);
        outcome.duration = started.elapsed();

        if !self.hooks.is_empty() {
            let input =
                HookInput::post_tool_use(&hook_context.session_id, &outcome.invocation, &outcome.result);
            // Post hooks never block; failures are logged by the manager.
            if let Ok(output) = self.hooks.execute(input.event, input, hook_context).await {
                outcome.additional_context = output.additional_context;
            }
        }

        debug!(kind = %outcome.kind, elapsed_ms = outcome.duration.as_millis() as u64, "Tool finished");
        outcome
    }

    /// Drop cache entries a write-class call may have made stale. `bash` can
    /// touch anything, so it clears the cache.
    fn invalidate_after(&self, invocation: &ToolInvocation) {
        if !invocation.tool.is_builtin() || !is_write_tool(&invocation.tool.name) {
            return;
        }
        if invocation.tool.name == "bash" {
            self.cache.clear();
            debug!("Cleared tool cache after shell command");
            return;
        }
        let removed: usize = referenced_paths(&invocation.arguments)
            .iter()
            .map(|path| self.cache.invalidate_directory(path))
            .sum();
        if removed > 0 {
            debug!(removed, "Invalidated cached results for written paths");
        }
    }
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("max_concurrency", &self.runner.max_concurrency())
            .field("tool_timeout", &self.tool_timeout)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}
