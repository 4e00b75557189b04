use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use super::builder::AgentCoreBuilder;
use crate::cache::ToolCache;
use crate::compression::{CompressionReport, ContextCompressor, Summarizer, estimate_tokens};
use crate::config::CoreConfig;
use crate::execution::{ToolExecutor, ToolOutcome};
use crate::hooks::HookManager;
use crate::permissions::PermissionEngine;
use crate::routing::{ModelRouter, TaskClassification};
use crate::tools::ExecutionContext;
use crate::types::{Message, ToolInvocation};

/// Routing verdict for the next model call.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnPlan {
    pub model_id: String,
    pub classification: TaskClassification,
}

/// One agent session's execution core.
///
/// Built once from [`CoreConfig`] and shared behind an `Arc`. Every piece of
/// per-session state (session decisions, cache, decision log) lives here rather
/// than in globals, so two cores never observe each other.
pub struct AgentCore {
    config: CoreConfig,
    engine: Arc<PermissionEngine>,
    cache: Arc<ToolCache>,
    hooks: Arc<HookManager>,
    router: ModelRouter,
    compressor: ContextCompressor,
    summarizer: Arc<dyn Summarizer>,
    executor: ToolExecutor,
}

impl AgentCore {
    pub fn builder(config: CoreConfig) -> AgentCoreBuilder {
        AgentCoreBuilder::new(config)
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn from_parts(
        config: CoreConfig,
        engine: Arc<PermissionEngine>,
        cache: Arc<ToolCache>,
        hooks: Arc<HookManager>,
        router: ModelRouter,
        compressor: ContextCompressor,
        summarizer: Arc<dyn Summarizer>,
        executor: ToolExecutor,
    ) -> Self {
        Self {
            config,
            engine,
            cache,
            hooks,
            router,
            compressor,
            summarizer,
            executor,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn permissions(&self) -> &Arc<PermissionEngine> {
        &self.engine
    }

    pub fn cache(&self) -> &Arc<ToolCache> {
        &self.cache
    }

    pub fn hooks(&self) -> &Arc<HookManager> {
        &self.hooks
    }

    pub fn router(&self) -> &ModelRouter {
        &self.router
    }

    pub fn compressor(&self) -> &ContextCompressor {
        &self.compressor
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    /// Pick the model for the next turn.
    pub fn plan_turn(
        &self,
        user_message: &str,
        transcript: &[Message],
        pending_tools: &[ToolInvocation],
    ) -> TurnPlan {
        let (classification, model_id) = self.router.route(user_message, transcript, pending_tools);
        TurnPlan {
            model_id,
            classification,
        }
    }

    /// Gate, schedule and run the tool calls proposed by the model.
    pub async fn run_tools(
        &self,
        invocations: &[ToolInvocation],
        context: &ExecutionContext,
    ) -> Vec<ToolOutcome> {
        self.executor.execute_all(invocations, context).await
    }

    /// Bring the transcript back under the token budget, if it is over.
    ///
    /// Chunk summarization runs first. If the result still exceeds the budget,
    /// the least important non-critical messages between the protected head and
    /// tail are evicted. Chunk summaries are never evicted.
    #[instrument(skip_all, fields(messages = transcript.len()))]
    pub async fn maybe_compress(&self, transcript: &[Message]) -> (Vec<Message>, CompressionReport) {
        let (mut messages, mut report) = self
            .compressor
            .compress_with_report(transcript, self.summarizer.as_ref())
            .await;

        let target = self.compressor.options().target_tokens;
        if report.changed() && report.tokens_after > target {
            messages = self.compressor.evict_middle(&messages);
            report.compressed_messages = messages.len();
            report.tokens_after = estimate_tokens(&messages);
            info!(
                messages_after = report.compressed_messages,
                tokens_after = report.tokens_after,
                "Evicted low-importance messages"
            );
        }

        (messages, report)
    }

    /// Forget everything learned in this session: remembered answers, session
    /// rules, the decision log, cached results and cache statistics.
    pub async fn reset_session(&self) {
        self.engine.reset_session();
        self.engine.manager().clear_session_rules().await;
        self.cache.clear();
        self.cache.reset_stats();
        info!("Session state reset");
    }
}

impl std::fmt::Debug for AgentCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentCore")
            .field("engine", &self.engine)
            .field("cache", &self.cache)
            .field("router", &self.router)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}
