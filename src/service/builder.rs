//! AgentCoreBuilder and its build step.

use std::sync::Arc;

use async_trait::async_trait;

use super::runtime::AgentCore;
use crate::cache::{FileStat, ToolCache};
use crate::client::{ModelClient, ModelSummarizer};
use crate::compression::{ContextCompressor, SummarizeError, Summarizer};
use crate::config::CoreConfig;
use crate::execution::ToolExecutor;
use crate::hooks::{Hook, HookManager};
use crate::permissions::{Confirmer, PermissionEngine, PermissionManager, RuleStore};
use crate::routing::{ModelRouter, ModelTable};
use crate::tools::ToolRegistry;

pub struct AgentCoreBuilder {
    config: CoreConfig,
    registry: Option<Arc<dyn ToolRegistry>>,
    confirmer: Option<Arc<dyn Confirmer>>,
    rule_store: Option<Arc<dyn RuleStore>>,
    file_stat: Option<Arc<dyn FileStat>>,
    summarizer: Option<Arc<dyn Summarizer>>,
    model_client: Option<Arc<dyn ModelClient>>,
    model_table: Option<ModelTable>,
    hooks: Vec<Arc<dyn Hook>>,
}

impl AgentCoreBuilder {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            registry: None,
            confirmer: None,
            rule_store: None,
            file_stat: None,
            summarizer: None,
            model_client: None,
            model_table: None,
            hooks: Vec::new(),
        }
    }

    /// Tools the core dispatches into. Required.
    pub fn registry(mut self, registry: Arc<dyn ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Interactive confirmation surface. Without one every prompt counts as
    /// cancelled, so calls that need a prompt are denied.
    pub fn confirmer(mut self, confirmer: Arc<dyn Confirmer>) -> Self {
        self.confirmer = Some(confirmer);
        self
    }

    /// Persistent rule storage; rules live in memory when unset.
    pub fn rule_store(mut self, store: Arc<dyn RuleStore>) -> Self {
        self.rule_store = Some(store);
        self
    }

    pub fn file_stat(mut self, stat: Arc<dyn FileStat>) -> Self {
        self.file_stat = Some(stat);
        self
    }

    /// Explicit summarizer; takes precedence over [`Self::model_client`].
    pub fn summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Summarize through the fast-tier model of this client.
    pub fn model_client(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.model_client = Some(client);
        self
    }

    pub fn model_table(mut self, table: ModelTable) -> Self {
        self.model_table = Some(table);
        self
    }

    /// Register a hook in addition to the configured command hooks.
    pub fn hook(mut self, hook: impl Hook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub async fn build(self) -> crate::Result<AgentCore> {
        self.config.validate()?;

        let registry = self
            .registry
            .ok_or_else(|| crate::Error::Config("a tool registry is required".into()))?;

        let manager = match self.rule_store {
            Some(store) => PermissionManager::load(store).await?,
            None => PermissionManager::in_memory(),
        };
        let mut engine = PermissionEngine::new(self.config.permissions.clone())
            .with_manager(Arc::new(manager));
        if let Some(confirmer) = self.confirmer {
            engine = engine.with_confirmer(confirmer);
        }
        let engine = Arc::new(engine);

        let cache = match self.file_stat {
            Some(stat) => ToolCache::with_stat(stat),
            None => ToolCache::new(),
        };
        let cache = Arc::new(cache.with_ttl(self.config.cache.ttl()));

        let mut hooks =
            HookManager::from_config(&self.config.hooks, self.config.execution.hook_timeout())?;
        for hook in self.hooks {
            hooks.register_arc(hook);
        }
        let hooks = Arc::new(hooks);

        let router = ModelRouter::with_table(
            self.model_table.unwrap_or_default(),
            self.config.routing.clone(),
        );

        let summarizer: Arc<dyn Summarizer> = match (self.summarizer, self.model_client) {
            (Some(summarizer), _) => summarizer,
            (None, Some(client)) => Arc::new(ModelSummarizer::new(client, router.table())),
            (None, None) => Arc::new(Unconfigured),
        };

        let executor = ToolExecutor::new(registry, engine.clone(), cache.clone())
            .with_hooks(hooks.clone())
            .with_cache_config(self.config.cache.clone())
            .with_execution_config(&self.config.execution);

        let compressor = ContextCompressor::new(self.config.compression.clone());

        tracing::info!(
            permission_mode = %self.config.permissions.default_mode,
            routing_mode = %self.config.routing.mode,
            max_concurrency = executor.max_concurrency(),
            hooks = hooks.hook_names().len(),
            "Agent core ready"
        );

        Ok(AgentCore::from_parts(
            self.config,
            engine,
            cache,
            hooks,
            router,
            compressor,
            summarizer,
            executor,
        ))
    }
}

/// Used when no summarizer or model client was supplied: every chunk falls
/// back to local condensation.
struct Unconfigured;

#[async_trait]
impl Summarizer for Unconfigured {
    async fn summarize(&self, _text: &str) -> Result<String, SummarizeError> {
        Err(SummarizeError::Unavailable("no summarizer configured".into()))
    }
}
