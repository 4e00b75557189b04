use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigResult;
use crate::compression::CompressionOptions;
use crate::hooks::HooksConfig;
use crate::permissions::PermissionsConfig;
use crate::routing::RoutingConfig;
use crate::tools::CACHEABLE_TOOLS;

/// Scheduling limits for tool execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionConfig {
    pub max_concurrency: usize,
    pub tool_timeout_secs: u64,
    pub hook_timeout_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            tool_timeout_secs: 120,
            hook_timeout_secs: 60,
        }
    }
}

impl ExecutionConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn hook_timeout(&self) -> Duration {
        Duration::from_secs(self.hook_timeout_secs)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Entry lifetime; `None` keeps entries until invalidated.
    pub ttl_secs: Option<u64>,
    pub cacheable_tools: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: None,
            cacheable_tools: CACHEABLE_TOOLS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }

    pub fn is_cacheable(&self, tool: &str) -> bool {
        self.enabled && self.cacheable_tools.iter().any(|t| t == tool)
    }
}

/// Everything the core reads at construction. Never written back.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreConfig {
    pub permissions: PermissionsConfig,
    pub routing: RoutingConfig,
    pub compression: CompressionOptions,
    pub cache: CacheConfig,
    pub execution: ExecutionConfig,
    pub hooks: HooksConfig,
}

impl CoreConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let config = Self::from_json_str(&content)?;
        tracing::debug!(path = %path.as_ref().display(), "Loaded core configuration");
        Ok(config)
    }

    pub fn with_permissions(mut self, permissions: PermissionsConfig) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_routing(mut self, routing: RoutingConfig) -> Self {
        self.routing = routing;
        self
    }

    pub fn with_compression(mut self, compression: CompressionOptions) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_execution(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_hooks(mut self, hooks: HooksConfig) -> Self {
        self.hooks = hooks;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::PermissionMode;
    use crate::routing::RoutingMode;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.execution.max_concurrency, 4);
        assert_eq!(config.execution.tool_timeout(), Duration::from_secs(120));
        assert_eq!(config.execution.hook_timeout(), Duration::from_secs(60));
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl(), None);
        assert!(config.cache.is_cacheable("grep"));
        assert!(!config.cache.is_cacheable("bash"));
        assert_eq!(config.compression.target_tokens, 80_000);
    }

    #[test]
    fn test_partial_document() {
        let config = CoreConfig::from_json_str(
            r#"{
                "permissions": {"defaultMode": "trust"},
                "routing": {"mode": "costOptimized"},
                "cache": {"ttlSecs": 300},
                "execution": {"maxConcurrency": 8}
            }"#,
        )
        .unwrap();
        assert_eq!(config.permissions.default_mode, PermissionMode::Trust);
        assert_eq!(config.routing.mode, RoutingMode::CostOptimized);
        assert_eq!(config.cache.ttl(), Some(Duration::from_secs(300)));
        assert!(config.cache.enabled);
        assert_eq!(config.execution.max_concurrency, 8);
        assert_eq!(config.execution.tool_timeout_secs, 120);
    }

    #[test]
    fn test_disabled_cache_caches_nothing() {
        let cache = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(!cache.is_cacheable("read"));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent-core.json");
        tokio::fs::write(&path, r#"{"compression": {"targetTokens": 1000}}"#)
            .await
            .unwrap();

        let config = CoreConfig::load(&path).await.unwrap();
        assert_eq!(config.compression.target_tokens, 1000);
        assert_eq!(config.compression.keep_last_n, 10);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CoreConfig::load(dir.path().join("absent.json")).await.unwrap_err();
        assert!(matches!(err, super::super::ConfigError::Io(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = CoreConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, super::super::ConfigError::Serialization(_)));
    }
}
