use regex::Regex;

use super::settings::CoreConfig;
use super::{ConfigError, ConfigResult, ValidationErrors};
use crate::tools::is_write_tool;

impl CoreConfig {
    /// Check the whole document, reporting every problem at once.
    pub fn validate(&self) -> ConfigResult<()> {
        let errors = self.collect_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationErrors(ValidationErrors(errors)))
        }
    }

    fn collect_errors(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.execution.max_concurrency == 0 {
            errors.push(ConfigError::invalid(
                "execution.maxConcurrency",
                "must be at least 1",
            ));
        }
        if self.execution.tool_timeout_secs == 0 {
            errors.push(ConfigError::invalid(
                "execution.toolTimeoutSecs",
                "must be greater than 0",
            ));
        }
        if self.execution.hook_timeout_secs == 0 {
            errors.push(ConfigError::invalid(
                "execution.hookTimeoutSecs",
                "must be greater than 0",
            ));
        }

        if self.compression.target_tokens == 0 {
            errors.push(ConfigError::invalid(
                "compression.targetTokens",
                "must be greater than 0",
            ));
        }
        if self.compression.chunk_size == 0 {
            errors.push(ConfigError::invalid(
                "compression.chunkSize",
                "must be at least 1",
            ));
        }

        if self.cache.ttl_secs == Some(0) {
            errors.push(ConfigError::invalid("cache.ttlSecs", "must be greater than 0"));
        }
        for tool in &self.cache.cacheable_tools {
            if is_write_tool(tool) {
                errors.push(ConfigError::invalid(
                    "cache.cacheableTools",
                    format!("write-class tool '{}' cannot be cached", tool),
                ));
            }
        }

        if self
            .routing
            .manual_model
            .as_deref()
            .is_some_and(|m| m.trim().is_empty())
        {
            errors.push(ConfigError::invalid("routing.manualModel", "must not be empty"));
        }

        for tool in self
            .permissions
            .always_allow
            .intersection(&self.permissions.always_deny)
        {
            errors.push(ConfigError::invalid(
                "permissions",
                format!("'{}' is in both alwaysAllow and alwaysDeny", tool),
            ));
        }

        let hooks = self
            .hooks
            .pre_tool_use
            .iter()
            .map(|h| ("hooks.preToolUse", h))
            .chain(self.hooks.post_tool_use.iter().map(|h| ("hooks.postToolUse", h)));
        for (key, hook) in hooks {
            if hook.command.trim().is_empty() {
                errors.push(ConfigError::invalid(key, "command must not be empty"));
            }
            if let Some(matcher) = &hook.matcher
                && let Err(e) = Regex::new(matcher)
            {
                errors.push(ConfigError::invalid(
                    key,
                    format!("invalid matcher '{}': {}", matcher, e),
                ));
            }
        }

        errors
    }
}
