//! `AGENT_CORE_*` environment overlay.
//!
//! Environment variables are read, never written: the overlay takes a lookup
//! function so tests can supply values without mutating the process environment.

use super::settings::CoreConfig;

pub const ENV_PREFIX: &str = "AGENT_CORE_";

/// Source of overlay values, keyed by the full variable name.
pub struct EnvOverlay<F> {
    lookup: F,
}

impl EnvOverlay<fn(&str) -> Option<String>> {
    /// Reads the process environment.
    pub fn process() -> Self {
        Self {
            lookup: |key| std::env::var(key).ok(),
        }
    }
}

impl<F> EnvOverlay<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }

    fn get(&self, name: &str) -> Option<String> {
        let value = (self.lookup)(&format!("{}{}", ENV_PREFIX, name))?;
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    fn parse<T: std::str::FromStr>(&self, name: &str) -> Option<T>
    where
        T::Err: std::fmt::Display,
    {
        let raw = self.get(name)?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    variable = %format!("{}{}", ENV_PREFIX, name),
                    value = %raw,
                    error = %e,
                    "Ignoring invalid environment override"
                );
                None
            }
        }
    }

    /// Overlay every recognised variable onto `config`. Unparseable values are
    /// logged and skipped.
    pub fn apply(&self, mut config: CoreConfig) -> CoreConfig {
        if let Some(mode) = self.parse("PERMISSION_MODE") {
            config.permissions.default_mode = mode;
        }
        if let Some(trusted) = self.parse::<bool>("TRUSTED") {
            config.permissions.trusted_mode = trusted;
        }
        if let Some(mode) = self.parse("ROUTING_MODE") {
            config.routing.mode = mode;
        }
        if let Some(model) = self.get("MODEL") {
            config.routing.manual_model = Some(model);
        }
        if let Some(n) = self.parse("MAX_CONCURRENCY") {
            config.execution.max_concurrency = n;
        }
        if let Some(tokens) = self.parse("TARGET_TOKENS") {
            config.compression.target_tokens = tokens;
        }
        if let Some(secs) = self.parse("TOOL_TIMEOUT_SECS") {
            config.execution.tool_timeout_secs = secs;
        }
        config
    }
}

impl CoreConfig {
    /// Overlay `AGENT_CORE_*` variables from the process environment.
    pub fn apply_env(self) -> Self {
        EnvOverlay::process().apply(self)
    }
}
