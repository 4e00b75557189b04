//! # agent-core
//!
//! Execution core for autonomous coding agents.
//!
//! Given tool invocations proposed by a language model, the core decides which
//! may run, runs them under bounded concurrency, remembers their results, keeps
//! the transcript within a token budget, and picks the model tier for the next
//! turn.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use agent_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = CoreConfig::load("agent-core.json").await?.apply_env();
//!     let core = AgentCore::builder(config)
//!         .registry(Arc::new(ToolSet::new()))
//!         .build()
//!         .await?;
//!
//!     let plan = core.plan_turn("Show me src/main.rs", &[], &[]);
//!     println!("next model: {}", plan.model_id);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod cache;
pub mod client;
pub mod compression;
pub mod concurrency;
pub mod config;
pub mod execution;
pub mod hooks;
pub mod permissions;
pub mod prelude;
pub mod routing;
pub mod service;
pub mod tools;
pub mod types;

pub use cache::{CacheStats, FileStat, FsStat, ToolCache};
pub use client::{Completion, ModelClient, ModelSummarizer, Usage};
pub use compression::{
    CompressionOptions, CompressionReport, ContextCompressor, SummarizeError, Summarizer,
};
pub use concurrency::{Mutex, RwLock, Semaphore, Settled, TaskRunner};
pub use config::{CacheConfig, ConfigError, CoreConfig, ExecutionConfig};
pub use execution::{ToolExecutor, ToolOutcome, ToolOutcomeKind};
pub use hooks::{CommandHook, Hook, HookEvent, HookInput, HookManager, HookOutput};
pub use permissions::{
    ConfirmError, Confirmer, DecisionSource, PermissionDecision, PermissionEngine,
    PermissionManager, PermissionMode, PermissionRule, PermissionsConfig, RuleAction, RuleScope,
    RuleStore,
};
pub use routing::{
    ModelConfig, ModelRouter, ModelTable, ModelTier, RoutingConfig, RoutingMode,
    TaskClassification,
};
pub use service::{AgentCore, AgentCoreBuilder, TurnPlan};
pub use tools::{ExecutionContext, Tool, ToolRegistry, ToolSet};
pub use types::{Fingerprint, Message, MessageContent, Role, ToolId, ToolInvocation, ToolResult};

/// Error type for agent-core operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Admission control refused the invocation.
    #[error("Permission denied for {tool}: {reason}")]
    PermissionDenied { tool: String, reason: String },

    /// The tool ran and reported failure.
    #[error("Tool {tool} failed: {message}")]
    ToolExecutionFailed { tool: String, message: String },

    /// Operation exceeded timeout.
    #[error("Operation timed out after {:.1}s", .0.as_secs_f64())]
    Timeout(std::time::Duration),

    /// Hook execution failed (blockable hooks only).
    #[error("Hook '{hook}' failed: {reason}")]
    HookFailed { hook: String, reason: String },

    /// Hook timed out (blockable hooks only).
    #[error("Hook '{hook}' timed out after {duration_secs}s")]
    HookTimeout { hook: String, duration_secs: u64 },

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Permission rules could not be loaded or saved.
    #[error("Rule store error: {0}")]
    RuleStore(String),

    /// File system operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Permission denials and blocking hooks
    Authorization,
    /// Tool failures reported back to the model
    Execution,
    /// Configuration, parsing, or setup errors
    Configuration,
    /// Timeouts
    ResourceLimit,
    /// IO, JSON and persistence failures
    Internal,
}

impl Error {
    pub fn permission_denied(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::PermissionDenied {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::PermissionDenied { .. }
            | Error::HookFailed { .. }
            | Error::HookTimeout { .. } => ErrorCategory::Authorization,
            Error::ToolExecutionFailed { .. } => ErrorCategory::Execution,
            Error::Config(_) => ErrorCategory::Configuration,
            Error::Timeout(_) => ErrorCategory::ResourceLimit,
            Error::RuleStore(_) | Error::Io(_) | Error::Json(_) => ErrorCategory::Internal,
        }
    }

    /// Permission denials and tool failures reach the user; everything else is
    /// handled inside the core.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Error::PermissionDenied { .. } | Error::ToolExecutionFailed { .. }
        )
    }

    pub fn is_authorization_error(&self) -> bool {
        self.category() == ErrorCategory::Authorization
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::InvalidValue { key, message } => {
                Error::Config(format!("Invalid value for {}: {}", key, message))
            }
            config::ConfigError::Serialization(e) => Error::Json(e),
            config::ConfigError::Io(e) => Error::Io(e),
            config::ConfigError::ValidationErrors(errors) => Error::Config(errors.to_string()),
        }
    }
}

impl From<permissions::ConfirmError> for Error {
    fn from(err: permissions::ConfirmError) -> Self {
        Error::permission_denied("confirmation", err.to_string())
    }
}

impl From<compression::SummarizeError> for Error {
    fn from(err: compression::SummarizeError) -> Self {
        Error::ToolExecutionFailed {
            tool: "summarizer".into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            Error::permission_denied("bash", "denied").category(),
            ErrorCategory::Authorization
        );
        assert_eq!(
            Error::Timeout(std::time::Duration::from_secs(1)).category(),
            ErrorCategory::ResourceLimit
        );
        assert_eq!(
            Error::Config("bad".into()).category(),
            ErrorCategory::Configuration
        );
        assert!(Error::RuleStore("disk full".into()).category() == ErrorCategory::Internal);
    }

    #[test]
    fn test_user_visibility() {
        assert!(Error::permission_denied("bash", "denied").is_user_visible());
        assert!(
            Error::ToolExecutionFailed {
                tool: "read".into(),
                message: "missing".into()
            }
            .is_user_visible()
        );
        assert!(!Error::Timeout(std::time::Duration::from_secs(5)).is_user_visible());
        assert!(!Error::Config("x".into()).is_user_visible());
    }

    #[test]
    fn test_display_messages() {
        let err = Error::HookTimeout {
            hook: "lint".into(),
            duration_secs: 60,
        };
        assert_eq!(err.to_string(), "Hook 'lint' timed out after 60s");

        let err = Error::Timeout(std::time::Duration::from_millis(1500));
        assert_eq!(err.to_string(), "Operation timed out after 1.5s");
    }
}
