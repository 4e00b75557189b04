//! Core configuration document.
//!
//! ```rust,no_run
//! use agent_core::config::CoreConfig;
//!
//! # async fn example() -> Result<(), agent_core::config::ConfigError> {
//! let config = CoreConfig::load("agent-core.json").await?.apply_env();
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

mod env;
mod settings;
mod validator;

pub use env::{ENV_PREFIX, EnvOverlay};
pub use settings::{CacheConfig, CoreConfig, ExecutionConfig};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// `key` is a dotted path into the document, e.g. `execution.maxConcurrency`.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Malformed config document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Everything [`CoreConfig::validate`] found, in check order.
    #[error("{0}")]
    ValidationErrors(ValidationErrors),
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct ValidationErrors(pub Vec<ConfigError>);

impl ValidationErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Validation failed: ")?;
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
