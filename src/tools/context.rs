//! Execution context handed to tool implementations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    session_id: String,
    working_dir: PathBuf,
    env: HashMap<String, String>,
    timeout: Option<Duration>,
}

impl ExecutionContext {
    pub fn new(session_id: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            session_id: session_id.into(),
            working_dir: working_dir.into(),
            env: HashMap::new(),
            timeout: None,
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// Deadline the pipeline enforces on the call, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(
            "default",
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        )
    }
}
