//! Persistence for long-lived permission rules.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use directories::ProjectDirs;

use super::rules::PermissionRule;
use crate::{Error, Result};

const RULES_FILE: &str = "permission-rules.json";

#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn load(&self) -> Result<Vec<PermissionRule>>;

    async fn save(&self, rules: &[PermissionRule]) -> Result<()>;
}

/// Process-local store; rules are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    rules: std::sync::Mutex<Vec<PermissionRule>>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn load(&self) -> Result<Vec<PermissionRule>> {
        self.rules
            .lock()
            .map(|rules| rules.clone())
            .map_err(|e| Error::RuleStore(e.to_string()))
    }

    async fn save(&self, rules: &[PermissionRule]) -> Result<()> {
        let mut stored = self
            .rules
            .lock()
            .map_err(|e| Error::RuleStore(e.to_string()))?;
        *stored = rules.to_vec();
        Ok(())
    }
}

/// Rules stored as a JSON array, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFileRuleStore {
    path: PathBuf,
}

impl JsonFileRuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the platform config directory, if one can be determined.
    pub fn default_location() -> Option<Self> {
        Self::default_path().map(Self::new)
    }

    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "agent-core", "agent-core")
            .map(|dirs| dirs.config_dir().join(RULES_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RuleStore for JsonFileRuleStore {
    async fn load(&self) -> Result<Vec<PermissionRule>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::RuleStore(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            Error::RuleStore(format!("Failed to parse {}: {}", self.path.display(), e))
        })
    }

    async fn save(&self, rules: &[PermissionRule]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(rules)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
