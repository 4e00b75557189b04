//! User-authored permission rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::pattern::ToolPattern;
use crate::Result;
use crate::types::{ToolArguments, ToolId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Deny,
    Prompt,
}

/// How long a rule stays in force.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleScope {
    /// Advisory only; never short-circuits a prompt.
    #[default]
    Once,
    Session,
    /// Persisted through the rule store.
    Always,
}

impl RuleScope {
    pub fn short_circuits(&self) -> bool {
        matches!(self, RuleScope::Session | RuleScope::Always)
    }
}

/// Immutable once created; removed only by id.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRule {
    pub id: Uuid,
    pub pattern: ToolPattern,
    pub action: RuleAction,
    pub scope: RuleScope,
    pub created_at: DateTime<Utc>,
}

impl PermissionRule {
    pub fn new(pattern: &str, action: RuleAction, scope: RuleScope) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            pattern: ToolPattern::parse(pattern)?,
            action,
            scope,
            created_at: Utc::now(),
        })
    }

    pub fn allow(pattern: &str, scope: RuleScope) -> Result<Self> {
        Self::new(pattern, RuleAction::Allow, scope)
    }

    pub fn deny(pattern: &str, scope: RuleScope) -> Result<Self> {
        Self::new(pattern, RuleAction::Deny, scope)
    }

    pub fn matches(&self, tool: &ToolId, arguments: &ToolArguments) -> bool {
        self.pattern.matches(tool, arguments)
    }
}
