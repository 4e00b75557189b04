use std::sync::{Arc, PoisonError, RwLock as StdRwLock};

use tracing::{debug, info};
use uuid::Uuid;

use super::rules::{PermissionRule, RuleAction, RuleScope};
use super::store::{MemoryRuleStore, RuleStore};
use crate::Result;
use crate::concurrency::Mutex;
use crate::types::{ToolArguments, ToolId};

/// Owns user-authored rules. `Always` rules are written through to the store
/// on every mutation; `Session` and `Once` rules live in memory only.
pub struct PermissionManager {
    rules: StdRwLock<Vec<PermissionRule>>,
    mutation: Mutex,
    store: Arc<dyn RuleStore>,
}

impl PermissionManager {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self {
            rules: StdRwLock::new(Vec::new()),
            mutation: Mutex::new(),
            store,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRuleStore::new()))
    }

    /// Build a manager seeded with the store's persisted rules.
    pub async fn load(store: Arc<dyn RuleStore>) -> Result<Self> {
        let persisted = store.load().await?;
        debug!(count = persisted.len(), "loaded permission rules");
        let manager = Self::new(store);
        *manager.write_rules() = persisted;
        Ok(manager)
    }

    pub async fn add(
        &self,
        pattern: &str,
        action: RuleAction,
        scope: RuleScope,
    ) -> Result<PermissionRule> {
        let rule = PermissionRule::new(pattern, action, scope)?;
        self.add_rule(rule.clone()).await?;
        Ok(rule)
    }

    pub async fn add_rule(&self, rule: PermissionRule) -> Result<Uuid> {
        let _guard = self.mutation.lock().await;
        let id = rule.id;
        let persist = rule.scope == RuleScope::Always;
        info!(id = %id, pattern = %rule.pattern, action = ?rule.action, scope = ?rule.scope, "adding permission rule");
        self.write_rules().push(rule);

        if persist && let Err(e) = self.persist().await {
            self.write_rules().retain(|r| r.id != id);
            return Err(e);
        }
        Ok(id)
    }

    /// Delete a rule by id. Returns whether a rule was removed.
    pub async fn remove_rule(&self, id: Uuid) -> Result<bool> {
        let _guard = self.mutation.lock().await;
        let removed = {
            let mut rules = self.write_rules();
            let position = rules.iter().position(|r| r.id == id);
            position.map(|i| rules.remove(i))
        };

        match removed {
            Some(rule) if rule.scope == RuleScope::Always => {
                if let Err(e) = self.persist().await {
                    self.write_rules().push(rule);
                    return Err(e);
                }
                Ok(true)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    /// Drop every rule that does not outlive the session.
    pub async fn clear_session_rules(&self) {
        let _guard = self.mutation.lock().await;
        self.write_rules().retain(|r| r.scope == RuleScope::Always);
    }

    pub fn rules(&self) -> Vec<PermissionRule> {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.rules.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All rules whose pattern matches the invocation, in creation order.
    pub fn matching(&self, tool: &ToolId, arguments: &ToolArguments) -> Vec<PermissionRule> {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.matches(tool, arguments))
            .cloned()
            .collect()
    }

    /// The rule allowed to decide without prompting: scope `Session` or
    /// `Always`, with deny taking precedence over allow over prompt.
    pub fn effective_rule(&self, tool: &ToolId, arguments: &ToolArguments) -> Option<PermissionRule> {
        let candidates: Vec<_> = self
            .matching(tool, arguments)
            .into_iter()
            .filter(|r| r.scope.short_circuits())
            .collect();

        [RuleAction::Deny, RuleAction::Allow, RuleAction::Prompt]
            .into_iter()
            .find_map(|action| candidates.iter().find(|r| r.action == action).cloned())
    }

    async fn persist(&self) -> Result<()> {
        let persisted: Vec<_> = self
            .rules()
            .into_iter()
            .filter(|r| r.scope == RuleScope::Always)
            .collect();
        self.store.save(&persisted).await
    }

    fn write_rules(&self) -> std::sync::RwLockWriteGuard<'_, Vec<PermissionRule>> {
        self.rules.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for PermissionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionManager")
            .field("rules", &self.len())
            .finish()
    }
}
