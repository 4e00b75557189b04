//! Admission control for tool invocations.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::config::PermissionsConfig;
use super::confirm::{Confirmer, Unattended};
use super::danger;
use super::manager::PermissionManager;
use super::rules::RuleAction;
use super::session::SessionDecisions;
use crate::concurrency::{Mutex, lock_state};
use crate::tools::{is_read_only_tool, is_write_tool};
use crate::types::{Fingerprint, ToolArguments, ToolId, ToolInvocation};
use crate::{Error, Result};

const MAX_DECISION_LOG_SIZE: usize = 1000;

/// Which evaluation step produced a decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "ruleId", rename_all = "camelCase")]
pub enum DecisionSource {
    TrustedMode,
    AlwaysDeny,
    AlwaysAllow,
    SafeTool,
    ReadOnlyMode,
    TrustMode,
    SessionCache,
    Rule(Uuid),
    Prompt,
    PromptFailed,
}

impl std::fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TrustedMode => write!(f, "trusted_mode"),
            Self::AlwaysDeny => write!(f, "always_deny"),
            Self::AlwaysAllow => write!(f, "always_allow"),
            Self::SafeTool => write!(f, "safe_tool"),
            Self::ReadOnlyMode => write!(f, "readonly_mode"),
            Self::TrustMode => write!(f, "trust_mode"),
            Self::SessionCache => write!(f, "session_cache"),
            Self::Rule(id) => write!(f, "rule:{id}"),
            Self::Prompt => write!(f, "prompt"),
            Self::PromptFailed => write!(f, "prompt_failed"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PermissionDecision {
    pub allowed: bool,
    pub reason: String,
    pub source: DecisionSource,
}

impl PermissionDecision {
    pub fn allow(reason: impl Into<String>, source: DecisionSource) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
            source,
        }
    }

    pub fn deny(reason: impl Into<String>, source: DecisionSource) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            source,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    pub fn is_denied(&self) -> bool {
        !self.allowed
    }

    /// `Ok(())` when allowed, otherwise [`Error::PermissionDenied`].
    pub fn into_result(self, tool: &ToolId) -> Result<()> {
        if self.allowed {
            Ok(())
        } else {
            Err(Error::permission_denied(tool.qualified_name(), self.reason))
        }
    }
}

/// One entry in the decision log.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRecord {
    pub tool: String,
    pub fingerprint: Fingerprint,
    pub decision: PermissionDecision,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct DecisionLog {
    entries: std::sync::Mutex<VecDeque<DecisionRecord>>,
}

impl DecisionLog {
    fn append(&self, record: DecisionRecord) {
        let mut entries = lock_state(&self.entries);
        if entries.len() >= MAX_DECISION_LOG_SIZE {
            entries.pop_front();
        }
        entries.push_back(record);
    }

    fn snapshot(&self) -> Vec<DecisionRecord> {
        lock_state(&self.entries).iter().cloned().collect()
    }

    fn clear(&self) {
        lock_state(&self.entries).clear();
    }
}

/// Decides, per invocation, whether a tool may run.
///
/// Evaluation order, first match wins:
/// 1. `trusted_mode` allows.
/// 2. `always_deny` denies.
/// 3. `always_allow` or the read-only safe set allows.
/// 4. Read-only mode denies write-class tools.
/// 5. Trust mode allows.
/// 6. Otherwise the remembered session answer, a session/always rule, or an
///    interactive prompt decides. A cancelled or failed prompt denies.
pub struct PermissionEngine {
    config: PermissionsConfig,
    manager: Arc<PermissionManager>,
    session: SessionDecisions,
    confirmer: Arc<dyn Confirmer>,
    prompt_lock: Mutex,
    log: DecisionLog,
}

impl PermissionEngine {
    pub fn new(config: PermissionsConfig) -> Self {
        Self {
            config,
            manager: Arc::new(PermissionManager::in_memory()),
            session: SessionDecisions::new(),
            confirmer: Arc::new(Unattended),
            prompt_lock: Mutex::new(),
            log: DecisionLog::default(),
        }
    }

    pub fn with_manager(mut self, manager: Arc<PermissionManager>) -> Self {
        self.manager = manager;
        self
    }

    pub fn with_confirmer(mut self, confirmer: Arc<dyn Confirmer>) -> Self {
        self.confirmer = confirmer;
        self
    }

    pub fn config(&self) -> &PermissionsConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<PermissionManager> {
        &self.manager
    }

    pub async fn check(&self, invocation: &ToolInvocation) -> PermissionDecision {
        self.decide(&invocation.tool, &invocation.arguments).await
    }

    pub async fn decide(&self, tool: &ToolId, arguments: &ToolArguments) -> PermissionDecision {
        let decision = match Self::policy_decision(&self.config, tool) {
            Some(decision) => decision,
            None => self.decide_interactively(tool, arguments).await,
        };
        self.record(tool, arguments, &decision);
        decision
    }

    /// Decide for a tool the registry exempts from confirmation: configuration
    /// still applies, but nothing is ever prompted.
    pub fn decide_exempt(&self, tool: &ToolId, arguments: &ToolArguments) -> PermissionDecision {
        let decision = Self::policy_decision(&self.config, tool).unwrap_or_else(|| {
            PermissionDecision::allow(
                format!("{tool} does not require permission"),
                DecisionSource::SafeTool,
            )
        });
        self.record(tool, arguments, &decision);
        decision
    }

    /// Steps 1-5: the decision implied by configuration alone, if any.
    pub fn policy_decision(config: &PermissionsConfig, tool: &ToolId) -> Option<PermissionDecision> {
        let name = tool.qualified_name();

        if config.trusted_mode {
            return Some(PermissionDecision::allow(
                "Trusted mode: all tools allowed",
                DecisionSource::TrustedMode,
            ));
        }
        if config.always_deny.contains(&name) {
            return Some(PermissionDecision::deny(
                format!("{name} is in the always-deny list"),
                DecisionSource::AlwaysDeny,
            ));
        }
        if config.always_allow.contains(&name) {
            return Some(PermissionDecision::allow(
                format!("{name} is in the always-allow list"),
                DecisionSource::AlwaysAllow,
            ));
        }
        if tool.is_builtin() && is_read_only_tool(&tool.name) {
            return Some(PermissionDecision::allow(
                format!("{name} is read-only"),
                DecisionSource::SafeTool,
            ));
        }
        if config.default_mode.is_read_only() && tool.is_builtin() && is_write_tool(&tool.name) {
            return Some(PermissionDecision::deny(
                format!("Read-only mode: {name} can modify the workspace"),
                DecisionSource::ReadOnlyMode,
            ));
        }
        if config.default_mode.allows_all() {
            return Some(PermissionDecision::allow(
                "Trust mode: tool allowed",
                DecisionSource::TrustMode,
            ));
        }
        None
    }

    async fn decide_interactively(
        &self,
        tool: &ToolId,
        arguments: &ToolArguments,
    ) -> PermissionDecision {
        let key = Fingerprint::of(tool, arguments);

        // Check-then-prompt-then-record must not interleave for one session.
        let _guard = self.prompt_lock.lock().await;

        if let Some(allowed) = self.session.lookup(key) {
            let reason = if allowed {
                "Previously allowed this session"
            } else {
                "Previously denied this session"
            };
            return PermissionDecision {
                allowed,
                reason: reason.to_string(),
                source: DecisionSource::SessionCache,
            };
        }

        if let Some(rule) = self.manager.effective_rule(tool, arguments) {
            match rule.action {
                RuleAction::Allow => {
                    return PermissionDecision::allow(
                        format!("Allowed by rule: {}", rule.pattern),
                        DecisionSource::Rule(rule.id),
                    );
                }
                RuleAction::Deny => {
                    return PermissionDecision::deny(
                        format!("Denied by rule: {}", rule.pattern),
                        DecisionSource::Rule(rule.id),
                    );
                }
                RuleAction::Prompt => {}
            }
        }

        let dangers = danger::assess(&tool.name, arguments);
        let suggested = dangers.is_empty();
        let prompt = prompt_text(tool, arguments, &dangers);

        match self.confirmer.confirm(&prompt, suggested).await {
            Ok(allowed) => {
                self.session.record(key, allowed);
                PermissionDecision {
                    allowed,
                    reason: if allowed {
                        "Approved by user".to_string()
                    } else {
                        "Rejected by user".to_string()
                    },
                    source: DecisionSource::Prompt,
                }
            }
            Err(e) => {
                warn!(tool = %tool, error = %e, "permission prompt did not complete");
                PermissionDecision::deny(
                    format!("Permission prompt {e}"),
                    DecisionSource::PromptFailed,
                )
            }
        }
    }

    fn record(&self, tool: &ToolId, arguments: &ToolArguments, decision: &PermissionDecision) {
        info!(
            tool = %tool,
            allowed = decision.allowed,
            reason = %decision.reason,
            source = %decision.source,
            "permission decision"
        );
        self.log.append(DecisionRecord {
            tool: tool.qualified_name(),
            fingerprint: Fingerprint::of(tool, arguments),
            decision: decision.clone(),
            decided_at: Utc::now(),
        });
    }

    /// Decisions in the order they were made, oldest first (bounded).
    pub fn recent_decisions(&self) -> Vec<DecisionRecord> {
        self.log.snapshot()
    }

    /// Forget remembered prompt answers and the decision log.
    pub fn reset_session(&self) {
        self.session.clear();
        self.log.clear();
    }

    pub fn session_decisions(&self) -> &SessionDecisions {
        &self.session
    }
}

impl std::fmt::Debug for PermissionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionEngine")
            .field("config", &self.config)
            .field("manager", &self.manager)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

fn prompt_text(tool: &ToolId, arguments: &ToolArguments, dangers: &[&str]) -> String {
    let mut text = format!("Allow {tool} to run");
    if !arguments.is_empty() {
        let args = serde_json::to_string(arguments).unwrap_or_default();
        let shown: String = args.chars().take(200).collect();
        text.push_str(&format!(" with {shown}"));
    }
    text.push('?');
    if !dangers.is_empty() {
        text.push_str(&format!(" Warning: {}", dangers.join(", ")));
    }
    text
}
