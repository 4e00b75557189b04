//! Default permission modes.

use serde::{Deserialize, Serialize};

/// Behavior for invocations that no earlier policy step decided.
///
/// - **Interactive**: ask the confirmation surface, consulting session
///   decisions and stored rules first.
/// - **Trust**: allow everything not explicitly denied.
/// - **ReadOnly**: deny write-class tools; other tools fall through to
///   interactive confirmation.
///
/// ```rust
/// use agent_core::permissions::PermissionMode;
///
/// let mode: PermissionMode = "readonly".parse().unwrap();
/// assert!(mode.is_read_only());
/// assert!(!mode.allows_all());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionMode {
    #[default]
    Interactive,
    Trust,
    #[serde(alias = "read_only", alias = "read-only")]
    ReadOnly,
}

impl PermissionMode {
    pub fn allows_all(&self) -> bool {
        matches!(self, PermissionMode::Trust)
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, PermissionMode::ReadOnly)
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, PermissionMode::Interactive)
    }

    pub fn description(&self) -> &'static str {
        match self {
            PermissionMode::Interactive => "Prompt for tools that are not pre-approved",
            PermissionMode::Trust => "Allow every tool that is not explicitly denied",
            PermissionMode::ReadOnly => "Block write-class tools",
        }
    }
}

impl std::fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionMode::Interactive => write!(f, "interactive"),
            PermissionMode::Trust => write!(f, "trust"),
            PermissionMode::ReadOnly => write!(f, "readonly"),
        }
    }
}

impl std::str::FromStr for PermissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "interactive" | "default" | "prompt" => Ok(PermissionMode::Interactive),
            "trust" | "trusted" => Ok(PermissionMode::Trust),
            "readonly" | "read-only" | "read_only" | "plan" => Ok(PermissionMode::ReadOnly),
            _ => Err(format!("Unknown permission mode: {}", s)),
        }
    }
}
