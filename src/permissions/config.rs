use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::PermissionMode;

/// Externally supplied policy input. The engine only reads it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermissionsConfig {
    pub default_mode: PermissionMode,
    pub always_allow: BTreeSet<String>,
    pub always_deny: BTreeSet<String>,
    pub trusted_mode: bool,
}

impl PermissionsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: PermissionMode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn allow(mut self, tool: impl Into<String>) -> Self {
        self.always_allow.insert(tool.into());
        self
    }

    pub fn deny(mut self, tool: impl Into<String>) -> Self {
        self.always_deny.insert(tool.into());
        self
    }

    pub fn trusted(mut self, trusted: bool) -> Self {
        self.trusted_mode = trusted;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_camel_case_with_defaults() {
        let config: PermissionsConfig = serde_json::from_str(
            r#"{"defaultMode": "readonly", "alwaysDeny": ["bash"]}"#,
        )
        .unwrap();
        assert_eq!(config.default_mode, PermissionMode::ReadOnly);
        assert!(config.always_deny.contains("bash"));
        assert!(config.always_allow.is_empty());
        assert!(!config.trusted_mode);
    }
}
