//! Tool invocation and result types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::fingerprint::Fingerprint;

/// Ordered argument mapping proposed by the model.
pub type ToolArguments = Map<String, Value>;

/// Where a tool comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolOrigin {
    #[default]
    Builtin,
    /// Tool exposed by an external protocol-adapter server.
    Mcp,
}

/// Structured tool identifier.
///
/// Adapter tools carry their server name as data instead of encoding it into
/// the tool name, so nothing has to be parsed back at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolId {
    pub origin: ToolOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    pub name: String,
}

impl ToolId {
    pub fn builtin(name: impl Into<String>) -> Self {
        Self {
            origin: ToolOrigin::Builtin,
            server: None,
            name: name.into(),
        }
    }

    pub fn mcp(server: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            origin: ToolOrigin::Mcp,
            server: Some(server.into()),
            name: name.into(),
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.origin == ToolOrigin::Builtin
    }

    /// Key used for policy matching and display: `name` for builtins,
    /// `server:name` for adapter tools.
    pub fn qualified_name(&self) -> String {
        match (&self.origin, &self.server) {
            (ToolOrigin::Mcp, Some(server)) => format!("{}:{}", server, self.name),
            _ => self.name.clone(),
        }
    }
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

impl From<&str> for ToolId {
    fn from(name: &str) -> Self {
        Self::builtin(name)
    }
}

impl From<String> for ToolId {
    fn from(name: String) -> Self {
        Self::builtin(name)
    }
}

/// A named operation with arguments proposed by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool: ToolId,
    #[serde(default)]
    pub arguments: ToolArguments,
}

impl ToolInvocation {
    pub fn new(tool: impl Into<ToolId>, arguments: ToolArguments) -> Self {
        Self {
            tool: tool.into(),
            arguments,
        }
    }

    /// Build from a JSON value; anything other than an object yields empty arguments.
    pub fn from_value(tool: impl Into<ToolId>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(tool, arguments)
    }

    pub fn name(&self) -> &str {
        &self.tool.name
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.tool, &self.arguments)
    }

    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// Outcome of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            metadata: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    pub fn is_error(&self) -> bool {
        !self.success
    }

    /// Text suitable for a tool-role transcript message.
    pub fn transcript_text(&self) -> String {
        if self.success {
            self.output.clone()
        } else {
            format!(
                "Error: {}",
                self.error.as_deref().unwrap_or("tool execution failed")
            )
        }
    }
}
