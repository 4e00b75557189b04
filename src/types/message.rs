//! Transcript message types.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a transcript participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message body: plain text or provider-neutral structured content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Structured(Value),
}

impl MessageContent {
    /// Content as it is counted for token estimation and fed to summarizers.
    pub fn serialized(&self) -> Cow<'_, str> {
        match self {
            MessageContent::Text(text) => Cow::Borrowed(text),
            MessageContent::Structured(value) => Cow::Owned(value.to_string()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Structured(_) => None,
        }
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Value> for MessageContent {
    fn from(v: Value) -> Self {
        match v {
            Value::String(s) => Self::Text(s),
            other => Self::Structured(other),
        }
    }
}

/// A transcript entry. Ordering inside a transcript is significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text.into())
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text.into())
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text.into())
    }

    pub fn tool(text: impl Into<String>) -> Self {
        Self::new(Role::Tool, text.into())
    }

    pub fn text(&self) -> Cow<'_, str> {
        self.content.serialized()
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(Role::System.to_string(), "system");
        assert_eq!(Role::Tool.to_string(), "tool");
    }

    #[test]
    fn test_structured_content_serializes() {
        let msg = Message::new(Role::Assistant, serde_json::json!({"a": 1}));
        assert_eq!(msg.text(), r#"{"a":1}"#);
        assert!(msg.content.as_text().is_none());
    }

    #[test]
    fn test_string_value_becomes_text() {
        let content = MessageContent::from(serde_json::json!("hello"));
        assert_eq!(content.as_text(), Some("hello"));
    }

    #[test]
    fn test_serde_shape() {
        let msg = Message::user("hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }
}
