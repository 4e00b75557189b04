//! Permission patterns, parsed once when a rule is created.
//!
//! Grammar: `tool` or `tool(constraint, ...)`. The tool part and every
//! constraint value accept `*` wildcards. A constraint is either `key:value`,
//! matched against that argument, or a bare `value`, matched against any
//! scalar argument.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::types::{ToolArguments, ToolId};
use crate::{Error, Result};

/// Wildcard text matcher.
#[derive(Debug, Clone)]
pub enum NameMatcher {
    Any,
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
    Glob(Regex),
}

/// Constraint values use the same wildcard syntax as tool names.
pub type ValueMatcher = NameMatcher;

impl NameMatcher {
    pub fn parse(pattern: &str) -> Result<Self> {
        let stars = pattern.matches('*').count();
        let matcher = match stars {
            0 => Self::Exact(pattern.to_string()),
            _ if pattern.chars().all(|c| c == '*') => Self::Any,
            1 if pattern.ends_with('*') => Self::Prefix(pattern[..pattern.len() - 1].to_string()),
            1 if pattern.starts_with('*') => Self::Suffix(pattern[1..].to_string()),
            2 if pattern.starts_with('*') && pattern.ends_with('*') => {
                Self::Contains(pattern[1..pattern.len() - 1].to_string())
            }
            _ => {
                let body = pattern
                    .split('*')
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(".*");
                let regex = Regex::new(&format!("^{body}$")).map_err(|e| {
                    Error::Config(format!("Invalid permission pattern '{pattern}': {e}"))
                })?;
                Self::Glob(regex)
            }
        };
        Ok(matcher)
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(s) => text == s,
            Self::Prefix(s) => text.starts_with(s.as_str()),
            Self::Suffix(s) => text.ends_with(s.as_str()),
            Self::Contains(s) => text.contains(s.as_str()),
            Self::Glob(regex) => regex.is_match(text),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ArgConstraint {
    KeyValue { key: String, value: ValueMatcher },
    Positional(ValueMatcher),
}

impl ArgConstraint {
    fn parse(item: &str) -> Result<Self> {
        if let Some((key, value)) = item.split_once(':')
            && is_identifier(key.trim())
        {
            return Ok(Self::KeyValue {
                key: key.trim().to_string(),
                value: ValueMatcher::parse(value.trim())?,
            });
        }
        Ok(Self::Positional(ValueMatcher::parse(item)?))
    }

    pub fn matches(&self, arguments: &ToolArguments) -> bool {
        match self {
            Self::KeyValue { key, value } => arguments
                .get(key)
                .and_then(scalar_text)
                .is_some_and(|text| value.matches(&text)),
            Self::Positional(value) => arguments
                .values()
                .filter_map(scalar_text)
                .any(|text| value.matches(&text)),
        }
    }
}

/// A parsed `tool(constraints)` pattern. Serializes as its source text.
#[derive(Debug, Clone)]
pub struct ToolPattern {
    raw: String,
    name: NameMatcher,
    constraints: Vec<ArgConstraint>,
}

impl ToolPattern {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (name, constraints) = match raw.find('(') {
            Some(open) => {
                let Some(inner) = raw[open + 1..].strip_suffix(')') else {
                    return Err(Error::Config(format!(
                        "Invalid permission pattern '{raw}': missing closing parenthesis"
                    )));
                };
                let constraints = inner
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(ArgConstraint::parse)
                    .collect::<Result<Vec<_>>>()?;
                (raw[..open].trim(), constraints)
            }
            None => (raw, Vec::new()),
        };

        if name.is_empty() {
            return Err(Error::Config(format!(
                "Invalid permission pattern '{raw}': empty tool name"
            )));
        }

        Ok(Self {
            raw: raw.to_string(),
            name: NameMatcher::parse(name)?,
            constraints,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn name_matcher(&self) -> &NameMatcher {
        &self.name
    }

    pub fn constraints(&self) -> &[ArgConstraint] {
        &self.constraints
    }

    pub fn matches(&self, tool: &ToolId, arguments: &ToolArguments) -> bool {
        self.name.matches(&tool.qualified_name())
            && self.constraints.iter().all(|c| c.matches(arguments))
    }
}

impl std::fmt::Display for ToolPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for ToolPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for ToolPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
