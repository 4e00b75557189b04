//! Fixed tool classes used by admission control, caching and routing.

use std::collections::HashSet;
use std::path::PathBuf;

use serde_json::Value;

use crate::types::{ToolArguments, ToolId};

/// Tools that never mutate state and are safe to run in parallel.
pub const READ_ONLY_TOOLS: &[&str] = &[
    "read",
    "glob",
    "grep",
    "web_fetch",
    "web_search",
    "file_info",
    "list_dir",
    "todo_write",
    "task",
];

/// Tools that can change the workspace or run arbitrary commands.
pub const WRITE_TOOLS: &[&str] = &["write", "edit", "delete_file", "delete_dir", "move", "bash"];

/// Read-only tools whose output is a pure function of arguments and file state.
pub const CACHEABLE_TOOLS: &[&str] = &["read", "glob", "grep", "list_dir", "file_info", "web_fetch"];

/// Argument keys that conventionally carry filesystem paths.
pub const PATH_ARGUMENT_KEYS: &[&str] = &[
    "file_path",
    "path",
    "dir_path",
    "directory",
    "notebook_path",
    "source",
    "destination",
];

const PATH_LIST_KEYS: &[&str] = &["paths", "file_paths"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolClass {
    ReadOnly,
    Write,
    Other,
}

impl ToolClass {
    pub fn of(tool_name: &str) -> Self {
        if is_read_only_tool(tool_name) {
            Self::ReadOnly
        } else if is_write_tool(tool_name) {
            Self::Write
        } else {
            Self::Other
        }
    }

    /// Class of a structured tool id. Adapter tools never belong to the fixed sets.
    pub fn of_tool(tool: &ToolId) -> Self {
        if tool.is_builtin() {
            Self::of(&tool.name)
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "read_only",
            Self::Write => "write",
            Self::Other => "other",
        }
    }
}

pub fn is_read_only_tool(tool_name: &str) -> bool {
    READ_ONLY_TOOLS.contains(&tool_name)
}

pub fn is_write_tool(tool_name: &str) -> bool {
    WRITE_TOOLS.contains(&tool_name)
}

pub fn is_cacheable_tool(tool_name: &str) -> bool {
    CACHEABLE_TOOLS.contains(&tool_name)
}

/// Filesystem paths referenced by an invocation's arguments, in argument order.
pub fn referenced_paths(arguments: &ToolArguments) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for (key, value) in arguments {
        if PATH_ARGUMENT_KEYS.contains(&key.as_str()) {
            if let Some(s) = value.as_str().filter(|s| !s.is_empty()) {
                paths.push(PathBuf::from(s));
            }
        } else if PATH_LIST_KEYS.contains(&key.as_str())
            && let Value::Array(items) = value
        {
            paths.extend(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from),
            );
        }
    }
    let mut seen = HashSet::new();
    paths.retain(|p| seen.insert(p.clone()));
    paths
}
