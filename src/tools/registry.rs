//! Tool registry collaborator and a map-backed implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::class::ToolClass;
use super::context::ExecutionContext;
use crate::types::{ToolId, ToolInvocation, ToolResult};

/// Registry interface the execution pipeline dispatches into.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    async fn execute(&self, invocation: &ToolInvocation, context: &ExecutionContext)
    -> ToolResult;

    /// Whether the registry can dispatch `tool` at all.
    fn contains(&self, tool: &ToolId) -> bool;

    /// `false` exempts the tool from interactive confirmation. Configured
    /// denials and read-only mode still apply.
    fn requires_permission(&self, _tool: &ToolId) -> bool {
        true
    }

    /// Free-form category used in logs.
    fn category(&self, tool: &ToolId) -> String {
        ToolClass::of_tool(tool).as_str().to_string()
    }
}

/// A single tool implementation.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn requires_permission(&self) -> bool {
        true
    }

    fn category(&self) -> Option<&str> {
        None
    }

    async fn execute(&self, invocation: &ToolInvocation, context: &ExecutionContext)
    -> ToolResult;
}

/// Registry of tools keyed by qualified name.
#[derive(Default, Clone)]
pub struct ToolSet {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolRegistry for ToolSet {
    async fn execute(
        &self,
        invocation: &ToolInvocation,
        context: &ExecutionContext,
    ) -> ToolResult {
        match self.tools.get(&invocation.tool.qualified_name()) {
            Some(tool) => tool.execute(invocation, context).await,
            None => ToolResult::failure(format!("Unknown tool: {}", invocation.tool)),
        }
    }

    fn contains(&self, tool: &ToolId) -> bool {
        self.tools.contains_key(&tool.qualified_name())
    }

    fn requires_permission(&self, tool: &ToolId) -> bool {
        self.tools
            .get(&tool.qualified_name())
            .is_none_or(|t| t.requires_permission())
    }

    fn category(&self, tool: &ToolId) -> String {
        match self.tools.get(&tool.qualified_name()).and_then(|t| t.category()) {
            Some(category) => category.to_string(),
            None => ToolClass::of_tool(tool).as_str().to_string(),
        }
    }
}
