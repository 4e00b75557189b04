//! Tool classification and the tool registry collaborator.
//!
//! The core never runs a tool itself: it gates and schedules calls into a
//! [`ToolRegistry`] supplied by the embedding application.

mod class;
mod context;
mod registry;

pub use class::{
    CACHEABLE_TOOLS, PATH_ARGUMENT_KEYS, READ_ONLY_TOOLS, WRITE_TOOLS, ToolClass,
    is_cacheable_tool, is_read_only_tool, is_write_tool, referenced_paths,
};
pub use context::ExecutionContext;
pub use registry::{Tool, ToolRegistry, ToolSet};
