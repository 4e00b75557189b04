//! Core data types shared by every subsystem.

mod fingerprint;
mod message;
mod tool;

pub use fingerprint::{Fingerprint, canonical_json};
pub use message::{Message, MessageContent, Role};
pub use tool::{ToolArguments, ToolId, ToolInvocation, ToolOrigin, ToolResult};
