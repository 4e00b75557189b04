//! Hooks that run around tool execution.

mod command;
mod manager;
mod rule;
mod traits;

pub use command::CommandHook;
pub use manager::HookManager;
pub use rule::{HookRule, HooksConfig};
pub use traits::{Hook, HookContext, HookEvent, HookInput, HookOutput};
