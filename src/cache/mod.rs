//! Tool result cache with file-freshness validation.

mod freshness;
mod store;

pub use freshness::{FileStat, FsStat};
pub use store::{CacheEntry, CacheStats, FileSnapshot, ToolCache};
