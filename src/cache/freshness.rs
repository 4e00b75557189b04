//! Filesystem freshness oracle.

use std::io;
use std::path::Path;
use std::time::SystemTime;

use async_trait::async_trait;

/// Reports a path's modification time, or an error if it cannot be read.
#[async_trait]
pub trait FileStat: Send + Sync {
    async fn modified(&self, path: &Path) -> io::Result<SystemTime>;
}

/// [`FileStat`] backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStat;

#[async_trait]
impl FileStat for FsStat {
    async fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        tokio::fs::metadata(path).await?.modified()
    }
}
