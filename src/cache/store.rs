use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex as KeyLock, OwnedMutexGuard};
use tracing::debug;

use super::freshness::{FileStat, FsStat};
use crate::tools::referenced_paths;
use crate::types::{Fingerprint, ToolArguments, ToolId, ToolResult};

/// Modification time per referenced path; `None` when the path could not be
/// stat'ed.
pub type FileSnapshot = HashMap<PathBuf, Option<SystemTime>>;

/// A cached successful result plus the file state it was computed against.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub tool: ToolId,
    pub result: ToolResult,
    pub created_at: DateTime<Utc>,
    pub file_mtimes: FileSnapshot,
}

impl CacheEntry {
    fn references_exact(&self, path: &Path) -> bool {
        self.file_mtimes.keys().any(|p| p == path)
    }

    fn references_within(&self, dir: &Path) -> bool {
        self.file_mtimes.keys().any(|p| p.starts_with(dir))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entry_count: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Results of successful tool calls keyed by invocation fingerprint.
///
/// A hit is only returned after every referenced path is re-stat'ed and found
/// unchanged; stale entries are evicted on lookup.
pub struct ToolCache {
    entries: DashMap<Fingerprint, CacheEntry>,
    in_flight: DashMap<Fingerprint, Arc<KeyLock<()>>>,
    stat: Arc<dyn FileStat>,
    ttl: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ToolCache {
    pub fn new() -> Self {
        Self::with_stat(Arc::new(FsStat))
    }

    pub fn with_stat(stat: Arc<dyn FileStat>) -> Self {
        Self {
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            stat,
            ttl: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub async fn get(&self, tool: &ToolId, arguments: &ToolArguments) -> Option<ToolResult> {
        let key = Fingerprint::of(tool, arguments);
        let Some(entry) = self.entries.get(&key).map(|e| e.value().clone()) else {
            self.record_miss();
            debug!(tool = %tool, fingerprint = %key, "cache miss");
            return None;
        };

        if self.is_expired(&entry) || !self.is_fresh(&entry).await {
            self.entries
                .remove_if(&key, |_, current| current.created_at == entry.created_at);
            self.record_miss();
            debug!(tool = %tool, fingerprint = %key, "evicted stale cache entry");
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!(tool = %tool, fingerprint = %key, "cache hit");
        Some(entry.result)
    }

    /// Store a successful result, stamped with the current file state.
    /// Failed results are ignored.
    pub async fn set(&self, tool: &ToolId, arguments: &ToolArguments, result: ToolResult) {
        if !result.success {
            debug!(tool = %tool, "not caching failed result");
            return;
        }
        let snapshot = self.snapshot(arguments).await;
        self.set_with_snapshot(tool, arguments, result, snapshot);
    }

    /// Stat every path the arguments reference.
    ///
    /// Taken before a tool runs, so a file that changes while the tool is
    /// still executing makes the stored result stale instead of fresh.
    pub async fn snapshot(&self, arguments: &ToolArguments) -> FileSnapshot {
        let mut file_mtimes = HashMap::new();
        for path in referenced_paths(arguments) {
            let mtime = self.stat.modified(&path).await.ok();
            file_mtimes.insert(path, mtime);
        }
        file_mtimes
    }

    /// Store a successful result against a previously taken [`snapshot`](Self::snapshot).
    pub fn set_with_snapshot(
        &self,
        tool: &ToolId,
        arguments: &ToolArguments,
        result: ToolResult,
        file_mtimes: FileSnapshot,
    ) {
        if !result.success {
            debug!(tool = %tool, "not caching failed result");
            return;
        }
        self.entries.insert(
            Fingerprint::of(tool, arguments),
            CacheEntry {
                tool: tool.clone(),
                result,
                created_at: Utc::now(),
                file_mtimes,
            },
        );
    }

    /// Evict every entry that references `path`. Returns the number removed.
    pub fn invalidate_file(&self, path: impl AsRef<Path>) -> usize {
        let path = path.as_ref();
        let removed = self.remove_where(|entry| entry.references_exact(path));
        debug!(path = %path.display(), removed, "invalidated file");
        removed
    }

    /// Evict every entry referencing `dir` or anything nested under it.
    pub fn invalidate_directory(&self, dir: impl AsRef<Path>) -> usize {
        let dir = dir.as_ref();
        let removed = self.remove_where(|entry| entry.references_within(dir));
        debug!(dir = %dir.display(), removed, "invalidated directory");
        removed
    }

    pub fn invalidate_tool(&self, tool: &ToolId) -> usize {
        self.remove_where(|entry| entry.tool == *tool)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// `hits / (hits + misses)`, or 0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let stats = self.stats();
        let total = stats.hits + stats.misses;
        if total == 0 {
            0.0
        } else {
            stats.hits as f64 / total as f64
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize work on one fingerprint: at most one holder per key.
    pub async fn lock_key(&self, key: Fingerprint) -> OwnedMutexGuard<()> {
        self.in_flight
            .retain(|_, lock| Arc::strong_count(lock) > 1);
        let lock = Arc::clone(
            self.in_flight
                .entry(key)
                .or_insert_with(|| Arc::new(KeyLock::new(())))
                .value(),
        );
        lock.lock_owned().await
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        let age = Utc::now().signed_duration_since(entry.created_at);
        age.to_std().map(|age| age > ttl).unwrap_or(false)
    }

    async fn is_fresh(&self, entry: &CacheEntry) -> bool {
        for (path, recorded) in &entry.file_mtimes {
            let current = self.stat.modified(path).await.ok();
            if current != *recorded {
                return false;
            }
        }
        true
    }

    fn remove_where(&self, predicate: impl Fn(&CacheEntry) -> bool) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let evict = predicate(entry);
            if evict {
                removed += 1;
            }
            !evict
        });
        removed
    }
}

impl Default for ToolCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCache")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}
