//! Result cache behavior against a real filesystem.
//!
//! Tools here touch files in a temporary directory, so freshness is decided by
//! actual modification times rather than a fake stat oracle.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use agent_core::prelude::*;
use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Default)]
struct FsRead {
    calls: AtomicUsize,
}

#[async_trait]
impl Tool for FsRead {
    fn name(&self) -> &str {
        "read"
    }

    async fn execute(&self, invocation: &ToolInvocation, _: &ExecutionContext) -> ToolResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(path) = invocation.str_arg("file_path") else {
            return ToolResult::failure("file_path is required");
        };
        match tokio::fs::read_to_string(path).await {
            Ok(content) => ToolResult::success(content),
            Err(e) => ToolResult::failure(format!("{path}: {e}")),
        }
    }
}

struct FsWrite;

#[async_trait]
impl Tool for FsWrite {
    fn name(&self) -> &str {
        "write"
    }

    async fn execute(&self, invocation: &ToolInvocation, _: &ExecutionContext) -> ToolResult {
        let (Some(path), Some(content)) =
            (invocation.str_arg("file_path"), invocation.str_arg("content"))
        else {
            return ToolResult::failure("file_path and content are required");
        };
        match tokio::fs::write(path, content).await {
            Ok(()) => ToolResult::success(format!("wrote {path}")),
            Err(e) => ToolResult::failure(e.to_string()),
        }
    }
}

struct Shell;

#[async_trait]
impl Tool for Shell {
    fn name(&self) -> &str {
        "bash"
    }

    async fn execute(&self, _: &ToolInvocation, _: &ExecutionContext) -> ToolResult {
        ToolResult::success("")
    }
}

struct Harness {
    dir: TempDir,
    reads: Arc<FsRead>,
    core: AgentCore,
}

impl Harness {
    async fn new() -> Self {
        Self::with_config(CoreConfig::default()).await
    }

    async fn with_config(config: CoreConfig) -> Self {
        let reads = Arc::new(FsRead::default());
        let registry = ToolSet::new()
            .with_tool(reads.clone())
            .with_tool(Arc::new(FsWrite))
            .with_tool(Arc::new(Shell));
        let config = config
            .with_permissions(PermissionsConfig::new().with_mode(PermissionMode::Trust));
        let core = AgentCore::builder(config)
            .registry(Arc::new(registry))
            .build()
            .await
            .unwrap();
        Self {
            dir: tempfile::tempdir().unwrap(),
            reads,
            core,
        }
    }

    fn file(&self, name: &str, content: &str) -> String {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn ctx(&self) -> ExecutionContext {
        ExecutionContext::new("cache-session", self.dir.path())
    }

    async fn read(&self, path: &str) -> ToolOutcome {
        let call = ToolInvocation::from_value("read", json!({ "file_path": path }));
        self.core.run_tools(&[call], &self.ctx()).await.remove(0)
    }

    fn read_calls(&self) -> usize {
        self.reads.calls.load(Ordering::SeqCst)
    }
}

fn bump_mtime(path: &Path) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(120))
        .unwrap();
}

// ============================================================================
// Freshness
// ============================================================================

#[tokio::test]
async fn test_unchanged_file_is_served_from_cache() {
    let h = Harness::new().await;
    let path = h.file("notes.txt", "first");

    let first = h.read(&path).await;
    assert_eq!(first.kind, ToolOutcomeKind::Executed);
    let second = h.read(&path).await;
    assert_eq!(second.kind, ToolOutcomeKind::Cached);
    assert_eq!(second.result.output, "first");
    assert_eq!(h.read_calls(), 1);

    let stats = h.core.cache().stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.entry_count, 1);
}

#[tokio::test]
async fn test_modified_file_is_re_executed() {
    let h = Harness::new().await;
    let path = h.file("notes.txt", "first");

    h.read(&path).await;
    std::fs::write(&path, "second").unwrap();
    bump_mtime(Path::new(&path));

    let outcome = h.read(&path).await;
    assert_eq!(outcome.kind, ToolOutcomeKind::Executed);
    assert_eq!(outcome.result.output, "second");
    assert_eq!(h.read_calls(), 2);

    let outcome = h.read(&path).await;
    assert_eq!(outcome.kind, ToolOutcomeKind::Cached);
    assert_eq!(outcome.result.output, "second");
}

#[tokio::test]
async fn test_deleted_file_is_not_served_stale() {
    let h = Harness::new().await;
    let path = h.file("gone.txt", "soon deleted");

    h.read(&path).await;
    std::fs::remove_file(&path).unwrap();

    let outcome = h.read(&path).await;
    assert_eq!(outcome.kind, ToolOutcomeKind::Failed);
    assert_eq!(h.read_calls(), 2);
    assert!(h.core.cache().is_empty());
}

#[tokio::test]
async fn test_failures_are_never_cached() {
    let h = Harness::new().await;
    let missing = h.dir.path().join("missing.txt");
    let missing = missing.to_string_lossy();

    for _ in 0..2 {
        let outcome = h.read(&missing).await;
        assert_eq!(outcome.kind, ToolOutcomeKind::Failed);
    }
    assert_eq!(h.read_calls(), 2);
}

// ============================================================================
// Invalidation
// ============================================================================

#[tokio::test]
async fn test_write_invalidates_cached_reads() {
    let h = Harness::new().await;
    let target = h.file("a.txt", "old");
    let other = h.file("b.txt", "untouched");

    h.read(&target).await;
    h.read(&other).await;
    assert_eq!(h.core.cache().len(), 2);

    let write = ToolInvocation::from_value(
        "write",
        json!({ "file_path": target, "content": "new" }),
    );
    let outcomes = h.core.run_tools(&[write], &h.ctx()).await;
    assert_eq!(outcomes[0].kind, ToolOutcomeKind::Executed);
    assert_eq!(h.core.cache().len(), 1);

    let outcome = h.read(&target).await;
    assert_eq!(outcome.kind, ToolOutcomeKind::Executed);
    assert_eq!(outcome.result.output, "new");
    assert_eq!(h.read(&other).await.kind, ToolOutcomeKind::Cached);
}

#[tokio::test]
async fn test_shell_command_clears_cache() {
    let h = Harness::new().await;
    let path = h.file("a.txt", "content");
    h.read(&path).await;
    assert!(!h.core.cache().is_empty());

    let shell = ToolInvocation::from_value("bash", json!({ "command": "make" }));
    h.core.run_tools(&[shell], &h.ctx()).await;
    assert!(h.core.cache().is_empty());
}

#[tokio::test]
async fn test_disabled_cache_always_executes() {
    let mut config = CoreConfig::default();
    config.cache.enabled = false;
    let h = Harness::with_config(config).await;
    let path = h.file("a.txt", "content");

    for _ in 0..3 {
        assert_eq!(h.read(&path).await.kind, ToolOutcomeKind::Executed);
    }
    assert_eq!(h.read_calls(), 3);
    assert!(h.core.cache().is_empty());
}

// ============================================================================
// Reads and writes proposed in the same turn
// ============================================================================

/// Reads the file, then lingers before returning, like a slow remote read.
struct SlowRead;

#[async_trait]
impl Tool for SlowRead {
    fn name(&self) -> &str {
        "read"
    }

    async fn execute(&self, invocation: &ToolInvocation, _: &ExecutionContext) -> ToolResult {
        let Some(path) = invocation.str_arg("file_path") else {
            return ToolResult::failure("file_path is required");
        };
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => return ToolResult::failure(e.to_string()),
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        ToolResult::success(content)
    }
}

/// Writes shortly after being started.
struct QuickWrite;

#[async_trait]
impl Tool for QuickWrite {
    fn name(&self) -> &str {
        "write"
    }

    async fn execute(&self, invocation: &ToolInvocation, ctx: &ExecutionContext) -> ToolResult {
        tokio::time::sleep(Duration::from_millis(20)).await;
        FsWrite.execute(invocation, ctx).await
    }
}

#[tokio::test]
async fn test_same_turn_write_never_leaves_stale_read_cached() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.txt");
    std::fs::write(&path, "OLD").unwrap();
    let path = path.to_string_lossy().into_owned();

    let registry = ToolSet::new()
        .with_tool(Arc::new(SlowRead))
        .with_tool(Arc::new(QuickWrite));
    let config = CoreConfig::default()
        .with_permissions(PermissionsConfig::new().with_mode(PermissionMode::Trust));
    let core = AgentCore::builder(config)
        .registry(Arc::new(registry))
        .build()
        .await
        .unwrap();
    let ctx = ExecutionContext::new("same-turn", dir.path());

    let read = ToolInvocation::from_value("read", json!({ "file_path": path }));
    let write = ToolInvocation::from_value("write", json!({ "file_path": path, "content": "NEW" }));

    let first = core.run_tools(&[read.clone(), write], &ctx).await;
    assert_eq!(first[0].result.output, "OLD");
    assert_eq!(first[1].kind, ToolOutcomeKind::Executed);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "NEW");

    let second = core.run_tools(&[read], &ctx).await;
    assert_eq!(second[0].kind, ToolOutcomeKind::Executed);
    assert_eq!(second[0].result.output, "NEW");
}
