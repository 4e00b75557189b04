//! Coordination primitives and model routing through the public API.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use agent_core::concurrency::{Mutex, RwLock, Semaphore, Settled, TaskFailure, TaskRunner};
use agent_core::prelude::*;
use agent_core::routing::{ModelTable, classify};
use futures::FutureExt;
use futures::future::BoxFuture;
use rust_decimal_macros::dec;
use serde_json::json;

// ============================================================================
// 1. Coordination primitives
// ============================================================================

mod primitive_tests {
    use super::*;

    #[tokio::test]
    async fn test_runner_bounds_concurrency_and_keeps_order() {
        let runner = TaskRunner::new(2);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..6u64)
            .map(|i| {
                let active = active.clone();
                let peak = peak.clone();
                move || async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    // Later tasks finish first.
                    tokio::time::sleep(Duration::from_millis(30 - i * 5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, String>(i * 10)
                }
            })
            .collect();

        let results = runner.run_all(tasks).await;
        let values: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![0, 10, 20, 30, 40, 50]);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_settle_all_isolates_errors_and_panics() {
        let runner = TaskRunner::new(3);
        type Task = Box<dyn FnOnce() -> BoxFuture<'static, std::result::Result<u32, String>>>;
        fn task(
            fut: impl Future<Output = std::result::Result<u32, String>> + Send + 'static,
        ) -> Task {
            Box::new(move || fut.boxed())
        }

        let tasks = vec![
            task(async { Ok::<u32, String>(1) }),
            task(async { Err::<u32, String>("boom".to_string()) }),
            task(async {
                if u32::MAX > 0 {
                    panic!("worker exploded");
                }
                Ok::<u32, String>(3)
            }),
            task(async { Ok::<u32, String>(4) }),
        ];

        let settled = runner.settle_all(tasks).await;
        assert_eq!(settled.len(), 4);
        assert!(matches!(settled[0], Settled::Fulfilled(1)));
        assert!(matches!(&settled[1], Settled::Rejected(TaskFailure::Error(e)) if e == "boom"));
        assert!(matches!(
            &settled[2],
            Settled::Rejected(TaskFailure::Panicked(msg)) if msg.contains("worker exploded")
        ));
        assert!(settled[3].is_fulfilled());
    }

    #[tokio::test]
    async fn test_semaphore_wakes_waiters_in_order() {
        let semaphore = Arc::new(Semaphore::new(1));
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let held = semaphore.acquire().await;
        let mut handles = Vec::new();
        for i in 0..3 {
            let task_semaphore = semaphore.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let _permit = task_semaphore.acquire().await;
                order.lock().unwrap().push(i);
            }));
            // Let each waiter enqueue before spawning the next.
            while semaphore.waiting() < i + 1 {
                tokio::task::yield_now().await;
            }
        }

        drop(held);
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(semaphore.available_permits(), 1);
    }

    #[test]
    fn test_acquire_pends_until_release() {
        let semaphore = Semaphore::new(1);
        let held = tokio_test::block_on(semaphore.acquire());

        let mut waiter = tokio_test::task::spawn(semaphore.acquire());
        tokio_test::assert_pending!(waiter.poll());
        assert_eq!(semaphore.waiting(), 1);

        drop(held);
        assert!(waiter.is_woken());
        let _permit = tokio_test::assert_ready!(waiter.poll());
        assert_eq!(semaphore.waiting(), 0);
        assert_eq!(semaphore.available_permits(), 0);
    }

    #[tokio::test]
    async fn test_mutex_serializes_critical_sections() {
        let mutex = Arc::new(Mutex::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let mutex = mutex.clone();
            let counter = counter.clone();
            let overlaps = overlaps.clone();
            handles.push(tokio::spawn(async move {
                mutex
                    .run_exclusive(|| async {
                        if counter.fetch_add(1, Ordering::SeqCst) != 0 {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        counter.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        assert!(!mutex.is_locked());
    }

    #[tokio::test]
    async fn test_waiting_writer_blocks_new_readers() {
        let lock = Arc::new(RwLock::new());
        let reader = lock.read().await;

        let writer = {
            let lock = lock.clone();
            tokio::spawn(async move {
                let _guard = lock.write().await;
            })
        };
        while lock.waiting_writers() == 0 {
            tokio::task::yield_now().await;
        }

        let late_reader = {
            let lock = lock.clone();
            tokio::spawn(async move {
                let _guard = lock.read().await;
            })
        };
        while lock.waiting_readers() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(lock.readers(), 1);

        drop(reader);
        writer.await.unwrap();
        late_reader.await.unwrap();
        assert_eq!(lock.readers(), 0);
        assert!(!lock.is_write_locked());
    }
}

// ============================================================================
// 2. Model routing
// ============================================================================

mod routing_tests {
    use super::*;

    fn call(tool: &str) -> ToolInvocation {
        ToolInvocation::from_value(tool, json!({}))
    }

    #[test]
    fn test_tool_driven_classification() {
        let read_only = classify("", &[], &[call("read"), call("glob"), call("grep")]);
        assert_eq!(read_only.tier, ModelTier::Fast);
        assert_eq!(read_only.confidence, 0.9);

        let single_write = classify("", &[], &[call("edit")]);
        assert_eq!(single_write.tier, ModelTier::Balanced);

        let many_writes = classify("", &[], &[call("read"), call("write"), call("bash")]);
        assert_eq!(many_writes.tier, ModelTier::Deep);
        assert_eq!(many_writes.confidence, 0.7);
    }

    #[test]
    fn test_message_driven_classification() {
        let deep = classify("Analyze and refactor the scheduler", &[], &[]);
        assert_eq!(deep.tier, ModelTier::Deep);
        assert_eq!(deep.confidence, 0.85);

        let fast = classify("Show me the list of files", &[], &[]);
        assert_eq!(fast.tier, ModelTier::Fast);

        let transcript: Vec<Message> = (0..25).map(|i| Message::user(format!("turn {i}"))).collect();
        let long_running = classify("ok", &transcript, &[]);
        assert_eq!(long_running.tier, ModelTier::Balanced);
        assert_eq!(long_running.confidence, 0.6);

        let default = classify("ok", &[], &[]);
        assert_eq!(default.tier, ModelTier::Balanced);
        assert_eq!(default.confidence, 0.5);
    }

    #[test]
    fn test_router_modes() {
        let table = ModelTable::builtin();
        let fast = table.model_id_for(ModelTier::Fast).unwrap().to_string();
        let deep = table.model_id_for(ModelTier::Deep).unwrap().to_string();

        let auto = ModelRouter::default();
        let (classification, model) =
            auto.route("Design a comprehensive migration plan", &[], &[]);
        assert_eq!(classification.tier, ModelTier::Deep);
        assert_eq!(model, deep);

        let speed = ModelRouter::new(RoutingConfig::default().with_mode(RoutingMode::SpeedOptimized));
        let (_, model) = speed.route("Design a comprehensive migration plan", &[], &[]);
        assert_eq!(model, fast);

        let manual = ModelRouter::new(RoutingConfig::manual("my-finetune"));
        let (_, model) = manual.route("anything", &[], &[]);
        assert_eq!(model, "my-finetune");

        let pinned =
            ModelRouter::new(RoutingConfig::default().with_preferred_tier(ModelTier::Fast));
        let (classification, model) = pinned.route("Debug and optimize this", &[], &[]);
        assert_eq!(classification.tier, ModelTier::Deep);
        assert_eq!(model, fast);
    }

    #[test]
    fn test_cost_estimate_and_cheaper_alternative() {
        let table = ModelTable::builtin();
        let balanced = table.for_tier(ModelTier::Balanced).unwrap();

        let cost = table
            .estimate_cost(&balanced.model_id, 1_000, 1_000)
            .unwrap();
        assert_eq!(cost, dec!(0.018));
        assert!(table.estimate_cost("unknown-model", 1, 1).is_none());

        let cheaper = table.get_cheaper_alternative(&balanced.model_id).unwrap();
        assert_eq!(cheaper.tier, ModelTier::Fast);
        let fastest = table.for_tier(ModelTier::Fast).unwrap();
        assert!(table.get_cheaper_alternative(&fastest.model_id).is_none());
    }
}
