//! Counting semaphore with a FIFO wait queue.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub use tokio::sync::{OwnedSemaphorePermit, SemaphorePermit};

/// At most `permits` concurrent holders; waiters are served in arrival order.
///
/// Wraps a fair `tokio::sync::Semaphore` that is never closed, and adds a
/// count of queued waiters.
#[derive(Debug)]
pub struct Semaphore {
    permits: usize,
    inner: Arc<tokio::sync::Semaphore>,
    waiting: AtomicUsize,
}

impl Semaphore {
    /// A semaphore with `permits` slots (at least one).
    pub fn new(permits: usize) -> Self {
        let permits = permits.max(1);
        Self {
            permits,
            inner: Arc::new(tokio::sync::Semaphore::new(permits)),
            waiting: AtomicUsize::new(0),
        }
    }

    pub async fn acquire(&self) -> SemaphorePermit<'_> {
        if let Ok(permit) = self.inner.try_acquire() {
            return permit;
        }
        let _queued = Queued::enter(&self.waiting);
        self.inner
            .acquire()
            .await
            .expect("semaphore should not be closed")
    }

    pub async fn acquire_owned(self: Arc<Self>) -> OwnedSemaphorePermit {
        let inner = Arc::clone(&self.inner);
        if let Ok(permit) = Arc::clone(&inner).try_acquire_owned() {
            return permit;
        }
        let _queued = Queued::enter(&self.waiting);
        inner
            .acquire_owned()
            .await
            .expect("semaphore should not be closed")
    }

    pub fn try_acquire(&self) -> Option<SemaphorePermit<'_>> {
        self.inner.try_acquire().ok()
    }

    /// Run `f` while holding a permit; the permit is returned even if `f` panics.
    pub async fn run_with_permit<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = self.acquire().await;
        f().await
    }

    pub fn available_permits(&self) -> usize {
        self.inner.available_permits()
    }

    /// Acquisitions currently queued for a permit.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> usize {
        self.permits
    }
}

/// Counts one queued acquisition for as long as it waits, including when the
/// waiting future is dropped.
struct Queued<'a>(&'a AtomicUsize);

impl<'a> Queued<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for Queued<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_two_permits_five_tasks() {
        let sem = Semaphore::new(2);
        let current = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);

        let tasks = (0..5).map(|_| async {
            sem.run_with_permit(|| async {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                completed.fetch_add(1, Ordering::SeqCst);
            })
            .await
        });
        futures::future::join_all(tasks).await;

        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(completed.load(Ordering::SeqCst), 5);
        assert_eq!(sem.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_try_acquire() {
        let sem = Semaphore::new(1);
        let permit = sem.try_acquire();
        assert!(permit.is_some());
        assert!(sem.try_acquire().is_none());
        drop(permit);
        assert!(sem.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_zero_permits_clamped() {
        let sem = Semaphore::new(0);
        assert_eq!(sem.capacity(), 1);
        let _p = sem.acquire().await;
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let sem = Arc::new(Semaphore::new(1));
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let held = sem.acquire().await;

        let mut handles = Vec::new();
        for i in 0..3 {
            let task_sem = Arc::clone(&sem);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let _p = task_sem.acquire_owned().await;
                order.lock().unwrap().push(i);
            }));
            while sem.waiting() < i + 1 {
                tokio::task::yield_now().await;
            }
        }

        drop(held);
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_does_not_leak() {
        let sem = Semaphore::new(1);
        let held = sem.acquire().await;

        let timed_out = tokio::time::timeout(Duration::from_millis(10), sem.acquire()).await;
        assert!(timed_out.is_err());

        drop(held);
        assert_eq!(sem.available_permits(), 1);
        assert_eq!(sem.waiting(), 0);
    }

    #[tokio::test]
    async fn test_released_on_panic() {
        let sem = Arc::new(Semaphore::new(1));
        let inner = Arc::clone(&sem);
        let result = tokio::spawn(async move {
            inner
                .run_with_permit(|| async {
                    panic!("boom");
                })
                .await
        })
        .await;

        assert!(result.is_err());
        assert_eq!(sem.available_permits(), 1);
    }
}
