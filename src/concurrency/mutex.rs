//! Exclusive lock built on a single-permit semaphore.

use std::future::Future;

use super::semaphore::{Semaphore, SemaphorePermit};

/// At most one holder at a time. Not reentrant: acquiring twice from the same
/// task deadlocks.
#[derive(Debug)]
pub struct Mutex {
    inner: Semaphore,
}

impl Mutex {
    pub fn new() -> Self {
        Self {
            inner: Semaphore::new(1),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_> {
        MutexGuard {
            _permit: self.inner.acquire().await,
        }
    }

    pub fn try_lock(&self) -> Option<MutexGuard<'_>> {
        self.inner
            .try_acquire()
            .map(|permit| MutexGuard { _permit: permit })
    }

    /// Acquire, run `f`, release; the release happens on every exit path.
    pub async fn run_exclusive<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.lock().await;
        f().await
    }

    pub fn is_locked(&self) -> bool {
        self.inner.available_permits() == 0
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct MutexGuard<'a> {
    _permit: SemaphorePermit<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_lock_and_release() {
        let mutex = Mutex::new();
        {
            let _guard = mutex.lock().await;
            assert!(mutex.is_locked());
            assert!(mutex.try_lock().is_none());
        }
        assert!(!mutex.is_locked());
    }

    #[tokio::test]
    async fn test_run_exclusive_releases_on_error() {
        let mutex = Mutex::new();
        let result: Result<(), &str> = mutex.run_exclusive(|| async { Err("failed") }).await;
        assert!(result.is_err());
        assert!(!mutex.is_locked());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_mutual_exclusion() {
        let mutex = Arc::new(Mutex::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();

        for _ in 0..16 {
            let mutex = Arc::clone(&mutex);
            let inside = Arc::clone(&inside);
            handles.push(tokio::spawn(async move {
                mutex
                    .run_exclusive(|| async {
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        tokio::task::yield_now().await;
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(inside.load(Ordering::SeqCst), 0);
    }
}
