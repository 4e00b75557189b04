//! Writer-preferring read-write lock.
//!
//! Any number of readers or exactly one writer. Once a writer is queued, new
//! readers queue behind it. Releasing the write lock hands off to the next
//! writer if one is waiting, otherwise admits every waiting reader at once.

use std::collections::VecDeque;
use std::future::Future;

use tokio::sync::oneshot;

use super::lock_state;

#[derive(Debug, Default)]
struct State {
    readers: usize,
    writer: bool,
    waiting_readers: Vec<oneshot::Sender<()>>,
    waiting_writers: VecDeque<oneshot::Sender<()>>,
}

impl State {
    fn grant_next_writer(&mut self) -> bool {
        while let Some(waiter) = self.waiting_writers.pop_front() {
            if waiter.send(()).is_ok() {
                self.writer = true;
                return true;
            }
        }
        false
    }

    fn admit_waiting_readers(&mut self) {
        for waiter in self.waiting_readers.drain(..) {
            if waiter.send(()).is_ok() {
                self.readers += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

#[derive(Debug, Default)]
pub struct RwLock {
    state: std::sync::Mutex<State>,
}

impl RwLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self) -> ReadGuard<'_> {
        let rx = {
            let mut state = lock_state(&self.state);
            if !state.writer && state.waiting_writers.is_empty() {
                state.readers += 1;
                return ReadGuard { lock: self };
            }
            let (tx, rx) = oneshot::channel();
            state.waiting_readers.push(tx);
            rx
        };

        self.wait(rx, Access::Read).await;
        ReadGuard { lock: self }
    }

    pub async fn write(&self) -> WriteGuard<'_> {
        let rx = {
            let mut state = lock_state(&self.state);
            if !state.writer && state.readers == 0 {
                state.writer = true;
                return WriteGuard { lock: self };
            }
            let (tx, rx) = oneshot::channel();
            state.waiting_writers.push_back(tx);
            rx
        };

        self.wait(rx, Access::Write).await;
        WriteGuard { lock: self }
    }

    pub async fn with_read<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.read().await;
        f().await
    }

    pub async fn with_write<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.write().await;
        f().await
    }

    /// Number of read locks currently held.
    pub fn readers(&self) -> usize {
        lock_state(&self.state).readers
    }

    pub fn is_write_locked(&self) -> bool {
        lock_state(&self.state).writer
    }

    pub fn waiting_readers(&self) -> usize {
        lock_state(&self.state).waiting_readers.len()
    }

    pub fn waiting_writers(&self) -> usize {
        lock_state(&self.state).waiting_writers.len()
    }

    async fn wait(&self, rx: oneshot::Receiver<()>, access: Access) {
        PendingGrant {
            lock: self,
            rx: Some(rx),
            access,
        }
        .wait()
        .await
    }

    fn release_read(&self) {
        let mut state = lock_state(&self.state);
        state.readers = state.readers.saturating_sub(1);
        if state.readers == 0 {
            state.grant_next_writer();
        }
    }

    fn release_write(&self) {
        let mut state = lock_state(&self.state);
        state.writer = false;
        if !state.grant_next_writer() {
            state.admit_waiting_readers();
        }
    }

    fn abandon(&self, access: Access) {
        let mut state = lock_state(&self.state);
        match access {
            Access::Read => state.waiting_readers.retain(|w| !w.is_closed()),
            Access::Write => {
                state.waiting_writers.retain(|w| !w.is_closed());
                // Readers may have been queued only behind the departed writer.
                if !state.writer && state.waiting_writers.is_empty() {
                    state.admit_waiting_readers();
                }
            }
        }
    }
}

/// Waiting side of an acquisition; returns a granted lock if cancelled.
struct PendingGrant<'a> {
    lock: &'a RwLock,
    rx: Option<oneshot::Receiver<()>>,
    access: Access,
}

impl PendingGrant<'_> {
    async fn wait(mut self) {
        if let Some(rx) = self.rx.as_mut() {
            let _ = rx.await;
        }
        self.rx = None;
    }
}

impl Drop for PendingGrant<'_> {
    fn drop(&mut self) {
        let Some(mut rx) = self.rx.take() else {
            return;
        };
        rx.close();
        if rx.try_recv().is_ok() {
            match self.access {
                Access::Read => self.lock.release_read(),
                Access::Write => self.lock.release_write(),
            }
        } else {
            self.lock.abandon(self.access);
        }
    }
}

#[must_use = "the read lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ReadGuard<'a> {
    lock: &'a RwLock,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_read();
    }
}

#[must_use = "the write lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct WriteGuard<'a> {
    lock: &'a RwLock,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}
