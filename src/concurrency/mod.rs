//! Async synchronization primitives used by the core.
//!
//! All primitives are non-reentrant and release on drop, so a guarded section
//! that returns early, errors, or panics never leaves a permit held. They are
//! real synchronization objects: safe to share across tasks on a
//! multi-threaded runtime.
//!
//! The locks guard logical sections rather than owning data; callers keep the
//! protected state next to the lock (for example a map mutated only while a
//! [`Mutex`] guard is alive).

mod mutex;
mod runner;
mod rwlock;
mod semaphore;

pub use mutex::{Mutex, MutexGuard};
pub use runner::{Settled, TaskFailure, TaskRunner};
pub use rwlock::{ReadGuard, RwLock, WriteGuard};
pub use semaphore::{OwnedSemaphorePermit, Semaphore, SemaphorePermit};

use std::sync::{MutexGuard as StdMutexGuard, PoisonError};

/// Lock internal bookkeeping, ignoring poisoning: critical sections only touch
/// counters and queues and cannot leave them half-updated.
pub(crate) fn lock_state<T>(state: &std::sync::Mutex<T>) -> StdMutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
