//! Bounded-concurrency task runner.
//!
//! Workers pull the next task from a shared queue as soon as they finish the
//! previous one, so a slow task never stalls a fixed partition of work. Output
//! order always matches input order.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::join_all;

use super::lock_state;

/// Why a settled task did not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum TaskFailure<E> {
    #[error("{0}")]
    Error(E),

    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Per-task outcome of [`TaskRunner::settle_all`].
#[derive(Debug)]
pub enum Settled<T, E> {
    Fulfilled(T),
    Rejected(TaskFailure<E>),
}

impl<T, E> Settled<T, E> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }

    pub fn into_result(self) -> Result<T, TaskFailure<E>> {
        match self {
            Self::Fulfilled(value) => Ok(value),
            Self::Rejected(failure) => Err(failure),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TaskRunner {
    max_concurrency: usize,
}

impl TaskRunner {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Run every task; a failing task's error is stored in place of its value.
    pub async fn run_all<F, Fut, T, E>(&self, tasks: Vec<F>) -> Vec<Result<T, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_indexed(tasks).await
    }

    /// Run every task, converting errors and panics into [`Settled::Rejected`].
    pub async fn settle_all<F, Fut, T, E>(&self, tasks: Vec<F>) -> Vec<Settled<T, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let guarded: Vec<_> = tasks
            .into_iter()
            .map(|task| {
                move || async move {
                    match AssertUnwindSafe(async move { task().await })
                        .catch_unwind()
                        .await
                    {
                        Ok(Ok(value)) => Settled::Fulfilled(value),
                        Ok(Err(e)) => Settled::Rejected(TaskFailure::Error(e)),
                        Err(payload) => {
                            Settled::Rejected(TaskFailure::Panicked(panic_message(payload)))
                        }
                    }
                }
            })
            .collect();
        self.run_indexed(guarded).await
    }

    async fn run_indexed<F, Fut, O>(&self, tasks: Vec<F>) -> Vec<O>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = O>,
    {
        let total = tasks.len();
        if total == 0 {
            return Vec::new();
        }

        let queue = std::sync::Mutex::new(tasks.into_iter().enumerate());
        let workers = self.max_concurrency.min(total);

        let finished = join_all((0..workers).map(|_| async {
            let mut done = Vec::new();
            loop {
                let next = lock_state(&queue).next();
                let Some((index, task)) = next else {
                    break;
                };
                done.push((index, task().await));
            }
            done
        }))
        .await;

        let mut slots: Vec<Option<O>> = (0..total).map(|_| None).collect();
        for (index, output) in finished.into_iter().flatten() {
            slots[index] = Some(output);
        }
        slots.into_iter().flatten().collect()
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new(4)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
