//! Bounded admission gate for concurrent tasks
//!
//! Submitting never blocks the caller: each task is spawned right away and
//! first waits for a semaphore permit. The permit is dropped when the task
//! finishes, whatever its result, so at most `capacity` tasks run at once.
//! Tokio's semaphore hands out permits in FIFO order, so no waiter starves.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Caps simultaneously running tasks and tracks every submitted one
pub struct ConcurrencyLimiter<T> {
    /// One permit per running task
    semaphore: Arc<Semaphore>,

    capacity: usize,

    /// Handles of submitted tasks, drained by `reap` and `join_all`
    tasks: Mutex<JoinSet<T>>,
}

impl<T: Send + 'static> ConcurrencyLimiter<T> {
    /// Creates a limiter admitting at most `capacity` tasks (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of tasks currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    /// Number of submitted tasks not yet collected
    pub fn outstanding(&self) -> usize {
        self.lock_tasks().len()
    }

    /// Queues `task`; it starts as soon as a slot is free
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit<F>(&self, task: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        self.lock_tasks().spawn(async move {
            // The semaphore is never closed, so this is always a permit.
            let _permit = semaphore.acquire_owned().await;
            task.await
        });
    }

    /// Collects the outputs of tasks that have already finished
    ///
    /// Never waits. Unfinished tasks stay tracked for a later `reap` or
    /// `join_all`.
    pub fn reap(&self) -> Vec<T> {
        let mut tasks = self.lock_tasks();
        let mut finished = Vec::new();
        while let Some(joined) = tasks.try_join_next() {
            match joined {
                Ok(output) => finished.push(output),
                Err(e) => tracing::error!("Admitted task did not complete: {}", e),
            }
        }
        finished
    }

    /// Waits for every submitted task and returns their outputs
    ///
    /// Tasks submitted while joining are awaited too. A task that panicked
    /// is logged and left out of the result.
    pub async fn join_all(&self) -> Vec<T> {
        let mut results = Vec::new();

        loop {
            let mut batch = std::mem::take(&mut *self.lock_tasks());
            if batch.is_empty() {
                break;
            }

            while let Some(joined) = batch.join_next().await {
                match joined {
                    Ok(output) => results.push(output),
                    Err(e) => tracing::error!("Admitted task did not complete: {}", e),
                }
            }
        }

        results
    }

    fn lock_tasks(&self) -> MutexGuard<'_, JoinSet<T>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
