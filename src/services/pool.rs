use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::error::StoreError;

/// Bounded fan-out for chunk reads and writes.
///
/// Clones share one set of permits, so the limit holds across every request
/// served by the same [`FileService`](super::FileService). Tasks are polled
/// inside the caller's future: dropping that future cancels all of them.
#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    task_timeout: Duration,
}

impl WorkerPool {
    /// A limit of zero is raised to one.
    pub fn new(max_concurrency: usize, task_timeout: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            task_timeout,
        }
    }

    /// Runs every task, at most `max_concurrency` at a time, and waits for all
    /// of them to finish. Results are in submission order.
    pub async fn run_all<I, Fut, T>(&self, tasks: I) -> Vec<Result<T, StoreError>>
    where
        I: IntoIterator<Item = Fut>,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        join_all(tasks.into_iter().map(|task| self.run_one(task))).await
    }

    async fn run_one<Fut, T>(&self, task: Fut) -> Result<T, StoreError>
    where
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| StoreError::Unavailable("worker pool closed".to_string()))?;

        // the deadline starts once the task holds a permit
        match tokio::time::timeout(self.task_timeout, task).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.task_timeout)),
        }
    }
}
