//! # Single-resource serial executor.
//!
//! [`SerialExecutor`] runs at most one job at a time for one logical resource
//! and advances only when an external event resolves the executing job.
//!
//! ## Flow
//! ```text
//! caller ──submit(trigger)──► queue ──(slot free)──► trigger() ──► external request
//!    ▲                                                                   │
//!    │                                                          external callback
//!    │                                                                   │
//!    └────────────── JobResult<V> ◄──── complete(result) ◄───────────────┘
//! ```
//!
//! ## Rules
//! - All state lives behind one `tokio::sync::Mutex`; every operation holds it
//!   for its whole (non-awaiting) critical section.
//! - Triggers run inside that critical section, so they must not block; they
//!   should only *start* the external operation.
//! - A stray `complete` returns [`ExecutorError::NoJobToExecute`] and publishes
//!   `UnmatchedCompletion`; the executor stays usable.
//! - When the last clone is dropped, every waiter gets `ExecutorDestroyed`.
//!
//! ## Example
//! ```rust
//! use callbridge::SerialExecutor;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let exec: SerialExecutor<u32> = SerialExecutor::new();
//!
//! let handle = exec.enqueue(|| { /* start external read */ }).await;
//! // ... later, from the external callback:
//! exec.complete(Ok(42)).await.unwrap();
//!
//! assert_eq!(handle.await.unwrap(), 42);
//! assert!(!exec.has_work().await);
//! # }
//! ```

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{ExecutorError, JobResult};
use crate::events::Emitter;

use super::job::{Cancel, Job, JobHandle, JobId};
use super::state::{CancelOutcome, ExecutorState};

struct Shared<V> {
    state: Mutex<ExecutorState<V>>,
    cancel_on_drop: bool,
}

/// FIFO executor for one logical resource.
///
/// Cheap to clone; clones share the same queue.
pub struct SerialExecutor<V> {
    shared: Arc<Shared<V>>,
}

impl<V> Clone for SerialExecutor<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V: Send + 'static> Default for SerialExecutor<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Send + 'static> SerialExecutor<V> {
    /// Creates a standalone executor (events are discarded).
    pub fn new() -> Self {
        Self::with_emitter(Emitter::detached("serial"), true)
    }

    pub(crate) fn with_emitter(emitter: Emitter, cancel_on_drop: bool) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ExecutorState::new(emitter, None)),
                cancel_on_drop,
            }),
        }
    }

    /// Queues `trigger` and returns a handle to its result.
    ///
    /// The trigger runs immediately if nothing is executing.
    pub async fn enqueue<F>(&self, trigger: F) -> JobHandle<V>
    where
        F: FnOnce() + Send + 'static,
    {
        let (job, rx) = Job::new(Box::new(trigger));
        let id = job.id();
        let canceller = self.shared.cancel_on_drop.then(|| {
            Arc::new(SerialCanceller {
                shared: Arc::downgrade(&self.shared),
            }) as Arc<dyn Cancel>
        });

        self.shared.state.lock().await.push(job);
        JobHandle::new(id, rx, canceller)
    }

    /// Queues `trigger` and waits for its job to be resolved.
    pub async fn submit<F>(&self, trigger: F) -> JobResult<V>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(trigger).await.await
    }

    /// Resolves the executing job with `result` and starts the next one.
    ///
    /// Fails with [`ExecutorError::NoJobToExecute`] if nothing is executing.
    pub async fn complete(&self, result: JobResult<V>) -> Result<(), ExecutorError> {
        self.shared.state.lock().await.complete(result).map(|_| ())
    }

    /// Resolves the executing job and every queued job with `result`.
    ///
    /// Returns the number of resolved jobs.
    pub async fn broadcast(&self, result: JobResult<V>) -> usize
    where
        V: Clone,
    {
        self.shared.state.lock().await.broadcast(result)
    }

    /// Cancels a job by id (no-op for resolved or unknown ids).
    pub async fn cancel(&self, id: JobId) -> CancelOutcome {
        self.shared.state.lock().await.cancel(id)
    }

    /// Returns `true` while a job is executing or queued.
    pub async fn has_work(&self) -> bool {
        self.shared.state.lock().await.has_work()
    }

    /// Number of executing plus queued jobs.
    pub async fn pending(&self) -> usize {
        self.shared.state.lock().await.pending()
    }

    /// Id of the executing job, if any.
    pub async fn current(&self) -> Option<JobId> {
        self.shared.state.lock().await.current_id()
    }

    /// Resolves all pending work with `ExecutorDestroyed`.
    ///
    /// The executor stays usable afterwards. Returns the number of resolved jobs.
    pub async fn shutdown(&self) -> usize {
        self.shared.state.lock().await.destroy()
    }
}

struct SerialCanceller<V> {
    shared: Weak<Shared<V>>,
}

#[async_trait]
impl<V: Send + 'static> Cancel for SerialCanceller<V> {
    async fn cancel_job(&self, id: JobId) {
        if let Some(shared) = self.shared.upgrade() {
            shared.state.lock().await.cancel(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let make = move || {
            let h = Arc::clone(&h);
            Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }) as Box<dyn FnOnce() + Send>
        };
        (hits, make)
    }

    #[tokio::test]
    async fn test_three_jobs_run_one_at_a_time() {
        let exec: SerialExecutor<u32> = SerialExecutor::new();
        let (hits, make) = counter();

        let first = exec.enqueue(make()).await;
        let second = exec.enqueue(make()).await;
        let third = exec.enqueue(make()).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        exec.complete(Ok(1)).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(first.await.unwrap(), 1);
        assert_eq!(exec.pending().await, 2);

        exec.complete(Ok(2)).await.unwrap();
        exec.complete(Ok(3)).await.unwrap();
        assert_eq!(second.await.unwrap(), 2);
        assert_eq!(third.await.unwrap(), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(!exec.has_work().await);
    }

    #[tokio::test]
    async fn test_submit_waits_for_complete() {
        let exec: SerialExecutor<&'static str> = SerialExecutor::new();
        let waiter = {
            let exec = exec.clone();
            tokio::spawn(async move { exec.submit(|| {}).await })
        };

        while !exec.has_work().await {
            tokio::task::yield_now().await;
        }
        let still_waiting = tokio::time::timeout(Duration::from_millis(20), async {
            while !waiter.is_finished() {
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert!(still_waiting.is_err());

        exec.complete(Ok("done")).await.unwrap();
        assert_eq!(waiter.await.unwrap().unwrap(), "done");
    }

    #[tokio::test]
    async fn test_stray_complete_keeps_executor_usable() {
        let exec: SerialExecutor<u32> = SerialExecutor::new();
        assert!(matches!(
            exec.complete(Ok(0)).await,
            Err(ExecutorError::NoJobToExecute)
        ));

        let handle = exec.enqueue(|| {}).await;
        exec.complete(Ok(5)).await.unwrap();
        assert_eq!(handle.await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_failure_is_delivered_to_caller() {
        let exec: SerialExecutor<u32> = SerialExecutor::new();
        let handle = exec.enqueue(|| {}).await;
        exec.complete(Err(ExecutorError::msg("gatt error 133"))).await.unwrap();
        let err = handle.await.unwrap_err();
        assert_eq!(err.to_string(), "external failure: gatt error 133");
    }

    #[tokio::test]
    async fn test_cancel_current_starts_next() {
        let exec: SerialExecutor<u32> = SerialExecutor::new();
        let (hits, make) = counter();

        let first = exec.enqueue(make()).await;
        let second = exec.enqueue(make()).await;
        let second_id = second.id();

        assert_eq!(exec.cancel(first.id()).await, CancelOutcome::Resolved);
        assert!(first.await.unwrap_err().is_cancelled());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(exec.current().await, Some(second_id));

        exec.complete(Ok(9)).await.unwrap();
        assert_eq!(second.await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_cancel_current_skips_cancelled_next() {
        let exec: SerialExecutor<u32> = SerialExecutor::new();
        let (hits, make) = counter();

        let first = exec.enqueue(make()).await;
        let second = exec.enqueue(make()).await;
        let third = exec.enqueue(make()).await;

        assert_eq!(exec.cancel(second.id()).await, CancelOutcome::Marked);
        assert_eq!(exec.cancel(first.id()).await, CancelOutcome::Resolved);

        assert!(first.await.unwrap_err().is_cancelled());
        assert!(second.await.unwrap_err().is_cancelled());
        // first and third ran, second was skipped
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        exec.complete(Ok(3)).await.unwrap();
        assert_eq!(third.await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_cancel_queued_keeps_order() {
        let exec: SerialExecutor<u32> = SerialExecutor::new();
        let a = exec.enqueue(|| {}).await;
        let b = exec.enqueue(|| {}).await;
        let c = exec.enqueue(|| {}).await;
        let d = exec.enqueue(|| {}).await;

        exec.cancel(b.id()).await;
        exec.complete(Ok(1)).await.unwrap();
        exec.complete(Ok(3)).await.unwrap();
        exec.complete(Ok(4)).await.unwrap();

        assert_eq!(a.await.unwrap(), 1);
        assert!(b.await.unwrap_err().is_cancelled());
        assert_eq!(c.await.unwrap(), 3);
        assert_eq!(d.await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_cancel_resolved_id_is_noop() {
        let exec: SerialExecutor<u32> = SerialExecutor::new();
        let a = exec.enqueue(|| {}).await;
        let id = a.id();
        exec.complete(Ok(1)).await.unwrap();
        assert_eq!(a.await.unwrap(), 1);
        assert_eq!(exec.cancel(id).await, CancelOutcome::Unknown);
    }

    #[tokio::test]
    async fn test_broadcast_resolves_everything() {
        let exec: SerialExecutor<u32> = SerialExecutor::new();
        let a = exec.enqueue(|| {}).await;
        let b = exec.enqueue(|| {}).await;
        let c = exec.enqueue(|| {}).await;

        let resolved = exec.broadcast(Err(ExecutorError::msg("powered off"))).await;
        assert_eq!(resolved, 3);
        for handle in [a, b, c] {
            assert_eq!(
                handle.await.unwrap_err().to_string(),
                "external failure: powered off"
            );
        }
        assert!(!exec.has_work().await);
    }

    #[tokio::test]
    async fn test_dropped_handle_cancels_job() {
        let exec: SerialExecutor<u32> = SerialExecutor::new();
        let (hits, make) = counter();

        let first = exec.enqueue(make()).await;
        let second = exec.enqueue(make()).await;
        drop(first);

        while exec.pending().await != 1 {
            tokio::task::yield_now().await;
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        exec.complete(Ok(2)).await.unwrap();
        assert_eq!(second.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_detached_handle_keeps_job() {
        let exec: SerialExecutor<u32> = SerialExecutor::new();
        exec.enqueue(|| {}).await.detach();
        tokio::task::yield_now().await;
        assert!(exec.has_work().await);
        exec.complete(Ok(1)).await.unwrap();
        assert!(!exec.has_work().await);
    }

    #[tokio::test]
    async fn test_drop_executor_resolves_destroyed() {
        let exec: SerialExecutor<u32> = SerialExecutor::new();
        let a = exec.enqueue(|| {}).await;
        let b = exec.enqueue(|| {}).await;
        drop(exec);
        assert!(matches!(a.await, Err(ExecutorError::ExecutorDestroyed)));
        assert!(matches!(b.await, Err(ExecutorError::ExecutorDestroyed)));
    }

    #[tokio::test]
    async fn test_shutdown_keeps_executor_usable() {
        let exec: SerialExecutor<u32> = SerialExecutor::new();
        let a = exec.enqueue(|| {}).await;
        assert_eq!(exec.shutdown().await, 1);
        assert!(matches!(a.await, Err(ExecutorError::ExecutorDestroyed)));

        let b = exec.enqueue(|| {}).await;
        exec.complete(Ok(2)).await.unwrap();
        assert_eq!(b.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_enqueued_triggers_run_in_order() {
        let exec: SerialExecutor<usize> = SerialExecutor::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..16 {
            let o = Arc::clone(&order);
            handles.push(exec.enqueue(move || o.lock().unwrap().push(i)).await);
        }

        for i in 0..16 {
            exec.complete(Ok(i)).await.unwrap();
        }
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), i);
        }
        assert_eq!(*order.lock().unwrap(), (0..16).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submits_resolve_in_order() {
        const CALLERS: usize = 16;
        let exec: SerialExecutor<usize> = SerialExecutor::new();
        // caller index of the job whose trigger ran and is not completed yet
        let running = Arc::new(std::sync::Mutex::new(None::<usize>));
        let started = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));

        let mut callers = Vec::new();
        for i in 0..CALLERS {
            let exec = exec.clone();
            let running = Arc::clone(&running);
            let started = Arc::clone(&started);
            let overlaps = Arc::clone(&overlaps);
            callers.push(tokio::spawn(async move {
                let value = exec
                    .submit(move || {
                        started.fetch_add(1, Ordering::SeqCst);
                        if running.lock().unwrap().replace(i).is_some() {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                    .await;
                (i, value)
            }));
        }

        for _ in 0..CALLERS {
            let owner = tokio::time::timeout(Duration::from_secs(5), async {
                loop {
                    if let Some(owner) = running.lock().unwrap().take() {
                        return owner;
                    }
                    tokio::task::yield_now().await;
                }
            })
            .await
            .expect("no trigger started");
            assert!(exec.current().await.is_some());
            exec.complete(Ok(owner)).await.unwrap();
        }

        for caller in callers {
            let (i, value) = caller.await.unwrap();
            assert_eq!(value.unwrap(), i);
        }
        assert_eq!(started.load(Ordering::SeqCst), CALLERS);
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        assert!(!exec.has_work().await);
    }
}
