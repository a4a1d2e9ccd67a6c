//! # Jobs and job handles.
//!
//! A [`Job`] couples a caller-supplied trigger with the sending half of a
//! `oneshot` channel. The sender is moved into the job and consumed by
//! [`Job::resolve`], so a job can be resolved at most once by construction.
//!
//! The caller keeps the receiving half inside a [`JobHandle`], which is a
//! future yielding the job's result. Dropping an unresolved handle cancels the
//! job on its executor (cooperatively: an in-flight trigger is not aborted).
//!
//! ```text
//! enqueue(trigger) ──► Job { id, trigger, tx } ──► executor queue
//!        │
//!        └──► JobHandle { id, rx } ──await──► JobResult<V>
//!                  │
//!                  └─ drop before resolution ──► spawn cancel(id)
//! ```

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::{ExecutorError, JobResult};

/// Global counter for job ids.
static JOB_SEQ: AtomicU64 = AtomicU64::new(1);

/// Side-effecting action that starts an external operation.
pub type Trigger = Box<dyn FnOnce() + Send + 'static>;

/// Process-unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    pub(crate) fn next() -> Self {
        JobId(JOB_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Raw numeric value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// One pending unit of work.
pub(crate) struct Job<V> {
    id: JobId,
    trigger: Option<Trigger>,
    tx: oneshot::Sender<JobResult<V>>,
    /// Set only while queued; the job is skipped when it reaches the head.
    pub(crate) cancelled: bool,
}

impl<V> Job<V> {
    /// Creates a job and the receiver its caller awaits.
    pub(crate) fn new(trigger: Trigger) -> (Self, oneshot::Receiver<JobResult<V>>) {
        let (tx, rx) = oneshot::channel();
        let job = Self {
            id: JobId::next(),
            trigger: Some(trigger),
            tx,
            cancelled: false,
        };
        (job, rx)
    }

    pub(crate) fn id(&self) -> JobId {
        self.id
    }

    /// Invokes the trigger (at most once).
    ///
    /// A panicking trigger is caught and returned as its panic message.
    pub(crate) fn run(&mut self) -> Result<(), String> {
        let Some(trigger) = self.trigger.take() else {
            return Ok(());
        };
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(trigger))
            .map_err(|panic| panic_message(&*panic))
    }

    /// Delivers `result` to the waiting caller, consuming the job.
    ///
    /// A caller that already went away is ignored.
    pub(crate) fn resolve(self, result: JobResult<V>) {
        let _ = self.tx.send(result);
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Cancellation seam between a handle and the executor that owns its job.
#[async_trait]
pub(crate) trait Cancel: Send + Sync + 'static {
    async fn cancel_job(&self, id: JobId);
}

/// Awaitable result of a submitted job.
///
/// Resolves to the value passed to `complete`/`broadcast`, or to
/// [`ExecutorError::JobCancelled`] / [`ExecutorError::ExecutorDestroyed`].
///
/// Dropping the handle before it resolves cancels the job, unless the owning
/// executor was built with `cancel_on_drop = false`.
#[must_use = "a dropped JobHandle cancels its job"]
pub struct JobHandle<V> {
    id: JobId,
    rx: oneshot::Receiver<JobResult<V>>,
    canceller: Option<Arc<dyn Cancel>>,
    done: bool,
}

impl<V> JobHandle<V> {
    pub(crate) fn new(
        id: JobId,
        rx: oneshot::Receiver<JobResult<V>>,
        canceller: Option<Arc<dyn Cancel>>,
    ) -> Self {
        Self {
            id,
            rx,
            canceller,
            done: false,
        }
    }

    /// Id to pass to `cancel`.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Keeps the job alive even if this handle is dropped.
    pub fn detach(mut self) {
        self.canceller = None;
    }
}

impl<V> fmt::Debug for JobHandle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id)
            .field("done", &self.done)
            .finish()
    }
}

impl<V> Unpin for JobHandle<V> {}

impl<V> Future for JobHandle<V> {
    type Output = JobResult<V>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(res) => {
                this.done = true;
                // A dropped sender means the job was discarded without resolution.
                Poll::Ready(res.unwrap_or(Err(ExecutorError::ExecutorDestroyed)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<V> Drop for JobHandle<V> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let Some(canceller) = self.canceller.take() else {
            return;
        };
        if !matches!(
            self.rx.try_recv(),
            Err(oneshot::error::TryRecvError::Empty)
        ) {
            return;
        }
        let id = self.id;
        if let Ok(rt) = tokio::runtime::Handle::try_current() {
            rt.spawn(async move { canceller.cancel_job(id).await });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let a = JobId::next();
        let b = JobId::next();
        assert!(b > a);
        assert_eq!(format!("{a}"), format!("job#{}", a.as_u64()));
    }

    #[test]
    fn test_trigger_runs_at_most_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let (mut job, _rx) = Job::<()>::new(Box::new(move || {
            h.fetch_add(1, AtomicOrdering::SeqCst);
        }));
        assert!(job.run().is_ok());
        assert!(job.run().is_ok());
        assert_eq!(hits.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_trigger_is_caught() {
        let (mut job, _rx) = Job::<()>::new(Box::new(|| panic!("radio off")));
        assert_eq!(job.run().unwrap_err(), "radio off");
    }

    #[tokio::test]
    async fn test_handle_resolves_with_value() {
        let (job, rx) = Job::<u32>::new(Box::new(|| {}));
        let handle = JobHandle::new(job.id(), rx, None);
        job.resolve(Ok(7));
        assert_eq!(handle.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_dropped_job_reads_as_destroyed() {
        let (job, rx) = Job::<u32>::new(Box::new(|| {}));
        let handle = JobHandle::new(job.id(), rx, None);
        drop(job);
        assert!(matches!(handle.await, Err(ExecutorError::ExecutorDestroyed)));
    }
}
