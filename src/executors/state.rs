//! # Serial executor state machine.
//!
//! [`ExecutorState`] is the lock-free core shared by [`SerialExecutor`](super::SerialExecutor)
//! (one state behind one mutex) and [`ExecutorRegistry`](super::ExecutorRegistry)
//! (many states in one map behind one mutex). It never locks or awaits.
//!
//! ```text
//!            push(job)
//!               │
//!               ▼
//!   queue: [J3, J2] ──advance()──► current: J1 (trigger ran)
//!                                     │
//!          complete(result) ──────────┤  resolve J1, advance
//!          cancel(J1)       ──────────┤  resolve J1 with JobCancelled, advance
//!          cancel(J2)       ──────────┘  mark J2; skipped when reached
//! ```
//!
//! ## Invariants
//! - `current` is `Some` iff a trigger ran and its job is not resolved yet.
//! - While `current` is `None` the queue is empty (advance runs after every mutation).
//! - Jobs resolve in submission order; cancellation marks queued jobs in place.
//! - Dropping the state resolves every remaining job with `ExecutorDestroyed`.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{ExecutorError, JobResult};
use crate::events::{Emitter, Event, EventKind};

use super::job::{Job, JobId};

/// What `cancel` did with the requested job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The job was executing and has been resolved with `JobCancelled`.
    Resolved,
    /// The job was queued; it is resolved with `JobCancelled` when reached.
    Marked,
    /// No pending job with that id.
    Unknown,
}

/// Execution slot plus FIFO queue for one logical resource.
pub(crate) struct ExecutorState<V> {
    current: Option<Job<V>>,
    queue: VecDeque<Job<V>>,
    emitter: Emitter,
    key: Option<Arc<str>>,
}

impl<V> ExecutorState<V> {
    pub(crate) fn new(emitter: Emitter, key: Option<Arc<str>>) -> Self {
        Self {
            current: None,
            queue: VecDeque::new(),
            emitter,
            key,
        }
    }

    /// Executing or queued work exists.
    pub(crate) fn has_work(&self) -> bool {
        self.current.is_some() || !self.queue.is_empty()
    }

    /// Number of executing plus queued jobs.
    pub(crate) fn pending(&self) -> usize {
        usize::from(self.current.is_some()) + self.queue.len()
    }

    /// Id of the executing job.
    pub(crate) fn current_id(&self) -> Option<JobId> {
        self.current.as_ref().map(Job::id)
    }

    /// Appends a job and starts it if the slot is free.
    pub(crate) fn push(&mut self, job: Job<V>) {
        self.emit(Event::new(EventKind::JobQueued).with_job(job.id()));
        self.queue.push_back(job);
        self.advance();
    }

    /// Resolves the executing job and starts the next one.
    pub(crate) fn complete(&mut self, result: JobResult<V>) -> Result<JobId, ExecutorError> {
        let Some(job) = self.current.take() else {
            self.emit(
                Event::new(EventKind::UnmatchedCompletion)
                    .with_reason(ExecutorError::NoJobToExecute.as_label()),
            );
            return Err(ExecutorError::NoJobToExecute);
        };

        let id = job.id();
        let mut ev = Event::new(EventKind::JobResolved).with_job(id);
        if let Err(e) = &result {
            ev = ev.with_reason(e.as_label());
        }
        self.emit(ev);

        job.resolve(result);
        self.advance();
        Ok(id)
    }

    /// Resolves the executing job and every queued job with `result`.
    ///
    /// Queued jobs already marked cancelled still get `JobCancelled`.
    pub(crate) fn broadcast(&mut self, result: JobResult<V>) -> usize
    where
        V: Clone,
    {
        let mut resolved = 0;
        if let Some(job) = self.current.take() {
            job.resolve(result.clone());
            resolved += 1;
        }
        for job in self.queue.drain(..) {
            if job.cancelled {
                job.resolve(Err(ExecutorError::JobCancelled));
            } else {
                job.resolve(result.clone());
            }
            resolved += 1;
        }
        self.emit(Event::new(EventKind::Broadcast).with_reason(format!("resolved={resolved}")));
        resolved
    }

    /// Cancels the job with `id`.
    pub(crate) fn cancel(&mut self, id: JobId) -> CancelOutcome {
        if let Some(job) = self.current.take_if(|job| job.id() == id) {
            self.emit(Event::new(EventKind::JobCancelled).with_job(id));
            job.resolve(Err(ExecutorError::JobCancelled));
            self.advance();
            return CancelOutcome::Resolved;
        }
        match self.queue.iter_mut().find(|job| job.id() == id) {
            Some(job) => {
                job.cancelled = true;
                CancelOutcome::Marked
            }
            None => CancelOutcome::Unknown,
        }
    }

    /// Resolves everything with `ExecutorDestroyed`.
    pub(crate) fn destroy(&mut self) -> usize {
        let mut resolved = 0;
        let current = self.current.take();
        for job in current.into_iter().chain(self.queue.drain(..)) {
            job.resolve(Err(ExecutorError::ExecutorDestroyed));
            resolved += 1;
        }
        if resolved > 0 {
            self.emit(
                Event::new(EventKind::ExecutorDestroyed).with_reason(format!("resolved={resolved}")),
            );
        }
        resolved
    }

    /// Fills the execution slot from the head of the queue.
    ///
    /// Cancelled jobs are resolved and skipped; a panicking trigger resolves
    /// its own job with an external error and the next job is tried.
    fn advance(&mut self) {
        while self.current.is_none() {
            let Some(mut job) = self.queue.pop_front() else {
                return;
            };

            if job.cancelled {
                self.emit(Event::new(EventKind::JobCancelled).with_job(job.id()));
                job.resolve(Err(ExecutorError::JobCancelled));
                continue;
            }

            self.emit(Event::new(EventKind::JobStarted).with_job(job.id()));
            match job.run() {
                Ok(()) => self.current = Some(job),
                Err(panic) => {
                    self.emit(
                        Event::new(EventKind::TriggerPanicked)
                            .with_job(job.id())
                            .with_reason(panic.clone()),
                    );
                    job.resolve(Err(ExecutorError::msg(format!("trigger panicked: {panic}"))));
                }
            }
        }
    }

    fn emit(&self, ev: Event) {
        let ev = match &self.key {
            Some(key) => ev.with_key(Arc::clone(key)),
            None => ev,
        };
        self.emitter.emit(ev);
    }
}

impl<V> Drop for ExecutorState<V> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn state() -> ExecutorState<u32> {
        ExecutorState::new(Emitter::detached("test"), None)
    }

    fn counting_job(hits: &Arc<AtomicUsize>) -> (Job<u32>, oneshot::Receiver<JobResult<u32>>) {
        let h = Arc::clone(hits);
        Job::new(Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_only_head_trigger_runs() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut st = state();
        let (a, _ra) = counting_job(&hits);
        let (b, _rb) = counting_job(&hits);
        let (c, _rc) = counting_job(&hits);
        st.push(a);
        st.push(b);
        st.push(c);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(st.pending(), 3);

        st.complete(Ok(1)).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(st.pending(), 2);
    }

    #[test]
    fn test_complete_without_job() {
        let mut st = state();
        assert!(matches!(st.complete(Ok(1)), Err(ExecutorError::NoJobToExecute)));
        assert!(!st.has_work());
    }

    #[test]
    fn test_cancel_marked_job_is_skipped() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut st = state();
        let (a, mut ra) = counting_job(&hits);
        let (b, mut rb) = counting_job(&hits);
        let (c, _rc) = counting_job(&hits);
        let b_id = b.id();
        let c_id = c.id();
        st.push(a);
        st.push(b);
        st.push(c);

        assert_eq!(st.cancel(b_id), CancelOutcome::Marked);
        assert!(rb.try_recv().is_err());

        st.complete(Ok(10)).unwrap();
        assert_eq!(ra.try_recv().unwrap().unwrap(), 10);
        assert!(matches!(rb.try_recv().unwrap(), Err(ExecutorError::JobCancelled)));
        assert_eq!(st.current_id(), Some(c_id));
        // a and c ran, b never did
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cancel_unknown_is_noop() {
        let mut st = state();
        assert_eq!(st.cancel(JobId::next()), CancelOutcome::Unknown);
    }

    #[test]
    fn test_panicking_trigger_advances_queue() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut st = state();
        let (bad, mut rbad) = Job::<u32>::new(Box::new(|| panic!("boom")));
        let (good, _rgood) = counting_job(&hits);
        let good_id = good.id();
        st.push(bad);
        st.push(good);

        assert!(matches!(rbad.try_recv().unwrap(), Err(ExecutorError::External(_))));
        assert_eq!(st.current_id(), Some(good_id));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_resolves_destroyed() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut st = state();
        let (a, mut ra) = counting_job(&hits);
        let (b, mut rb) = counting_job(&hits);
        st.push(a);
        st.push(b);
        drop(st);
        assert!(matches!(ra.try_recv().unwrap(), Err(ExecutorError::ExecutorDestroyed)));
        assert!(matches!(rb.try_recv().unwrap(), Err(ExecutorError::ExecutorDestroyed)));
    }
}
