//! # Data stream bridge - push callbacks to a cancellable lazy stream.
//!
//! [`DataStreamBridge`] owns at most one active subscription. Each call to
//! [`create`](DataStreamBridge::create) hands back a [`DataStream`]; external
//! producers push into it with [`send`](DataStreamBridge::send) /
//! [`send_error`](DataStreamBridge::send_error) and end it with
//! [`finish`](DataStreamBridge::finish).
//!
//! ## State machine
//! ```text
//!            create()             on_start Ok
//!   Idle ───────────────► Starting ────────────► Active
//!    ▲                       │                     │ finish / error item / consumer drop
//!    │    on_start Err       │                     ▼
//!    ├───────────────────────┘                Terminating
//!    │                                             │ on_termination done (Ok or Err)
//!    └─────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//! - `create` while a subscription exists yields a single `OperationInProgress` error.
//! - `on_start` runs on the first poll, never at `create`.
//! - `on_termination` runs exactly once per created stream, whatever ended it.
//!   The one deliberate exception is a failed `on_start`: nothing was started,
//!   so `on_termination` is skipped and the slot is released directly.
//! - `on_start` never runs once termination has begun, even if the first poll
//!   comes later.
//! - A failing `on_termination` is published as `StreamTerminationFailed`; the
//!   slot is released anyway.
//! - Every subscription has a generation; a late termination of an old stream
//!   can never release a newer one.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::{FutureExt, Stream};
use tokio::sync::mpsc;

use crate::error::{ExecutorError, JobResult};
use crate::events::{Emitter, Event, EventKind};

type Hook = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), ExecutorError>> + Send>;

/// Observable phase of a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// No subscription; `create` is allowed.
    Idle,
    /// Stream created, `on_start` not finished yet.
    Starting,
    /// `on_start` succeeded; values flow.
    Active,
    /// `on_termination` is running.
    Terminating,
}

struct Subscription<T> {
    generation: u64,
    phase: StreamPhase,
    tx: Option<mpsc::UnboundedSender<JobResult<T>>>,
    on_termination: Option<Hook>,
}

struct BridgeInner<T> {
    slot: Mutex<Option<Subscription<T>>>,
    generation: AtomicU64,
    emitter: Emitter,
}

impl<T> BridgeInner<T> {
    fn lock(&self) -> MutexGuard<'_, Option<Subscription<T>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_starting(&self, generation: u64) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|sub| sub.generation == generation && sub.phase == StreamPhase::Starting)
    }

    fn mark_active(&self, generation: u64) {
        let started = match self.lock().as_mut() {
            Some(sub) if sub.generation == generation && sub.phase == StreamPhase::Starting => {
                sub.phase = StreamPhase::Active;
                true
            }
            _ => false,
        };
        if started {
            self.emitter.emit(Event::new(EventKind::StreamStarted));
        }
    }

    /// Releases the slot without running `on_termination`.
    fn start_failed(&self, generation: u64, error: &ExecutorError) {
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|sub| sub.generation == generation) {
            *slot = None;
        }
        drop(slot);
        self.emitter
            .emit(Event::new(EventKind::StreamStartFailed).with_reason(error.to_string()));
    }

    /// Moves the subscription to `Terminating` and hands out its hook.
    ///
    /// `None` targets whichever subscription is current. Returns the generation
    /// and hook only to the first caller; later callers get `None`.
    fn begin_termination(&self, generation: Option<u64>) -> Option<(u64, Hook)> {
        let mut slot = self.lock();
        let sub = slot.as_mut()?;
        if generation.is_some_and(|g| g != sub.generation) {
            return None;
        }
        if sub.phase == StreamPhase::Terminating {
            return None;
        }
        sub.phase = StreamPhase::Terminating;
        sub.tx = None;
        let hook = sub.on_termination.take()?;
        Some((sub.generation, hook))
    }

    fn release(&self, generation: u64) {
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|sub| sub.generation == generation) {
            *slot = None;
        }
    }

    fn push(&self, item: JobResult<T>) -> bool {
        let slot = self.lock();
        let delivered = slot
            .as_ref()
            .and_then(|sub| sub.tx.as_ref())
            .is_some_and(|tx| tx.send(item).is_ok());
        drop(slot);
        if !delivered {
            self.emitter.emit(Event::new(EventKind::StreamValueDropped));
        }
        delivered
    }
}

impl<T: Send + 'static> BridgeInner<T> {
    /// Runs `hook` and then releases the slot for `generation`.
    fn termination(self: &Arc<Self>, generation: u64, hook: Hook) -> BoxFuture<'static, ()> {
        let inner = Arc::clone(self);
        async move {
            if let Err(e) = hook().await {
                inner
                    .emitter
                    .emit(Event::new(EventKind::StreamTerminationFailed).with_reason(e.to_string()));
            }
            inner.release(generation);
            inner.emitter.emit(Event::new(EventKind::StreamTerminated));
        }
        .boxed()
    }
}

/// Single-subscription bridge from push callbacks to a [`DataStream`].
///
/// Cheap to clone; clones share the same slot.
///
/// ## Example
/// ```rust
/// use callbridge::DataStreamBridge;
/// use futures::StreamExt;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let scans: DataStreamBridge<u8> = DataStreamBridge::new();
///
/// let mut stream = scans.create(
///     || async { /* start scanning */ Ok(()) },
///     || async { /* stop scanning */ Ok(()) },
/// );
///
/// scans.send(1);
/// scans.send(2);
/// scans.finish().await;
///
/// assert_eq!(stream.next().await.unwrap().unwrap(), 1);
/// assert_eq!(stream.next().await.unwrap().unwrap(), 2);
/// assert!(stream.next().await.is_none());
/// # }
/// ```
pub struct DataStreamBridge<T> {
    inner: Arc<BridgeInner<T>>,
}

impl<T> Clone for DataStreamBridge<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> Default for DataStreamBridge<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> DataStreamBridge<T> {
    /// Creates a standalone bridge (events are discarded).
    pub fn new() -> Self {
        Self::with_emitter(Emitter::detached("stream"))
    }

    pub(crate) fn with_emitter(emitter: Emitter) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                slot: Mutex::new(None),
                generation: AtomicU64::new(1),
                emitter,
            }),
        }
    }

    /// Creates the stream for a new subscription.
    ///
    /// `on_start` runs when the stream is first polled; `on_termination` runs
    /// once when the stream ends. If a subscription is already active, the
    /// returned stream yields `OperationInProgress` and ends; neither hook runs.
    pub fn create<S, SF, E, EF>(&self, on_start: S, on_termination: E) -> DataStream<T>
    where
        S: FnOnce() -> SF + Send + 'static,
        SF: Future<Output = Result<(), ExecutorError>> + Send + 'static,
        E: FnOnce() -> EF + Send + 'static,
        EF: Future<Output = Result<(), ExecutorError>> + Send + 'static,
    {
        let mut slot = self.inner.lock();
        if slot.is_some() {
            drop(slot);
            self.inner.emitter.emit(
                Event::new(EventKind::StreamRejected)
                    .with_reason(ExecutorError::OperationInProgress.as_label()),
            );
            return DataStream {
                inner: Arc::clone(&self.inner),
                generation: 0,
                state: State::Rejected,
            };
        }

        let generation = self.inner.generation.fetch_add(1, AtomicOrdering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let on_start: Hook = Box::new(move || on_start().boxed());
        let on_termination: Hook = Box::new(move || on_termination().boxed());

        *slot = Some(Subscription {
            generation,
            phase: StreamPhase::Starting,
            tx: Some(tx),
            on_termination: Some(on_termination),
        });

        DataStream {
            inner: Arc::clone(&self.inner),
            generation,
            state: State::Pending { on_start, rx },
        }
    }

    /// Delivers a value to the active stream.
    ///
    /// Returns `false` (and publishes `StreamValueDropped`) if no stream is
    /// listening.
    pub fn send(&self, value: T) -> bool {
        self.inner.push(Ok(value))
    }

    /// Delivers a terminal error; the stream ends after yielding it.
    pub fn send_error(&self, error: ExecutorError) -> bool {
        self.inner.push(Err(error))
    }

    /// Ends the active stream normally and waits for `on_termination`.
    ///
    /// Values sent before `finish` are still delivered. No-op when idle.
    pub async fn finish(&self) {
        if let Some((generation, hook)) = self.inner.begin_termination(None) {
            self.inner.termination(generation, hook).await;
        }
    }

    /// Ends the active stream with `error` and waits for `on_termination`.
    pub async fn finish_with(&self, error: ExecutorError) {
        if self.is_active() {
            self.inner.push(Err(error));
        }
        self.finish().await;
    }

    /// Current phase of the bridge.
    pub fn phase(&self) -> StreamPhase {
        self.inner
            .lock()
            .as_ref()
            .map_or(StreamPhase::Idle, |sub| sub.phase)
    }

    /// Returns `true` while a subscription occupies the slot.
    pub fn is_active(&self) -> bool {
        self.inner.lock().is_some()
    }
}

enum State<T> {
    Rejected,
    Pending {
        on_start: Hook,
        rx: mpsc::UnboundedReceiver<JobResult<T>>,
    },
    Starting {
        fut: BoxFuture<'static, Result<(), ExecutorError>>,
        rx: mpsc::UnboundedReceiver<JobResult<T>>,
    },
    Active {
        rx: mpsc::UnboundedReceiver<JobResult<T>>,
    },
    Closing(BoxFuture<'static, ()>),
    Done,
}

/// Consumer side of a bridge subscription.
///
/// Yields `Ok` values in send order; an `Err` item is always the last one.
/// Dropping the stream terminates the subscription.
#[must_use = "streams do nothing unless polled"]
pub struct DataStream<T: Send + 'static> {
    inner: Arc<BridgeInner<T>>,
    generation: u64,
    state: State<T>,
}

// Never pinned structurally: the hook futures are boxed.
impl<T: Send + 'static> Unpin for DataStream<T> {}

impl<T: Send + 'static> DataStream<T> {
    /// State after the consumer-side end of the stream.
    fn closing(&self) -> State<T> {
        match self.inner.begin_termination(Some(self.generation)) {
            Some((generation, hook)) => State::Closing(self.inner.termination(generation, hook)),
            None => State::Done,
        }
    }
}

impl<T: Send + 'static> Stream for DataStream<T> {
    type Item = JobResult<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            match std::mem::replace(&mut this.state, State::Done) {
                State::Rejected => {
                    return Poll::Ready(Some(Err(ExecutorError::OperationInProgress)));
                }
                State::Pending { on_start, rx } => {
                    // Termination began before the first poll: drain what was sent, skip the start hook.
                    this.state = if this.inner.is_starting(this.generation) {
                        State::Starting { fut: on_start(), rx }
                    } else {
                        State::Active { rx }
                    };
                }
                State::Starting { mut fut, rx } => match fut.poll_unpin(cx) {
                    Poll::Pending => {
                        this.state = State::Starting { fut, rx };
                        return Poll::Pending;
                    }
                    Poll::Ready(Ok(())) => {
                        this.inner.mark_active(this.generation);
                        this.state = State::Active { rx };
                    }
                    Poll::Ready(Err(e)) => {
                        this.inner.start_failed(this.generation, &e);
                        return Poll::Ready(Some(Err(e)));
                    }
                },
                State::Active { mut rx } => match rx.poll_recv(cx) {
                    Poll::Pending => {
                        this.state = State::Active { rx };
                        return Poll::Pending;
                    }
                    Poll::Ready(Some(Ok(value))) => {
                        this.state = State::Active { rx };
                        return Poll::Ready(Some(Ok(value)));
                    }
                    Poll::Ready(Some(Err(e))) => {
                        this.state = this.closing();
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Ready(None) => {
                        this.state = this.closing();
                    }
                },
                State::Closing(mut fut) => match fut.poll_unpin(cx) {
                    Poll::Pending => {
                        this.state = State::Closing(fut);
                        return Poll::Pending;
                    }
                    Poll::Ready(()) => return Poll::Ready(None),
                },
                State::Done => return Poll::Ready(None),
            }
        }
    }
}

impl<T: Send + 'static> Drop for DataStream<T> {
    fn drop(&mut self) {
        let fut = match std::mem::replace(&mut self.state, State::Done) {
            State::Rejected | State::Done => return,
            State::Closing(fut) => fut,
            State::Pending { .. } | State::Starting { .. } | State::Active { .. } => {
                match self.inner.begin_termination(Some(self.generation)) {
                    Some((generation, hook)) => self.inner.termination(generation, hook),
                    None => return,
                }
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                rt.spawn(fut);
            }
            // No runtime left to run the hook on; free the slot regardless.
            Err(_) => self.inner.release(self.generation),
        }
    }
}
