//! # Diagnostic events emitted by executors, registries and stream bridges.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Job events**: a single job moving through an executor (queued, started, resolved, cancelled)
//! - **Executor events**: registry entries appearing/disappearing, broadcasts and teardown
//! - **Anomalies**: external events with no matching request, panicking triggers
//! - **Stream events**: the data stream bridge state machine
//!
//! The [`Event`] struct carries additional metadata such as the emitting
//! component (`scope`), the registry key, the job id and a reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use callbridge::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::UnmatchedCompletion)
//!     .with_scope("connections")
//!     .with_key("peripheral-7")
//!     .with_reason("no_job_to_execute");
//!
//! assert_eq!(ev.kind, EventKind::UnmatchedCompletion);
//! assert_eq!(ev.scope.as_deref(), Some("connections"));
//! assert_eq!(ev.key.as_deref(), Some("peripheral-7"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::executors::JobId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `scope`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `scope`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Job lifecycle ===
    /// Job appended to an executor queue.
    ///
    /// Sets: `scope`, `key` (registry only), `job`
    JobQueued,

    /// Job moved into the execution slot and its trigger ran.
    ///
    /// Sets: `scope`, `key` (registry only), `job`
    JobStarted,

    /// Job resolved by `complete`.
    ///
    /// Sets: `scope`, `key` (registry only), `job`, `reason` (error label on failure)
    JobResolved,

    /// Job resolved with `JobCancelled` (while executing or when skipped in the queue).
    ///
    /// Sets: `scope`, `key` (registry only), `job`
    JobCancelled,

    /// One result was delivered to every executing and queued job.
    ///
    /// Sets: `scope`, `key` (registry only), `reason` (number of resolved jobs)
    Broadcast,

    // === Executor lifecycle ===
    /// Registry created an executor for a key.
    ///
    /// Sets: `scope`, `key`
    ExecutorCreated,

    /// Registry dropped an idle executor.
    ///
    /// Sets: `scope`, `key`
    ExecutorRemoved,

    /// Executor torn down with pending work; every waiter got `ExecutorDestroyed`.
    ///
    /// Sets: `scope`, `key` (registry only), `reason` (number of resolved jobs)
    ExecutorDestroyed,

    // === Anomalies ===
    /// External completion arrived with no executing job.
    ///
    /// Sets: `scope`, `key` (registry only), `reason`
    UnmatchedCompletion,

    /// Registry completion/broadcast referenced a key without an executor.
    ///
    /// Sets: `scope`, `key`
    ExecutorNotFound,

    /// A trigger panicked; its job was resolved with an external error.
    ///
    /// Sets: `scope`, `key` (registry only), `job`, `reason` (panic message)
    TriggerPanicked,

    // === Data streams ===
    /// `on_start` succeeded and the stream is active.
    StreamStarted,

    /// `create` was called while a stream was active.
    StreamRejected,

    /// `on_start` failed; the stream ended with its error.
    ///
    /// Sets: `scope`, `reason`
    StreamStartFailed,

    /// `on_termination` ran and the bridge is idle again.
    StreamTerminated,

    /// `on_termination` failed; the bridge was released anyway.
    ///
    /// Sets: `scope`, `reason`
    StreamTerminationFailed,

    /// A value or error was pushed while no stream was active.
    StreamValueDropped,

    // === Callback slots ===
    /// A second owner tried to claim an occupied callback slot.
    ///
    /// Sets: `scope`, `reason` (current owner)
    SlotConflict,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Label of the emitting executor, registry, bridge or subscriber.
    pub scope: Option<Arc<str>>,
    /// Registry key (debug-formatted), if applicable.
    pub key: Option<Arc<str>>,
    /// Job the event refers to.
    pub job: Option<JobId>,
    /// Human-readable reason (errors, counts, overflow details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            scope: None,
            key: None,
            job: None,
            reason: None,
        }
    }

    /// Attaches the emitting component label.
    #[inline]
    pub fn with_scope(mut self, scope: impl Into<Arc<str>>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Attaches a registry key.
    #[inline]
    pub fn with_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attaches a job id.
    #[inline]
    pub fn with_job(mut self, job: JobId) -> Self {
        self.job = Some(job);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_scope(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_scope(subscriber)
            .with_reason(info)
    }

    /// Returns `true` for events describing a stray or misbehaving external source.
    #[inline]
    pub fn is_anomaly(&self) -> bool {
        matches!(
            self.kind,
            EventKind::UnmatchedCompletion
                | EventKind::ExecutorNotFound
                | EventKind::TriggerPanicked
                | EventKind::StreamValueDropped
                | EventKind::SlotConflict
        )
    }
}
