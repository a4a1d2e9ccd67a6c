//! # callbridge
//!
//! **Callbridge** turns callback-driven APIs into async request/response calls.
//!
//! Many platform SDKs (Bluetooth stacks, device drivers, vendor radios) report
//! results through delegate callbacks instead of returning them. Callbridge
//! pairs each request with the callback that answers it by running at most one
//! request per logical resource at a time: the callback always belongs to the
//! job currently executing.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   caller A        caller B        caller C
//!      │ submit        │ submit        │ submit(key, trigger)
//!      ▼               ▼               ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  SerialExecutor / ExecutorRegistry                                │
//! │  - FIFO queue per resource                                        │
//! │  - one executing job per resource (its trigger already ran)       │
//! │  - idle registry entries are removed                              │
//! └──────┬──────────────────────────────────────────────▲─────────────┘
//!        │ trigger(): start external operation          │ complete(key, result)
//!        ▼                                              │ broadcast(key, result)
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  external callback API (device, radio, SDK delegate)              │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        │ value callbacks
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  DataStreamBridge ──► DataStream (lazy on_start, on_termination)  │
//! └───────────────────────────────────────────────────────────────────┘
//!
//! every component ── Event ──► Bus ──► hub listener ──► SubscriberSet
//!                                                      ┌─────┼─────┐
//!                                                      ▼     ▼     ▼
//!                                                  LogWriter ... custom
//! ```
//!
//! ### Job lifecycle
//! ```text
//! submit ──► queued ──► executing (trigger ran) ──► resolved
//!               │              │
//!               │              ├─ complete(result)  ─► result
//!               │              ├─ broadcast(result) ─► result (every job)
//!               │              ├─ cancel(id)        ─► JobCancelled
//!               │              └─ executor dropped  ─► ExecutorDestroyed
//!               └─ cancel(id) ─► skipped when reached ─► JobCancelled
//! ```
//!
//! ## Features
//! | Area                | Description                                                   | Key types / traits                          |
//! |---------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Serial executor** | One job at a time for one resource.                           | [`SerialExecutor`], [`JobHandle`]           |
//! | **Registry**        | Per-key executors created and collected on demand.            | [`ExecutorRegistry`]                        |
//! | **Streams**         | Callback-produced values as a lazily started `Stream`.        | [`DataStreamBridge`], [`DataStream`]        |
//! | **Delegates**       | Exclusive ownership of a single callback registration.        | [`CallbackSlot`], [`SlotGuard`]             |
//! | **Subscriber API**  | Observe job lifecycle, stray callbacks and stream lifecycle.  | [`Subscribe`], [`Event`]                    |
//! | **Errors**          | Typed errors delivered to waiting callers.                    | [`ExecutorError`], [`JobResult`]            |
//! | **Configuration**   | Hub-wide settings.                                            | [`Config`], [`Hub`]                         |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use callbridge::{Config, Hub};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), callbridge::ExecutorError> {
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn callbridge::Subscribe>> = vec![Arc::new(callbridge::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn callbridge::Subscribe>> = Vec::new();
//!
//!     let hub = Hub::builder(Config::default()).with_subscribers(subs).build();
//!     let connections = hub.registry::<String, u32>("connections");
//!
//!     // Start the external operation; the callback answers later.
//!     let handle = connections.enqueue("dev-1".to_string(), || { /* radio.connect() */ }).await;
//!
//!     // ... inside the SDK callback:
//!     connections.complete("dev-1", Ok(7)).await?;
//!
//!     assert_eq!(handle.await?, 7);
//!     hub.shutdown().await;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod executors;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{Config, Hub, HubBuilder};
pub use error::{ExecutorError, JobResult};
pub use events::{Bus, Emitter, Event, EventKind};
pub use executors::{
    CallbackSlot, CancelOutcome, DataStream, DataStreamBridge, ExecutorRegistry, JobHandle, JobId,
    SerialExecutor, SlotGuard, StreamPhase, Trigger,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
