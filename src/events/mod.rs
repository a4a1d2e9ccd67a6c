//! Diagnostic events: types, broadcast bus and per-component emitter.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by executors, registries, stream
//! bridges and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//! - [`Emitter`] label-stamping publisher held by each component
//!
//! ## Quick reference
//! - **Publishers**: `SerialExecutor`, `ExecutorRegistry`, `DataStreamBridge`,
//!   `CallbackSlot`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the hub listener (fans out to `SubscriberSet`).

mod bus;
mod emitter;
mod event;

pub use bus::Bus;
pub use emitter::Emitter;
pub use event::{Event, EventKind};
