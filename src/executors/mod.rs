//! Executors: turning callback-driven operations into awaitable jobs.
//!
//! This module holds the request/response and streaming bridges.
//!
//! ## Contents
//! - [`SerialExecutor`] one resource, one job at a time, FIFO
//! - [`ExecutorRegistry`] one serial executor per key, created and removed on demand
//! - [`DataStreamBridge`] / [`DataStream`] callback-produced values as a lazy `Stream`
//! - [`CallbackSlot`] / [`SlotGuard`] exclusive ownership of a single delegate
//! - [`JobHandle`], [`JobId`], [`CancelOutcome`] job plumbing shared by the executors
//!
//! Internal modules:
//! - `job`: job/oneshot pairing, handle drop-cancellation;
//! - `state`: the lock-free queue + execution slot both executors wrap.

mod callback_slot;
mod job;
mod registry;
mod serial;
mod state;
mod stream;

pub(crate) use job::panic_message;

pub use callback_slot::{CallbackSlot, SlotGuard};
pub use job::{JobHandle, JobId, Trigger};
pub use registry::ExecutorRegistry;
pub use serial::SerialExecutor;
pub use state::CancelOutcome;
pub use stream::{DataStream, DataStreamBridge, StreamPhase};
