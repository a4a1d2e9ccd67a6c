//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! built-in implementations for handling events published on the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   SerialExecutor / ExecutorRegistry / DataStreamBridge / CallbackSlot
//!         │
//!         └── emit(Event) ──► Bus ──► hub listener ──► SubscriberSet::emit(&Event)
//!                                                           │
//!                                               ┌───────────┼───────────┐
//!                                               ▼           ▼           ▼
//!                                           LogWriter    Metrics     Custom
//! ```
//!
//! Subscribers are passive: they observe stray callbacks, queue activity and
//! stream lifecycle, but never influence job resolution.

#[cfg(feature = "logging")]
mod embedded;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
