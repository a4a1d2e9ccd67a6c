//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for observing executors, registries and
//! stream bridges. Each subscriber is driven by a dedicated worker loop fed by a
//! bounded queue owned by the [`SubscriberSet`](crate::subscribers::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching); they do **not** block the
//!   executors publishing events, nor other subscribers.
//! - Each subscriber **declares** its preferred queue capacity via
//!   [`Subscribe::queue_capacity`]. If a queue overflows, events for that
//!   subscriber are **dropped** and a `SubscriberOverflow` event is published.
//!
//! ## Example
//! ```rust
//! use callbridge::{Event, EventKind, Subscribe};
//!
//! struct StrayCallbacks;
//!
//! #[async_trait::async_trait]
//! impl Subscribe for StrayCallbacks {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::UnmatchedCompletion {
//!             eprintln!("stray callback on {:?}", ev.key);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "stray-callbacks" }
//!     fn queue_capacity(&self) -> usize { 64 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// Called from a subscriber-dedicated worker task. Implementations should avoid
/// blocking the async runtime (prefer async I/O and cooperative waits).
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
