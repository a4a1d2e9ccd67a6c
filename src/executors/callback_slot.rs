//! # Exclusive callback ownership.
//!
//! Many callback-style platform APIs accept exactly one delegate. A
//! [`CallbackSlot`] makes that ownership explicit: whoever holds the
//! [`SlotGuard`] receives the callbacks, and a second claimant is refused
//! with [`ExecutorError::SlotOccupied`] instead of silently replacing the first.
//!
//! ```text
//! claim(a) ──► Ok(guard_a)          current() == Some(a)
//! claim(b) ──► Err(SlotOccupied)    SlotConflict event
//! drop(guard_a)                     current() == None
//! claim(b) ──► Ok(guard_b)
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::ExecutorError;
use crate::events::{Emitter, Event, EventKind};

type Holder<T> = Option<(u64, Arc<T>)>;

struct SlotInner<T> {
    holder: Mutex<Holder<T>>,
    tokens: AtomicU64,
    emitter: Emitter,
}

impl<T> SlotInner<T> {
    fn lock(&self) -> MutexGuard<'_, Holder<T>> {
        self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Single-owner registration point for an external callback.
pub struct CallbackSlot<T> {
    inner: Arc<SlotInner<T>>,
}

impl<T> Clone for CallbackSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + Send + Sync + 'static> Default for CallbackSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug + Send + Sync + 'static> CallbackSlot<T> {
    /// Creates an empty slot that publishes no events.
    pub fn new() -> Self {
        Self::with_emitter(Emitter::detached("callback-slot"))
    }

    pub(crate) fn with_emitter(emitter: Emitter) -> Self {
        Self {
            inner: Arc::new(SlotInner {
                holder: Mutex::new(None),
                tokens: AtomicU64::new(1),
                emitter,
            }),
        }
    }

    /// Takes ownership of the slot for `owner`.
    ///
    /// Fails with [`ExecutorError::SlotOccupied`] while another guard is alive.
    pub fn claim(&self, owner: T) -> Result<SlotGuard<T>, ExecutorError> {
        let mut holder = self.inner.lock();
        let occupied = holder.as_ref().map(|(_, current)| format!("{current:?}"));
        if let Some(owner) = occupied {
            drop(holder);
            self.inner
                .emitter
                .emit(Event::new(EventKind::SlotConflict).with_reason(owner.clone()));
            return Err(ExecutorError::SlotOccupied { owner });
        }

        let token = self.inner.tokens.fetch_add(1, AtomicOrdering::Relaxed);
        let owner = Arc::new(owner);
        *holder = Some((token, Arc::clone(&owner)));
        Ok(SlotGuard {
            inner: Arc::clone(&self.inner),
            token,
            owner,
        })
    }

    /// Current holder, if any.
    pub fn current(&self) -> Option<Arc<T>> {
        self.inner.lock().as_ref().map(|(_, owner)| Arc::clone(owner))
    }

    /// Debug description of the current holder.
    pub fn owner(&self) -> Option<String> {
        self.inner
            .lock()
            .as_ref()
            .map(|(_, owner)| format!("{owner:?}"))
    }

    /// True while a guard is alive.
    pub fn is_claimed(&self) -> bool {
        self.inner.lock().is_some()
    }
}

/// Proof of slot ownership; releases the slot on drop.
#[must_use = "dropping the guard releases the slot"]
pub struct SlotGuard<T> {
    inner: Arc<SlotInner<T>>,
    token: u64,
    owner: Arc<T>,
}

impl<T> SlotGuard<T> {
    /// The owner this guard was claimed for.
    pub fn owner(&self) -> &T {
        &self.owner
    }
}

impl<T: fmt::Debug> fmt::Debug for SlotGuard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotGuard")
            .field("owner", &self.owner)
            .finish()
    }
}

impl<T> Drop for SlotGuard<T> {
    fn drop(&mut self) {
        let mut holder = self.inner.lock();
        if holder.as_ref().is_some_and(|(token, _)| *token == self.token) {
            *holder = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Bus;

    #[derive(Debug, PartialEq)]
    struct Owner(&'static str);

    #[test]
    fn test_second_claim_is_refused() {
        let slot = CallbackSlot::new();
        let guard = slot.claim(Owner("scanner")).unwrap();
        assert_eq!(guard.owner(), &Owner("scanner"));

        match slot.claim(Owner("pairing")) {
            Err(ExecutorError::SlotOccupied { owner }) => assert_eq!(owner, "Owner(\"scanner\")"),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(slot.current().as_deref(), Some(&Owner("scanner")));
    }

    #[test]
    fn test_drop_releases_slot() {
        let slot = CallbackSlot::new();
        let guard = slot.claim(Owner("scanner")).unwrap();
        assert!(slot.is_claimed());
        drop(guard);
        assert!(!slot.is_claimed());
        assert!(slot.owner().is_none());

        let _next = slot.claim(Owner("pairing")).unwrap();
        assert_eq!(slot.owner().as_deref(), Some("Owner(\"pairing\")"));
    }

    #[tokio::test]
    async fn test_conflict_is_published() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let slot = CallbackSlot::with_emitter(Emitter::new(bus, "delegate"));

        let _guard = slot.claim(Owner("scanner")).unwrap();
        assert!(slot.claim(Owner("pairing")).is_err());

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SlotConflict);
        assert_eq!(ev.scope.as_deref(), Some("delegate"));
        assert_eq!(ev.reason.as_deref(), Some("Owner(\"scanner\")"));
    }
}
