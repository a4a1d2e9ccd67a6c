//! # Keyed executor registry - per-key serialization with garbage collection.
//!
//! [`ExecutorRegistry`] multiplexes many logical resources: jobs for the same
//! key run strictly one at a time in FIFO order, jobs for different keys never
//! wait on each other.
//!
//! ## Architecture
//! ```text
//! submit(key, trigger) ──► Mutex<HashMap<K, ExecutorState<V>>>
//!                             ├─► "peripheral-1" → [current: J1] [queue: J4]
//!                             ├─► "peripheral-2" → [current: J2]
//!                             └─► "peripheral-3" → [current: J3] [queue: J5, J6]
//!
//! complete(key, result) ──► resolve current ──► advance ──► idle? remove key
//! ```
//!
//! ## Rules
//! - An entry exists iff its executor has work (executing or queued).
//! - Entries are created on the first submission for a key and removed in the
//!   same critical section as the completion/cancellation that drains them, so
//!   a concurrent submission for that key can never be lost.
//! - A completion for an unknown key fails with `ExecutorNotFound` and is
//!   published as an `ExecutorNotFound` event.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{ExecutorError, JobResult};
use crate::events::{Emitter, Event, EventKind};

use super::job::{Cancel, Job, JobHandle, JobId};
use super::state::{CancelOutcome, ExecutorState};

struct RegistryInner<K, V> {
    executors: Mutex<HashMap<K, ExecutorState<V>>>,
    emitter: Emitter,
    cancel_on_drop: bool,
}

impl<K, V> RegistryInner<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Send + 'static,
{
    /// Removes the entry for `key` if it has no work left.
    fn release_if_idle<Q>(&self, executors: &mut HashMap<K, ExecutorState<V>>, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Debug + ?Sized,
    {
        if executors.get(key).is_some_and(|state| !state.has_work()) {
            executors.remove(key);
            self.emitter
                .emit(Event::new(EventKind::ExecutorRemoved).with_key(format!("{key:?}")));
        }
    }

    async fn cancel<Q>(&self, key: &Q, id: JobId) -> CancelOutcome
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Debug + ?Sized,
    {
        let mut executors = self.executors.lock().await;
        let Some(state) = executors.get_mut(key) else {
            return CancelOutcome::Unknown;
        };
        let outcome = state.cancel(id);
        self.release_if_idle(&mut executors, key);
        outcome
    }

    fn not_found<Q: Debug + ?Sized>(&self, key: &Q) -> ExecutorError {
        self.emitter
            .emit(Event::new(EventKind::ExecutorNotFound).with_key(format!("{key:?}")));
        ExecutorError::ExecutorNotFound
    }
}

/// Lazily-populated, self-cleaning map from key to serial executor.
///
/// Cheap to clone; clones share the same table.
///
/// ## Example
/// ```rust
/// use callbridge::ExecutorRegistry;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let connections: ExecutorRegistry<String, ()> = ExecutorRegistry::new();
///
/// let handle = connections.enqueue("k".to_string(), || { /* connect */ }).await;
/// assert!(connections.has_pending("k").await);
///
/// connections.complete("k", Ok(())).await.unwrap();
/// handle.await.unwrap();
///
/// assert!(!connections.has_pending("k").await);
/// assert!(connections.complete("k", Ok(())).await.is_err());
/// # }
/// ```
pub struct ExecutorRegistry<K, V> {
    inner: Arc<RegistryInner<K, V>>,
}

impl<K, V> Clone for ExecutorRegistry<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for ExecutorRegistry<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ExecutorRegistry<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Send + 'static,
{
    /// Creates a standalone registry (events are discarded).
    pub fn new() -> Self {
        Self::with_emitter(Emitter::detached("registry"), true)
    }

    pub(crate) fn with_emitter(emitter: Emitter, cancel_on_drop: bool) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                executors: Mutex::new(HashMap::new()),
                emitter,
                cancel_on_drop,
            }),
        }
    }

    /// Queues `trigger` on the executor for `key`, creating it if needed.
    pub async fn enqueue<F>(&self, key: K, trigger: F) -> JobHandle<V>
    where
        F: FnOnce() + Send + 'static,
    {
        let (job, rx) = Job::new(Box::new(trigger));
        let id = job.id();
        let canceller = self.inner.cancel_on_drop.then(|| {
            Arc::new(RegistryCanceller {
                inner: Arc::downgrade(&self.inner),
                key: key.clone(),
            }) as Arc<dyn Cancel>
        });

        let inner = &*self.inner;
        let mut executors = inner.executors.lock().await;
        executors
            .entry(key.clone())
            .or_insert_with_key(|key| {
                let label: Arc<str> = format!("{key:?}").into();
                inner
                    .emitter
                    .emit(Event::new(EventKind::ExecutorCreated).with_key(Arc::clone(&label)));
                ExecutorState::new(inner.emitter.clone(), Some(label))
            })
            .push(job);
        // A panicking trigger may have drained the entry already.
        inner.release_if_idle(&mut executors, &key);
        drop(executors);

        JobHandle::new(id, rx, canceller)
    }

    /// Queues `trigger` for `key` and waits for its job to be resolved.
    pub async fn submit<F>(&self, key: K, trigger: F) -> JobResult<V>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(key, trigger).await.await
    }

    /// Resolves the executing job for `key` and starts the next one.
    ///
    /// Fails with [`ExecutorError::ExecutorNotFound`] if `key` has no executor.
    pub async fn complete<Q>(&self, key: &Q, result: JobResult<V>) -> Result<(), ExecutorError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Debug + ?Sized,
    {
        let inner = &*self.inner;
        let mut executors = inner.executors.lock().await;
        let Some(state) = executors.get_mut(key) else {
            return Err(inner.not_found(key));
        };
        let outcome = state.complete(result);
        inner.release_if_idle(&mut executors, key);
        outcome.map(|_| ())
    }

    /// Resolves every executing and queued job for `key` with `result`.
    ///
    /// Returns the number of resolved jobs.
    pub async fn broadcast<Q>(&self, key: &Q, result: JobResult<V>) -> Result<usize, ExecutorError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Debug + ?Sized,
        V: Clone,
    {
        let inner = &*self.inner;
        let mut executors = inner.executors.lock().await;
        let Some(state) = executors.get_mut(key) else {
            return Err(inner.not_found(key));
        };
        let resolved = state.broadcast(result);
        inner.release_if_idle(&mut executors, key);
        Ok(resolved)
    }

    /// Resolves the work of every key with `result` and empties the registry.
    ///
    /// Returns the number of resolved jobs.
    pub async fn broadcast_all(&self, result: JobResult<V>) -> usize
    where
        V: Clone,
    {
        let inner = &*self.inner;
        let mut executors = inner.executors.lock().await;
        let mut resolved = 0;
        for (key, mut state) in executors.drain() {
            resolved += state.broadcast(result.clone());
            inner
                .emitter
                .emit(Event::new(EventKind::ExecutorRemoved).with_key(format!("{key:?}")));
        }
        resolved
    }

    /// Cancels a job for `key` by id (no-op for resolved or unknown ids).
    pub async fn cancel<Q>(&self, key: &Q, id: JobId) -> CancelOutcome
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Debug + ?Sized,
    {
        self.inner.cancel(key, id).await
    }

    /// Returns `true` iff `key` has executing or queued work.
    pub async fn has_pending<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.executors.lock().await.contains_key(key)
    }

    /// Alias of [`has_pending`](Self::has_pending).
    pub async fn has_work<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.has_pending(key).await
    }

    /// Number of executing plus queued jobs for `key`.
    pub async fn pending<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner
            .executors
            .lock()
            .await
            .get(key)
            .map_or(0, ExecutorState::pending)
    }

    /// Snapshot of keys with pending work (unordered).
    pub async fn keys(&self) -> Vec<K> {
        self.inner.executors.lock().await.keys().cloned().collect()
    }

    /// Returns `true` if no key has pending work.
    pub async fn is_empty(&self) -> bool {
        self.inner.executors.lock().await.is_empty()
    }

    /// Tears down every executor: all waiters get `ExecutorDestroyed`.
    ///
    /// Returns the number of resolved jobs.
    pub async fn shutdown(&self) -> usize {
        let inner = &*self.inner;
        let mut executors = inner.executors.lock().await;
        let mut resolved = 0;
        for (key, mut state) in executors.drain() {
            resolved += state.destroy();
            inner
                .emitter
                .emit(Event::new(EventKind::ExecutorRemoved).with_key(format!("{key:?}")));
        }
        resolved
    }
}

struct RegistryCanceller<K, V> {
    inner: Weak<RegistryInner<K, V>>,
    key: K,
}

#[async_trait]
impl<K, V> Cancel for RegistryCanceller<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Send + 'static,
{
    async fn cancel_job(&self, id: JobId) {
        if let Some(inner) = self.inner.upgrade() {
            inner.cancel(&self.key, id).await;
        }
    }
}
