//! # Hub: shared event bus and executor factory.
//!
//! The [`Hub`] owns the event [`Bus`], forwards every event to a
//! [`SubscriberSet`], and hands out executors wired to that bus.
//!
//! ## Architecture
//! ```text
//! Hub::builder(cfg).with_subscribers(subs).build()
//!     │
//!     ├─► Bus (broadcast, capacity = cfg.bus_capacity)
//!     ├─► SubscriberSet (one worker per subscriber)
//!     └─► listener: Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!
//! hub.serial("gatt")           ─► SerialExecutor   ─┐
//! hub.registry("connections")  ─► ExecutorRegistry ─┤ Emitter(bus, label)
//! hub.data_stream("scan")      ─► DataStreamBridge ─┤
//! hub.callback_slot("delegate") ─► CallbackSlot    ─┘
//!
//! Shutdown path:
//!   hub.shutdown()
//!     └─► token.cancel() ─► listener drains buffered events
//!                         ─► SubscriberSet::shutdown() (workers drain their queues)
//! ```
//!
//! Executors outlive the hub safely: once the listener stops their events are
//! simply not delivered.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{Config, HubBuilder};
use crate::events::{Bus, Emitter, Event};
use crate::executors::{CallbackSlot, DataStreamBridge, ExecutorRegistry, SerialExecutor};
use crate::subscribers::SubscriberSet;

/// Owner of the event pipeline and factory for bus-connected executors.
pub struct Hub {
    cfg: Config,
    bus: Bus,
    token: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Hub {
    /// Returns a builder for constructing a hub.
    pub fn builder(cfg: Config) -> HubBuilder {
        HubBuilder::new(cfg)
    }

    pub(super) fn new_internal(
        cfg: Config,
        bus: Bus,
        token: CancellationToken,
        listener: JoinHandle<()>,
    ) -> Self {
        Self {
            cfg,
            bus,
            token,
            listener: Mutex::new(Some(listener)),
        }
    }

    /// Configuration the hub was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// The event bus (subscribe directly for ad-hoc inspection).
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Emitter publishing into this hub under `label`.
    pub fn emitter(&self, label: impl Into<Arc<str>>) -> Emitter {
        Emitter::new(self.bus.clone(), label)
    }

    /// Creates a serial executor publishing under `label`.
    pub fn serial<V: Send + 'static>(&self, label: impl Into<Arc<str>>) -> SerialExecutor<V> {
        SerialExecutor::with_emitter(self.emitter(label), self.cfg.cancel_on_drop)
    }

    /// Creates a keyed registry publishing under `label`.
    pub fn registry<K, V>(&self, label: impl Into<Arc<str>>) -> ExecutorRegistry<K, V>
    where
        K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
        V: Send + 'static,
    {
        ExecutorRegistry::with_emitter(self.emitter(label), self.cfg.cancel_on_drop)
    }

    /// Creates a data stream bridge publishing under `label`.
    pub fn data_stream<T: Send + 'static>(
        &self,
        label: impl Into<Arc<str>>,
    ) -> DataStreamBridge<T> {
        DataStreamBridge::with_emitter(self.emitter(label))
    }

    /// Creates a callback slot publishing under `label`.
    pub fn callback_slot<T>(&self, label: impl Into<Arc<str>>) -> CallbackSlot<T>
    where
        T: Debug + Send + Sync + 'static,
    {
        CallbackSlot::with_emitter(self.emitter(label))
    }

    /// Stops the listener and waits until every subscriber drained its queue.
    ///
    /// Events already on the bus are still delivered. Idempotent.
    pub async fn shutdown(&self) {
        self.token.cancel();
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            let _ = listener.await;
        }
    }

    /// Forwards bus events to the subscriber set until cancelled.
    pub(super) async fn listen(
        mut rx: broadcast::Receiver<Event>,
        set: SubscriberSet,
        token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(_)) => {
                        set.emit(&Event::subscriber_overflow("hub", "lagged"));
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        loop {
            match rx.try_recv() {
                Ok(ev) => set.emit(&ev),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        set.shutdown().await;
    }
}

impl Drop for Hub {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
