use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::hub::Hub;
use crate::{
    core::Config,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Hub`].
pub struct HubBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl HubBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive executor events (job lifecycle, stray callbacks,
    /// stream lifecycle) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the hub and starts its listener.
    ///
    /// Must be called inside a tokio runtime: the listener and one worker per
    /// subscriber are spawned here.
    pub fn build(self) -> Arc<Hub> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let set = SubscriberSet::new(self.subscribers, bus.clone());
        let token = CancellationToken::new();

        let listener = tokio::spawn(Hub::listen(bus.subscribe(), set, token.clone()));
        Arc::new(Hub::new_internal(self.cfg, bus, token, listener))
    }
}
