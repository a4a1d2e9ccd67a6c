use std::sync::Arc;

use super::{Bus, Event};

/// Publishing handle owned by one executor, registry or bridge.
///
/// Stamps every event with the owner's label. A detached emitter (no bus)
/// discards events; this is what components built outside a hub use.
#[derive(Clone, Debug)]
pub struct Emitter {
    bus: Option<Bus>,
    scope: Arc<str>,
}

impl Emitter {
    /// Emitter publishing into `bus` under `scope`.
    pub fn new(bus: Bus, scope: impl Into<Arc<str>>) -> Self {
        Self {
            bus: Some(bus),
            scope: scope.into(),
        }
    }

    /// Emitter that discards everything.
    pub fn detached(scope: impl Into<Arc<str>>) -> Self {
        Self {
            bus: None,
            scope: scope.into(),
        }
    }

    /// Label stamped on published events.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Publishes `ev` with this emitter's scope.
    pub fn emit(&self, ev: Event) {
        if let Some(bus) = &self.bus {
            bus.publish(ev.with_scope(Arc::clone(&self.scope)));
        }
    }
}
