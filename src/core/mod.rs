//! Hub core: configuration, construction and the event listener.
//!
//! The public API from this module is [`Hub`] (built via [`HubBuilder`]) and
//! its [`Config`].
//!
//! Internal modules:
//! - [`hub`]: executor factories, bus listener, graceful shutdown;
//! - [`builder`]: wires bus, subscriber set and listener together;
//! - [`config`]: hub-wide settings.

mod builder;
mod config;
mod hub;

pub use builder::HubBuilder;
pub use config::Config;
pub use hub::Hub;
