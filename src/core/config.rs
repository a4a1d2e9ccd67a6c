//! # Hub configuration.
//!
//! Provides [`Config`], the settings shared by every executor a
//! [`Hub`](crate::Hub) creates.
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1 (a broadcast channel needs room for one event)

/// Configuration for a [`Hub`](crate::Hub) and the executors it creates.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `cancel_on_drop`: Whether dropping an unresolved `JobHandle` cancels its job
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// When the hub listener lags behind more than `bus_capacity` events, the
    /// oldest ones are skipped and a `SubscriberOverflow` event is published.
    pub bus_capacity: usize,

    /// Cancel a job when its `JobHandle` is dropped before resolution.
    ///
    /// - `true`: the executing job is resolved with `JobCancelled` and the queue
    ///   advances; a queued job is skipped when it reaches the head
    /// - `false`: the job stays in place and is resolved normally (the result is
    ///   discarded)
    pub cancel_on_drop: bool,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    ///
    /// The `Bus` should use this value to avoid constructing an invalid channel.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024` (good baseline)
    /// - `cancel_on_drop = true`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            cancel_on_drop: true,
        }
    }
}
