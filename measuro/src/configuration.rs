use std::time::Duration;

use quanta::Clock;

use crate::Registry;

/// A configuration builder for [`Registry`].
#[derive(Clone, Debug)]
pub struct Configuration {
    pub(crate) clock: Clock,
    pub(crate) hook_rate_limit: Duration,
    pub(crate) throttle_op_limit: u64,
}

impl Default for Configuration {
    fn default() -> Configuration {
        Configuration {
            clock: Clock::new(),
            hook_rate_limit: Duration::from_millis(1000),
            throttle_op_limit: 1,
        }
    }
}

impl Configuration {
    /// Creates a new [`Configuration`] with default values.
    pub fn new() -> Configuration {
        Default::default()
    }

    /// Sets the clock.
    ///
    /// Defaults to the system clock.
    ///
    /// Every metric and throttle created by the registry reads time from this clock.  Tests can
    /// pass a mocked clock to control hook cascades, rate calculations and throttles.
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the default hook rate limit.
    ///
    /// Defaults to 1 second.
    ///
    /// Applied to every metric whose descriptor doesn't set its own limit.  This bounds how often
    /// a frequently updated metric notifies its dependents; a limit of zero notifies them on every
    /// update.
    pub fn hook_rate_limit(mut self, limit: Duration) -> Self {
        self.hook_rate_limit = limit;
        self
    }

    /// Sets the default throttle operation limit.
    ///
    /// Defaults to 1, meaning every update attempt is checked against the throttle's time limit.
    pub fn throttle_op_limit(mut self, op_limit: u64) -> Self {
        self.throttle_op_limit = op_limit;
        self
    }

    /// Create a [`Registry`] based on this configuration.
    pub fn build(self) -> Registry {
        Registry::from_config(self)
    }
}
