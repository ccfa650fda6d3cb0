use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use quanta::{Clock, Instant};

use crate::hook::Hooks;
use crate::{Descriptor, Metadata, MetricKind};

const DEFAULT_TRUE_REP: &str = "TRUE";
const DEFAULT_FALSE_REP: &str = "FALSE";

/// A metric holding a boolean.
///
/// The textual form of each state can be customized, e.g. `"UP"`/`"DOWN"`, and defaults to
/// `"TRUE"`/`"FALSE"`.
pub struct BoolMetric {
    metadata: Metadata,
    value: AtomicBool,
    true_rep: String,
    false_rep: String,
    hooks: Hooks<BoolMetric>,
}

impl BoolMetric {
    /// Creates a standalone metric with the given initial value.
    pub fn new<D: Into<Descriptor>>(descriptor: D, initial: bool) -> Self {
        Self::with_clock(descriptor, initial, Clock::new())
    }

    /// Creates a standalone metric that reads time from `clock`.
    pub fn with_clock<D: Into<Descriptor>>(descriptor: D, initial: bool, clock: Clock) -> Self {
        let metadata = descriptor.into().into_metadata(MetricKind::Bool, Duration::ZERO);
        Self::from_parts(metadata, initial, clock)
    }

    pub(crate) fn from_parts(metadata: Metadata, initial: bool, clock: Clock) -> Self {
        BoolMetric {
            metadata,
            value: AtomicBool::new(initial),
            true_rep: DEFAULT_TRUE_REP.to_owned(),
            false_rep: DEFAULT_FALSE_REP.to_owned(),
            hooks: Hooks::new(clock),
        }
    }

    /// Sets the textual forms of the true and false states.
    pub fn with_representations<T, F>(mut self, true_rep: T, false_rep: F) -> Self
    where
        T: Into<String>,
        F: Into<String>,
    {
        self.true_rep = true_rep.into();
        self.false_rep = false_rep.into();
        self
    }

    /// Gets the metadata of this metric.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Gets the name of this metric.
    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    /// Gets the current value.
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    /// Whether the current value is false.
    pub fn is_false(&self) -> bool {
        !self.get()
    }

    /// Sets the value.
    pub fn set(&self, value: bool) {
        self.hooks.update(self, &self.metadata, || self.value.store(value, Ordering::Release));
    }

    /// Flips the value, returning the new value.
    pub fn toggle(&self) -> bool {
        self.hooks.update(self, &self.metadata, || !self.value.fetch_xor(true, Ordering::AcqRel))
    }

    /// Gets the textual form of the true state.
    pub fn true_representation(&self) -> &str {
        &self.true_rep
    }

    /// Gets the textual form of the false state.
    pub fn false_representation(&self) -> &str {
        &self.false_rep
    }

    /// Registers a hook to be notified when this metric changes.
    pub fn register_hook<F>(&self, hook: F)
    where
        F: Fn(&BoolMetric, Instant) + Send + Sync + 'static,
    {
        self.hooks.register(Box::new(hook));
    }

    /// Gets the number of registered hooks.
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }
}

impl fmt::Display for BoolMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.get() {
            f.write_str(&self.true_rep)
        } else {
            f.write_str(&self.false_rep)
        }
    }
}

impl fmt::Debug for BoolMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoolMetric")
            .field("metadata", &self.metadata)
            .field("value", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_representations() {
        let metric = BoolMetric::new("enabled", true);
        assert_eq!(metric.to_string(), "TRUE");
        metric.set(false);
        assert_eq!(metric.to_string(), "FALSE");
        assert!(metric.is_false());
    }

    #[test]
    fn custom_representations() {
        let metric = BoolMetric::new("link", false).with_representations("UP", "DOWN");
        assert_eq!(metric.to_string(), "DOWN");
        assert!(metric.toggle());
        assert_eq!(metric.to_string(), "UP");
        assert!(!metric.toggle());
        assert_eq!(metric.true_representation(), "UP");
        assert_eq!(metric.false_representation(), "DOWN");
    }
}
