use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use quanta::{Clock, Instant};

use crate::hook::Hooks;
use crate::{Descriptor, Metadata, MetricKind};

/// A metric holding a string.
///
/// Strings cannot be swapped atomically, so the value is guarded by its own mutex.  The lock is
/// only held while the value is copied in or out and is released before hooks run.
pub struct StringMetric {
    metadata: Metadata,
    value: Mutex<String>,
    hooks: Hooks<StringMetric>,
}

impl StringMetric {
    /// Creates a standalone metric with the given initial value.
    pub fn new<D, S>(descriptor: D, initial: S) -> Self
    where
        D: Into<Descriptor>,
        S: Into<String>,
    {
        Self::with_clock(descriptor, initial, Clock::new())
    }

    /// Creates a standalone metric that reads time from `clock`.
    pub fn with_clock<D, S>(descriptor: D, initial: S, clock: Clock) -> Self
    where
        D: Into<Descriptor>,
        S: Into<String>,
    {
        let metadata = descriptor.into().into_metadata(MetricKind::String, Duration::ZERO);
        Self::from_parts(metadata, initial.into(), clock)
    }

    pub(crate) fn from_parts(metadata: Metadata, initial: String, clock: Clock) -> Self {
        StringMetric { metadata, value: Mutex::new(initial), hooks: Hooks::new(clock) }
    }

    /// Gets the metadata of this metric.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Gets the name of this metric.
    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    /// Gets a copy of the current value.
    pub fn get(&self) -> String {
        self.value.lock().clone()
    }

    /// Sets the value.
    pub fn set<S: Into<String>>(&self, value: S) {
        let value = value.into();
        self.hooks.update(self, &self.metadata, || {
            *self.value.lock() = value;
        });
    }

    /// Registers a hook to be notified when this metric changes.
    pub fn register_hook<F>(&self, hook: F)
    where
        F: Fn(&StringMetric, Instant) + Send + Sync + 'static,
    {
        self.hooks.register(Box::new(hook));
    }

    /// Gets the number of registered hooks.
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }
}

impl fmt::Display for StringMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value.lock())
    }
}

impl fmt::Debug for StringMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringMetric")
            .field("metadata", &self.metadata)
            .field("value", &*self.value.lock())
            .finish()
    }
}
