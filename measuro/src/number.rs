use std::fmt;
use std::time::Duration;

use quanta::{Clock, Instant};

use crate::hook::Hooks;
use crate::{Descriptor, Metadata, Number, NumericSource};

/// A numeric value cell.
///
/// The value lives in a lock-free atomic slot.  Every mutation goes through the update protocol:
/// the value is changed first, then the metric's hooks are notified if the hook rate limit allows
/// it.
///
/// Mutating operations mirror the pre/post increment distinction: [`increment`] returns the new
/// value, while [`fetch_increment`] returns the value it replaced.
///
/// [`increment`]: NumberMetric::increment
/// [`fetch_increment`]: NumberMetric::fetch_increment
pub struct NumberMetric<T: Number> {
    metadata: Metadata,
    value: T::Atomic,
    hooks: Hooks<NumberMetric<T>>,
}

/// A metric holding an unsigned integer.
pub type UnsignedMetric = NumberMetric<u64>;

/// A metric holding a signed integer.
pub type SignedMetric = NumberMetric<i64>;

/// A metric holding a floating point number.
pub type FloatMetric = NumberMetric<f64>;

impl<T: Number> NumberMetric<T> {
    /// Creates a standalone metric with the given initial value.
    ///
    /// Standalone metrics read the system clock and notify their hooks on every update unless the
    /// descriptor sets a hook rate limit.
    pub fn new<D: Into<Descriptor>>(descriptor: D, initial: T) -> Self {
        Self::with_clock(descriptor, initial, Clock::new())
    }

    /// Creates a standalone metric that reads time from `clock`.
    pub fn with_clock<D: Into<Descriptor>>(descriptor: D, initial: T, clock: Clock) -> Self {
        let metadata = descriptor.into().into_metadata(T::KIND, Duration::ZERO);
        Self::from_parts(metadata, initial, clock)
    }

    pub(crate) fn from_parts(metadata: Metadata, initial: T, clock: Clock) -> Self {
        NumberMetric { metadata, value: T::new_atomic(initial), hooks: Hooks::new(clock) }
    }

    /// Gets the metadata of this metric.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Gets the name of this metric.
    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    /// Gets the unit of this metric.
    pub fn unit(&self) -> &str {
        self.metadata.unit()
    }

    /// Gets the description of this metric.
    pub fn description(&self) -> &str {
        self.metadata.description()
    }

    /// Gets the current value.
    pub fn get(&self) -> T {
        T::load(&self.value)
    }

    /// Sets the value.
    pub fn set(&self, value: T) {
        self.hooks.update(self, &self.metadata, || T::store(&self.value, value));
    }

    /// Increments the value by one, returning the new value.
    pub fn increment(&self) -> T {
        self.add(T::ONE)
    }

    /// Increments the value by one, returning the previous value.
    pub fn fetch_increment(&self) -> T {
        self.hooks.update(self, &self.metadata, || T::fetch_add(&self.value, T::ONE))
    }

    /// Decrements the value by one, returning the new value.
    pub fn decrement(&self) -> T {
        self.subtract(T::ONE)
    }

    /// Decrements the value by one, returning the previous value.
    pub fn fetch_decrement(&self) -> T {
        self.hooks.update(self, &self.metadata, || T::fetch_sub(&self.value, T::ONE))
    }

    /// Adds `delta` to the value, returning the new value.
    pub fn add(&self, delta: T) -> T {
        self.hooks.update(self, &self.metadata, || T::fetch_add(&self.value, delta).wrapping_add(delta))
    }

    /// Subtracts `delta` from the value, returning the new value.
    pub fn subtract(&self, delta: T) -> T {
        self.hooks.update(self, &self.metadata, || T::fetch_sub(&self.value, delta).wrapping_sub(delta))
    }

    /// Registers a hook to be notified when this metric changes.
    pub fn register_hook<F>(&self, hook: F)
    where
        F: Fn(&NumberMetric<T>, Instant) + Send + Sync + 'static,
    {
        self.hooks.register(Box::new(hook));
    }

    /// Gets the number of registered hooks.
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }
}

impl<T: Number> NumericSource for NumberMetric<T> {
    type Native = T;

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn sample(&self) -> T {
        self.get()
    }
}

impl<T: Number> fmt::Display for NumberMetric<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.get().fmt_value(f)
    }
}

impl<T: Number> fmt::Debug for NumberMetric<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumberMetric")
            .field("metadata", &self.metadata)
            .field("value", &self.get())
            .field("hooks", &self.hooks)
            .finish()
    }
}
