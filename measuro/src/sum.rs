use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use quanta::{Clock, Instant};
use tracing::trace;

use crate::hook::Hooks;
use crate::{Descriptor, DerivedMetric, Metadata, MetricKind, Number, NumericSource, Value};

/// The total of a set of metrics sharing the same native type.
///
/// A sum of unsigned metrics is an unsigned total, a sum of rates is a float total and so on: the
/// type parameter rules out mixing targets of different types.  The total is cached and only
/// recomputed by [`calculate`](SumMetric::calculate).
pub struct SumMetric<D: NumericSource> {
    metadata: Metadata,
    targets: RwLock<Vec<Arc<D>>>,
    total: <D::Native as Number>::Atomic,
    hooks: Hooks<SumMetric<D>>,
}

impl<D: NumericSource> SumMetric<D> {
    /// Creates a standalone sum over `targets`.
    pub fn new<N: Into<Descriptor>>(descriptor: N, targets: Vec<Arc<D>>) -> Self {
        Self::with_clock(descriptor, targets, Clock::new())
    }

    /// Creates a standalone sum over `targets` that reads time from `clock`.
    pub fn with_clock<N: Into<Descriptor>>(
        descriptor: N,
        targets: Vec<Arc<D>>,
        clock: Clock,
    ) -> Self {
        let metadata = descriptor.into().into_metadata(MetricKind::Sum, Duration::ZERO);
        Self::from_parts(metadata, targets, clock)
    }

    pub(crate) fn from_parts(metadata: Metadata, targets: Vec<Arc<D>>, clock: Clock) -> Self {
        SumMetric {
            metadata,
            targets: RwLock::new(targets),
            total: D::Native::new_atomic(D::Native::ZERO),
            hooks: Hooks::new(clock),
        }
    }

    /// Gets the metadata of this metric.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Gets the name of this metric.
    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    /// Adds a metric to the set being totalled.
    pub fn add_target(&self, target: Arc<D>) {
        self.targets.write().push(target);
    }

    /// Gets the number of metrics being totalled.
    pub fn target_count(&self) -> usize {
        self.targets.read().len()
    }

    /// Gets the total cached by the last calculation.
    pub fn get(&self) -> D::Native {
        D::Native::load(&self.total)
    }

    /// Recomputes the total from the current value of every target.
    pub fn calculate(&self) -> D::Native {
        let total = self
            .targets
            .read()
            .iter()
            .fold(D::Native::ZERO, |acc, target| acc.wrapping_add(target.sample()));

        trace!(metric = self.metadata.name(), ?total, "recalculated sum");
        self.hooks.update(self, &self.metadata, || D::Native::store(&self.total, total));
        total
    }

    /// Registers a hook to be notified when this sum is recalculated.
    pub fn register_hook<F>(&self, hook: F)
    where
        F: Fn(&SumMetric<D>, Instant) + Send + Sync + 'static,
    {
        self.hooks.register(Box::new(hook));
    }

    /// Gets the number of registered hooks.
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }
}

impl<D: NumericSource> NumericSource for SumMetric<D> {
    type Native = D::Native;

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn sample(&self) -> D::Native {
        self.calculate()
    }
}

impl<D: NumericSource> DerivedMetric for SumMetric<D> {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn calculate(&self) {
        SumMetric::calculate(self);
    }

    fn value(&self) -> Value {
        self.get().into_value()
    }
}

impl<D: NumericSource> fmt::Display for SumMetric<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.get().fmt_value(f)
    }
}

impl<D: NumericSource> fmt::Debug for SumMetric<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SumMetric")
            .field("metadata", &self.metadata)
            .field("targets", &self.target_count())
            .field("total", &self.get())
            .finish()
    }
}
