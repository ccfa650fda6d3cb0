use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use quanta::{Clock, Instant};
use tracing::trace;

use crate::atomics::AtomicU64;
use crate::hook::Hooks;
use crate::{Descriptor, DerivedMetric, Metadata, MetricKind, Number, NumericSource, Value};

/// Minimum time between two recalculations of a rate.
pub const RATE_CALCULATION_INTERVAL: Duration = Duration::from_millis(1000);

/// A transform applied to every freshly calculated rate, e.g. a unit conversion.
pub type Proxy = Box<dyn Fn(f64) -> f64 + Send + Sync + 'static>;

struct RateState {
    last_value: f64,
    last_calculation: Instant,
}

/// The per-second rate of change of another metric.
///
/// Rates are pull-based: the source is only read when [`calculate`](RateMetric::calculate) is
/// called, and a calculation happens at most once per [`RATE_CALCULATION_INTERVAL`].  Reading the
/// rate returns the value cached by the last calculation, which is zero until the first one.
///
/// The source value and the time are recorded when the rate is created, so the first calculation
/// measures the change since creation.
///
/// The hook rate limit of a rate bounds how often its own dependents are notified; it has no
/// bearing on how often the rate itself is recalculated.
pub struct RateMetric<D: NumericSource> {
    metadata: Metadata,
    source: Arc<D>,
    proxy: Option<Proxy>,
    state: Mutex<RateState>,
    rate: AtomicU64,
    hooks: Hooks<RateMetric<D>>,
}

impl<D: NumericSource> RateMetric<D> {
    /// Creates a standalone rate of `source`.
    pub fn new<N: Into<Descriptor>>(descriptor: N, source: Arc<D>) -> Self {
        Self::with_clock(descriptor, source, Clock::new())
    }

    /// Creates a standalone rate of `source` that reads time from `clock`.
    pub fn with_clock<N: Into<Descriptor>>(descriptor: N, source: Arc<D>, clock: Clock) -> Self {
        let metadata = descriptor.into().into_metadata(MetricKind::Rate, Duration::ZERO);
        Self::from_parts(metadata, source, None, clock)
    }

    pub(crate) fn from_parts(
        metadata: Metadata,
        source: Arc<D>,
        proxy: Option<Proxy>,
        clock: Clock,
    ) -> Self {
        let state = RateState {
            last_value: source.sample().to_f64(),
            last_calculation: clock.now(),
        };

        RateMetric {
            metadata,
            source,
            proxy,
            state: Mutex::new(state),
            rate: f64::new_atomic(0.0),
            hooks: Hooks::new(clock),
        }
    }

    /// Sets a transform applied to every calculated rate.
    pub fn with_proxy<F>(mut self, proxy: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        self.proxy = Some(Box::new(proxy));
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

    /// Gets the source metric.
    pub fn source(&self) -> &Arc<D> {
        &self.source
    }

    /// Gets the rate cached by the last calculation.
    pub fn get(&self) -> f64 {
        f64::load(&self.rate)
    }

    /// Applies the configured transform to `value`, or returns it as-is if there is none.
    pub fn proxy_value(&self, value: f64) -> f64 {
        match &self.proxy {
            Some(proxy) => proxy(value),
            None => value,
        }
    }

    /// Recalculates the rate if at least [`RATE_CALCULATION_INTERVAL`] has passed since the last
    /// calculation, returning the cached rate either way.
    ///
    /// The source is read while the rate's state is locked, so hooks on the source must not
    /// calculate this rate.
    pub fn calculate(&self) -> f64 {
        let now = self.hooks.clock().now();

        let rate = {
            let mut state = self.state.lock();
            let elapsed = now.saturating_duration_since(state.last_calculation);
            if elapsed < RATE_CALCULATION_INTERVAL {
                return self.get();
            }

            let value = self.source.sample().to_f64();
            let distance = value - state.last_value;
            state.last_value = value;
            state.last_calculation = now;

            // The interval gate guarantees a non-zero elapsed time.
            self.proxy_value(distance / elapsed.as_secs_f64())
        };

        trace!(metric = self.metadata.name(), rate, "recalculated rate");
        self.hooks.update(self, &self.metadata, || f64::store(&self.rate, rate));
        rate
    }

    /// Registers a hook to be notified when this rate is recalculated.
    pub fn register_hook<F>(&self, hook: F)
    where
        F: Fn(&RateMetric<D>, Instant) + Send + Sync + 'static,
    {
        self.hooks.register(Box::new(hook));
    }

    /// Gets the number of registered hooks.
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }
}

impl<D: NumericSource> NumericSource for RateMetric<D> {
    type Native = f64;

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn sample(&self) -> f64 {
        self.calculate()
    }
}

impl<D: NumericSource> DerivedMetric for RateMetric<D> {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn calculate(&self) {
        RateMetric::calculate(self);
    }

    fn value(&self) -> Value {
        Value::Float(self.get())
    }
}

impl<D: NumericSource> fmt::Display for RateMetric<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.get().fmt_value(f)
    }
}

impl<D: NumericSource> fmt::Debug for RateMetric<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateMetric")
            .field("metadata", &self.metadata)
            .field("source", &self.source.metadata().name())
            .field("rate", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SumMetric, UnsignedMetric};

    fn source(clock: &Clock) -> Arc<UnsignedMetric> {
        Arc::new(UnsignedMetric::with_clock("packets", 0, clock.clone()))
    }

    #[test]
    fn rate_is_change_per_second() {
        let (clock, mock) = Clock::mock();
        let packets = source(&clock);
        let rate = RateMetric::with_clock("packet_rate", Arc::clone(&packets), clock);
        assert_eq!(rate.get(), 0.0);

        packets.set(1000);
        mock.increment(Duration::from_millis(5000));
        assert_eq!(rate.calculate(), 200.0);

        packets.set(1500);
        mock.increment(Duration::from_millis(2500));
        assert_eq!(rate.calculate(), 200.0);

        // Inside the interval: nothing is recalculated.
        packets.set(1512);
        mock.increment(Duration::from_millis(500));
        assert_eq!(rate.calculate(), 200.0);
        assert_eq!(rate.to_string(), "200.00");

        // The next qualifying call spans everything since the last calculation.
        mock.increment(Duration::from_millis(1000));
        assert_eq!(rate.calculate(), 8.0);
    }

    #[test]
    fn proxy_transforms_result() {
        let (clock, mock) = Clock::mock();
        let bytes = source(&clock);
        let rate = RateMetric::with_clock("bit_rate", Arc::clone(&bytes), clock)
            .with_proxy(|v| v * 2.0);
        assert_eq!(rate.proxy_value(21.0), 42.0);

        bytes.set(1000);
        mock.increment(Duration::from_millis(5000));
        rate.calculate();
        assert_eq!(rate.get(), 400.0);
        assert_eq!(rate.to_string(), "400.00");
    }

    #[test]
    fn rate_of_sum_recomputes_the_total() {
        let (clock, mock) = Clock::mock();
        let a = source(&clock);
        let b = source(&clock);
        let total = Arc::new(SumMetric::with_clock(
            "total",
            vec![Arc::clone(&a), Arc::clone(&b)],
            clock.clone(),
        ));
        let rate = RateMetric::with_clock("total_rate", Arc::clone(&total), clock);

        a.set(300);
        b.set(700);
        mock.increment(Duration::from_millis(2000));
        assert_eq!(rate.calculate(), 500.0);
        assert_eq!(total.get(), 1000);
    }

    #[test]
    fn dependents_are_notified_on_recalculation() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let (clock, mock) = Clock::mock();
        let packets = source(&clock);
        let rate = RateMetric::with_clock("packet_rate", Arc::clone(&packets), clock);
        let fired = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&fired);
        rate.register_hook(move |_, _| {
            count.fetch_add(1, Ordering::SeqCst);
        });

        rate.calculate();
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        mock.increment(Duration::from_millis(1000));
        rate.calculate();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
