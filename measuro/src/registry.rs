use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use quanta::Clock;
use tracing::debug;

use crate::render::RenderScope;
use crate::schedule::RenderSchedule;
use crate::{
    BoolMetric, Configuration, Descriptor, FloatMetric, MeasuroError, Metadata, Metric,
    MetricKind, NumericSource, RateMetric, Renderer, Result, SignedMetric, StringMetric,
    SumMetric, Throttle, Throttled, UnsignedMetric,
};

struct Entry {
    metric: Metric,
    // Position in the collection for the metric's kind, `None` for derived metrics.
    index: Option<usize>,
}

#[derive(Default)]
struct Inner {
    metrics: BTreeMap<String, Entry>,
    unsigned: Vec<Arc<UnsignedMetric>>,
    signed: Vec<Arc<SignedMetric>>,
    float: Vec<Arc<FloatMetric>>,
    string: Vec<Arc<StringMetric>>,
    boolean: Vec<Arc<BoolMetric>>,
}

impl Inner {
    fn track(&mut self, metric: Metric) {
        fn push<T>(collection: &mut Vec<Arc<T>>, metric: &Arc<T>) -> Option<usize> {
            collection.push(Arc::clone(metric));
            Some(collection.len() - 1)
        }

        let index = match &metric {
            Metric::Unsigned(m) => push(&mut self.unsigned, m),
            Metric::Signed(m) => push(&mut self.signed, m),
            Metric::Float(m) => push(&mut self.float, m),
            Metric::String(m) => push(&mut self.string, m),
            Metric::Bool(m) => push(&mut self.boolean, m),
            Metric::Rate(_) | Metric::Sum(_) => None,
        };

        self.metrics.insert(metric.name().to_owned(), Entry { metric, index });
    }

    fn lookup(&self, name: &str, expected: MetricKind) -> Result<(&Entry, usize)> {
        let entry = self.metrics.get(name).ok_or_else(|| MeasuroError::NotFound(name.to_owned()))?;

        let actual = entry.metric.kind();
        if actual != expected {
            return Err(MeasuroError::UnexpectedKind { name: name.to_owned(), actual, expected });
        }

        let index = entry.index.ok_or_else(|| MeasuroError::NotLookupable(name.to_owned()))?;
        Ok((entry, index))
    }
}

/// State shared between a registry and its scheduled render thread.
pub(crate) struct Shared {
    inner: Mutex<Inner>,
    clock: Clock,
    hook_rate_limit: Duration,
    throttle_op_limit: u64,
}

impl Shared {
    /// Renders every metric whose name starts with `prefix`, in name order.
    ///
    /// The registry lock is held for the whole pass, so the set of metrics cannot change while a
    /// pass is running.  Values can.
    pub fn render(&self, renderer: &mut dyn Renderer, prefix: &str) -> Result<()> {
        let inner = self.inner.lock();
        let mut scope = RenderScope::begin(renderer)?;

        for (name, entry) in inner.metrics.range(prefix.to_owned()..) {
            if !name.starts_with(prefix) {
                break;
            }

            entry.metric.calculate();
            scope.render(&entry.metric)?;
        }

        Ok(())
    }
}

/// A directory of named metrics.
///
/// The registry creates metrics, enforces unique names, looks metrics up by name and renders them.
/// Metrics are rendered in ascending byte order of their names.
///
/// Value cells (unsigned, signed, float, string and bool metrics) can be looked up by name.  Rates
/// and sums are registered under their name, which is then taken, but can only be reached through
/// the handle returned on creation: looking them up fails with
/// [`MeasuroError::NotLookupable`].
///
/// A registry can also render its metrics periodically on a background thread; see
/// [`render_schedule`](Registry::render_schedule).
///
/// ```rust
/// # use measuro::{Descriptor, Registry};
/// let registry = Registry::new();
/// let requests = registry
///     .create_unsigned(Descriptor::new("requests").description("Requests served"), 0)
///     .unwrap();
///
/// requests.increment();
///
/// let same = registry.get_unsigned("requests").unwrap();
/// assert_eq!(same.get(), 1);
/// assert!(registry.create_unsigned("requests", 0).unwrap_err().is_name_error());
/// ```
pub struct Registry {
    shared: Arc<Shared>,
    schedule: Mutex<Option<RenderSchedule>>,
}

impl Registry {
    /// Creates a new [`Registry`] with the default configuration.
    pub fn new() -> Registry {
        Configuration::default().build()
    }

    /// Gets a [`Configuration`] builder.
    pub fn configure() -> Configuration {
        Configuration::new()
    }

    pub(crate) fn from_config(config: Configuration) -> Registry {
        let shared = Shared {
            inner: Mutex::new(Inner::default()),
            clock: config.clock,
            hook_rate_limit: config.hook_rate_limit,
            throttle_op_limit: config.throttle_op_limit,
        };

        Registry { shared: Arc::new(shared), schedule: Mutex::new(None) }
    }

    fn register<M, D, B, W>(&self, descriptor: D, kind: MetricKind, build: B, wrap: W) -> Result<Arc<M>>
    where
        D: Into<Descriptor>,
        B: FnOnce(Metadata, Clock) -> M,
        W: FnOnce(Arc<M>) -> Metric,
    {
        let descriptor = descriptor.into();
        let mut inner = self.shared.inner.lock();
        if inner.metrics.contains_key(descriptor.name()) {
            return Err(MeasuroError::AlreadyExists(descriptor.name().to_owned()));
        }

        let metadata = descriptor.into_metadata(kind, self.shared.hook_rate_limit);
        debug!(name = metadata.name(), kind = kind.as_str(), "creating metric");

        let metric = Arc::new(build(metadata, self.shared.clock.clone()));
        inner.track(wrap(Arc::clone(&metric)));
        Ok(metric)
    }

    /// Creates an unsigned integer metric.
    ///
    /// # Errors
    ///
    /// Fails if the name is already registered.
    pub fn create_unsigned<D: Into<Descriptor>>(
        &self,
        descriptor: D,
        initial: u64,
    ) -> Result<Arc<UnsignedMetric>> {
        self.register(
            descriptor,
            MetricKind::Unsigned,
            |metadata, clock| UnsignedMetric::from_parts(metadata, initial, clock),
            Metric::Unsigned,
        )
    }

    /// Creates a signed integer metric.
    ///
    /// # Errors
    ///
    /// Fails if the name is already registered.
    pub fn create_signed<D: Into<Descriptor>>(
        &self,
        descriptor: D,
        initial: i64,
    ) -> Result<Arc<SignedMetric>> {
        self.register(
            descriptor,
            MetricKind::Signed,
            |metadata, clock| SignedMetric::from_parts(metadata, initial, clock),
            Metric::Signed,
        )
    }

    /// Creates a floating point metric.
    ///
    /// # Errors
    ///
    /// Fails if the name is already registered.
    pub fn create_float<D: Into<Descriptor>>(
        &self,
        descriptor: D,
        initial: f64,
    ) -> Result<Arc<FloatMetric>> {
        self.register(
            descriptor,
            MetricKind::Float,
            |metadata, clock| FloatMetric::from_parts(metadata, initial, clock),
            Metric::Float,
        )
    }

    /// Creates a string metric.
    ///
    /// # Errors
    ///
    /// Fails if the name is already registered.
    pub fn create_string<D, S>(&self, descriptor: D, initial: S) -> Result<Arc<StringMetric>>
    where
        D: Into<Descriptor>,
        S: Into<String>,
    {
        let initial = initial.into();
        self.register(
            descriptor,
            MetricKind::String,
            |metadata, clock| StringMetric::from_parts(metadata, initial, clock),
            Metric::String,
        )
    }

    /// Creates a boolean metric rendered as `TRUE`/`FALSE`.
    ///
    /// # Errors
    ///
    /// Fails if the name is already registered.
    pub fn create_bool<D: Into<Descriptor>>(
        &self,
        descriptor: D,
        initial: bool,
    ) -> Result<Arc<BoolMetric>> {
        self.create_bool_with_representations(descriptor, initial, "TRUE", "FALSE")
    }

    /// Creates a boolean metric with custom textual forms for its two states.
    ///
    /// # Errors
    ///
    /// Fails if the name is already registered.
    pub fn create_bool_with_representations<D, T, F>(
        &self,
        descriptor: D,
        initial: bool,
        true_rep: T,
        false_rep: F,
    ) -> Result<Arc<BoolMetric>>
    where
        D: Into<Descriptor>,
        T: Into<String>,
        F: Into<String>,
    {
        self.register(
            descriptor,
            MetricKind::Bool,
            |metadata, clock| {
                BoolMetric::from_parts(metadata, initial, clock)
                    .with_representations(true_rep, false_rep)
            },
            Metric::Bool,
        )
    }

    /// Creates a rate of `source`.
    ///
    /// # Errors
    ///
    /// Fails if the name is already registered.
    pub fn create_rate<D, S>(&self, descriptor: D, source: Arc<S>) -> Result<Arc<RateMetric<S>>>
    where
        D: Into<Descriptor>,
        S: NumericSource,
    {
        self.register(
            descriptor,
            MetricKind::Rate,
            |metadata, clock| RateMetric::from_parts(metadata, source, None, clock),
            |metric| Metric::Rate(metric),
        )
    }

    /// Creates a rate of `source` whose calculated values are passed through `proxy`.
    ///
    /// # Errors
    ///
    /// Fails if the name is already registered.
    pub fn create_rate_with_proxy<D, S, F>(
        &self,
        descriptor: D,
        source: Arc<S>,
        proxy: F,
    ) -> Result<Arc<RateMetric<S>>>
    where
        D: Into<Descriptor>,
        S: NumericSource,
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        self.register(
            descriptor,
            MetricKind::Rate,
            |metadata, clock| RateMetric::from_parts(metadata, source, Some(Box::new(proxy)), clock),
            |metric| Metric::Rate(metric),
        )
    }

    /// Creates a sum of `targets`.  More targets can be added later.
    ///
    /// # Errors
    ///
    /// Fails if the name is already registered.
    pub fn create_sum<D, S>(&self, descriptor: D, targets: Vec<Arc<S>>) -> Result<Arc<SumMetric<S>>>
    where
        D: Into<Descriptor>,
        S: NumericSource,
    {
        self.register(
            descriptor,
            MetricKind::Sum,
            |metadata, clock| SumMetric::from_parts(metadata, targets, clock),
            |metric| Metric::Sum(metric),
        )
    }

    /// Creates a throttle over `metric` using the configured default operation limit.
    pub fn throttle<M: Throttled>(&self, metric: &Arc<M>, time_limit: Duration) -> Throttle<M> {
        self.throttle_with_op_limit(metric, time_limit, self.shared.throttle_op_limit)
    }

    /// Creates a throttle over `metric`.
    pub fn throttle_with_op_limit<M: Throttled>(
        &self,
        metric: &Arc<M>,
        time_limit: Duration,
        op_limit: u64,
    ) -> Throttle<M> {
        Throttle::with_clock(Arc::clone(metric), time_limit, op_limit, self.shared.clock.clone())
    }

    /// Looks up a metric by kind and name.
    ///
    /// # Errors
    ///
    /// Fails with a name error if no metric has this name, and with a type error if the metric
    /// has a different kind or is a rate or a sum.
    pub fn lookup(&self, kind: MetricKind, name: &str) -> Result<Metric> {
        let inner = self.shared.inner.lock();
        let (entry, _) = inner.lookup(name, kind)?;
        Ok(entry.metric.clone())
    }

    /// Looks up an unsigned metric by name.
    ///
    /// Avoid lookups in hot paths: keep the handle returned on creation instead.
    pub fn get_unsigned(&self, name: &str) -> Result<Arc<UnsignedMetric>> {
        let inner = self.shared.inner.lock();
        let (_, index) = inner.lookup(name, MetricKind::Unsigned)?;
        Ok(Arc::clone(&inner.unsigned[index]))
    }

    /// Looks up a signed metric by name.
    pub fn get_signed(&self, name: &str) -> Result<Arc<SignedMetric>> {
        let inner = self.shared.inner.lock();
        let (_, index) = inner.lookup(name, MetricKind::Signed)?;
        Ok(Arc::clone(&inner.signed[index]))
    }

    /// Looks up a float metric by name.
    pub fn get_float(&self, name: &str) -> Result<Arc<FloatMetric>> {
        let inner = self.shared.inner.lock();
        let (_, index) = inner.lookup(name, MetricKind::Float)?;
        Ok(Arc::clone(&inner.float[index]))
    }

    /// Looks up a string metric by name.
    pub fn get_string(&self, name: &str) -> Result<Arc<StringMetric>> {
        let inner = self.shared.inner.lock();
        let (_, index) = inner.lookup(name, MetricKind::String)?;
        Ok(Arc::clone(&inner.string[index]))
    }

    /// Looks up a bool metric by name.
    pub fn get_bool(&self, name: &str) -> Result<Arc<BoolMetric>> {
        let inner = self.shared.inner.lock();
        let (_, index) = inner.lookup(name, MetricKind::Bool)?;
        Ok(Arc::clone(&inner.boolean[index]))
    }

    /// Gets any registered metric by name, whatever its kind.
    pub fn metric(&self, name: &str) -> Result<Metric> {
        let inner = self.shared.inner.lock();
        inner
            .metrics
            .get(name)
            .map(|entry| entry.metric.clone())
            .ok_or_else(|| MeasuroError::NotFound(name.to_owned()))
    }

    /// Gets the names of every registered metric, in render order.
    pub fn names(&self) -> Vec<String> {
        self.shared.inner.lock().metrics.keys().cloned().collect()
    }

    /// Gets the number of registered metrics.
    pub fn len(&self) -> usize {
        self.shared.inner.lock().metrics.len()
    }

    /// Whether no metric is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders every metric whose name starts with `prefix`.  An empty prefix renders everything.
    ///
    /// Derived metrics are recalculated right before they are rendered.
    ///
    /// # Errors
    ///
    /// Fails with [`MeasuroError::Render`] if the renderer's `before` or `render` fails.  Failures
    /// of `after` are recorded on the renderer instead.
    pub fn render(&self, renderer: &mut dyn Renderer, prefix: &str) -> Result<()> {
        self.shared.render(renderer, prefix)
    }

    /// Renders every metric with `renderer` each time `interval` elapses, on a background thread.
    ///
    /// Replaces any active schedule, waiting for its thread to exit first.  Failed renders are
    /// logged and the schedule carries on.
    ///
    /// # Errors
    ///
    /// Fails if the background thread cannot be spawned.
    pub fn render_schedule<R>(&self, renderer: R, interval: Duration) -> Result<()>
    where
        R: Renderer + Send + 'static,
    {
        let mut schedule = self.schedule.lock();
        if let Some(previous) = schedule.take() {
            previous.stop();
        }

        let started = RenderSchedule::start(Arc::clone(&self.shared), Box::new(renderer), interval)?;
        *schedule = Some(started);
        Ok(())
    }

    /// Stops the active schedule, if any, and hands its renderer back.
    ///
    /// Once this returns, no further scheduled render will happen.
    pub fn cancel_render_schedule(&self) -> Option<Box<dyn Renderer + Send>> {
        let schedule = self.schedule.lock().take();
        schedule.and_then(RenderSchedule::stop)
    }

    /// Whether a render schedule is active.
    pub fn is_scheduled(&self) -> bool {
        self.schedule.lock().is_some()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}
