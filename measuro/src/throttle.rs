use std::sync::Arc;
use std::time::Duration;

use quanta::{Clock, Instant};

use crate::{BoolMetric, Number, NumberMetric, StringMetric};

/// A metric that can sit behind a [`Throttle`].
pub trait Throttled: Send + Sync + 'static {
    /// Type of the values assigned to the metric.
    type Value;

    /// State carried by the throttle between commits.
    type Pending: Default;

    /// Commits an assignment, discarding any state that the assignment supersedes.
    fn assign(&self, value: Self::Value, pending: &mut Self::Pending);
}

impl<T: Number> Throttled for NumberMetric<T> {
    type Value = T;
    type Pending = T;

    fn assign(&self, value: T, pending: &mut T) {
        self.set(value);
        *pending = T::ZERO;
    }
}

impl Throttled for StringMetric {
    type Value = String;
    type Pending = ();

    fn assign(&self, value: String, _: &mut ()) {
        self.set(value);
    }
}

impl Throttled for BoolMetric {
    type Value = bool;
    type Pending = ();

    fn assign(&self, value: bool, _: &mut ()) {
        self.set(value);
    }
}

/// Decides whether an update attempt may go through.
#[derive(Debug)]
struct Gate {
    clock: Clock,
    time_limit: Duration,
    op_limit: u64,
    op_count: u64,
    // `None` once the deadline is past what an `Instant` can hold: never eligible again.
    next_update: Option<Instant>,
}

impl Gate {
    fn new(clock: Clock, time_limit: Duration, op_limit: u64) -> Gate {
        let next_update = clock.now().checked_add(time_limit);
        Gate { clock, time_limit, op_limit: op_limit.max(1), op_count: 0, next_update }
    }

    fn check(&mut self) -> bool {
        self.op_count = self.op_count.wrapping_add(1);
        if self.op_count % self.op_limit != 0 {
            return false;
        }

        let now = self.clock.now();
        match self.next_update {
            Some(next_update) if now >= next_update => {
                self.next_update = now.checked_add(self.time_limit);
                true
            }
            _ => false,
        }
    }
}

/// Limits how often updates reach a metric.
///
/// Only every `op_limit`th attempt is considered, and of those only attempts made at least
/// `time_limit` after the previous commit go through.  The first commit can happen once
/// `time_limit` has passed since the throttle was created.
///
/// Assignments that do not go through are dropped.  Additions to numeric metrics are accumulated
/// instead, and the accumulated delta is merged into the metric on the next commit so that no
/// count is ever lost.
///
/// A throttle belongs to a single writer.  Its methods take `&mut self`, and dropping it leaves
/// the metric untouched, including any delta still pending.
///
/// ```rust
/// # use measuro::{Registry, Throttle};
/// # use std::time::Duration;
/// let registry = Registry::new();
/// let processed = registry.create_unsigned("processed", 0).unwrap();
/// let mut throttle = registry.throttle(&processed, Duration::from_secs(1));
///
/// for _ in 0..1000 {
///     throttle.increment();
/// }
/// throttle.commit();
///
/// assert_eq!(processed.get(), 1000);
/// ```
#[derive(Debug)]
pub struct Throttle<M: Throttled> {
    metric: Arc<M>,
    gate: Gate,
    pending: M::Pending,
}

impl<M: Throttled> Throttle<M> {
    /// Creates a throttle over `metric` using the system clock.
    pub fn new(metric: Arc<M>, time_limit: Duration, op_limit: u64) -> Self {
        Self::with_clock(metric, time_limit, op_limit, Clock::new())
    }

    /// Creates a throttle over `metric` that reads time from `clock`.
    ///
    /// An `op_limit` of zero behaves like one.
    pub fn with_clock(metric: Arc<M>, time_limit: Duration, op_limit: u64, clock: Clock) -> Self {
        Throttle {
            metric,
            gate: Gate::new(clock, time_limit, op_limit),
            pending: M::Pending::default(),
        }
    }

    /// Gets the throttled metric.
    pub fn metric(&self) -> &Arc<M> {
        &self.metric
    }

    /// Gets the minimum time between two commits.
    pub fn time_limit(&self) -> Duration {
        self.gate.time_limit
    }

    /// Gets the number of attempts per considered attempt.
    pub fn op_limit(&self) -> u64 {
        self.gate.op_limit
    }

    /// Assigns `value` to the metric if the throttle allows it, dropping it otherwise.
    ///
    /// Returns whether the value was committed.
    pub fn set(&mut self, value: M::Value) -> bool {
        if !self.gate.check() {
            return false;
        }

        self.metric.assign(value, &mut self.pending);
        true
    }
}

impl<T: Number> Throttle<NumberMetric<T>> {
    /// Adds `delta` to the pending delta, then merges the pending delta into the metric if the
    /// throttle allows it.
    ///
    /// Returns whether the pending delta was committed.
    pub fn add(&mut self, delta: T) -> bool {
        self.pending = self.pending.wrapping_add(delta);
        if !self.gate.check() {
            return false;
        }

        self.commit();
        true
    }

    /// Adds one, as per [`add`](Throttle::add).
    pub fn increment(&mut self) -> bool {
        self.add(T::ONE)
    }

    /// Merges the pending delta into the metric regardless of the throttle's limits.
    ///
    /// A zero pending delta leaves the metric untouched, so its hooks are not notified.
    pub fn commit(&mut self) {
        if self.pending != T::ZERO {
            self.metric.add(self.pending);
            self.pending = T::ZERO;
        }
    }

    /// Gets the delta waiting to be committed.
    pub fn pending(&self) -> T {
        self.pending
    }
}
