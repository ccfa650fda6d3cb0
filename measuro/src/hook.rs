use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use quanta::{Clock, Instant};
use tracing::trace;

use crate::atomics::AtomicU64;
use crate::Metadata;

/// A callback fired after a metric's value changes.
///
/// Hooks receive the metric that changed and the time of the cascade, so a hook can read the
/// metric's new value without holding a handle to it.  They run while the metric's hook list is
/// locked, so a hook must not register another hook on the same metric, but it may freely read or
/// write any other metric.
pub type Hook<M> = Box<dyn Fn(&M, Instant) + Send + Sync + 'static>;

/// Hook list and cascade bookkeeping owned by every metric.
pub(crate) struct Hooks<M> {
    has_hooks: AtomicBool,
    hooks: Mutex<Vec<Hook<M>>>,
    clock: Clock,
    origin: Instant,
    // Nanoseconds between `origin` and the last cascade.
    last_cascade: AtomicU64,
}

impl<M> Hooks<M> {
    pub fn new(clock: Clock) -> Hooks<M> {
        let origin = clock.now();
        Hooks {
            has_hooks: AtomicBool::new(false),
            hooks: Mutex::new(Vec::new()),
            clock,
            origin,
            last_cascade: AtomicU64::new(0),
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn register(&self, hook: Hook<M>) {
        let mut hooks = self.hooks.lock();
        hooks.push(hook);
        self.has_hooks.store(true, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.hooks.lock().len()
    }

    /// Applies `mutation`, then notifies every hook of `metric` if the cascade is due.
    ///
    /// The mutation runs before any lock is taken.  Metrics without hooks never read the clock.
    pub fn update<R>(&self, metric: &M, metadata: &Metadata, mutation: impl FnOnce() -> R) -> R {
        let result = mutation();

        if !self.has_hooks.load(Ordering::Acquire) {
            return result;
        }

        let now = self.clock.now();
        let offset = duration_nanos(now.saturating_duration_since(self.origin));
        let limit = duration_nanos(metadata.hook_rate_limit());
        let last = self.last_cascade.load(Ordering::Acquire);
        if limit != 0 && offset.saturating_sub(last) < limit {
            return result;
        }

        let hooks = self.hooks.lock();
        trace!(metric = metadata.name(), hooks = hooks.len(), "cascading update");
        for hook in hooks.iter() {
            hook(metric, now);
        }
        self.last_cascade.store(offset, Ordering::Release);

        result
    }
}

impl<M> fmt::Debug for Hooks<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("has_hooks", &self.has_hooks.load(Ordering::Relaxed))
            .field("last_cascade", &self.last_cascade.load(Ordering::Relaxed))
            .finish()
    }
}

fn duration_nanos(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
