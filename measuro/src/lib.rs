//! In-process metrics for applications that want to see what they are doing.
//!
//! Applications register named metrics in a [`Registry`], update them from any thread, derive
//! rates and sums from them, and render them through a [`Renderer`], either on demand or on a
//! background schedule.
//!
//! # Metrics
//!
//! Value cells hold a value directly:
//! - [`UnsignedMetric`], [`SignedMetric`] and [`FloatMetric`] keep a number in an atomic slot
//! - [`StringMetric`] keeps a string behind its own mutex
//! - [`BoolMetric`] keeps a flag, rendered with configurable text for each state
//!
//! Derived metrics compute their value from other metrics and cache it until recalculated:
//! - [`RateMetric`] measures the per-second change of a source, at most once a second
//! - [`SumMetric`] totals a set of targets sharing the same native type
//!
//! Registries recalculate derived metrics right before rendering them.
//!
//! # Hooks
//!
//! Every update to a metric first applies the change, then notifies the metric's hooks if the
//! metric's hook rate limit allows it.  The limit trades how fresh dependents are for how much an
//! update costs on a hot path: with a one second limit, a counter incremented millions of times per
//! second notifies its hooks once per second.  Metrics without hooks never read the clock.
//!
//! # Throttles
//!
//! A [`Throttle`] sits between a hot loop and a metric, letting through at most one update per
//! time limit and per number of attempts.  Assignments that don't go through are dropped;
//! additions are accumulated and merged on the next commit.
//!
//! # Example
//!
//! ```rust
//! use measuro::{Descriptor, Metric, Registry, RenderError, Renderer};
//!
//! #[derive(Default)]
//! struct Lines {
//!     lines: Vec<String>,
//!     suppressed: bool,
//! }
//!
//! impl Renderer for Lines {
//!     fn render(&mut self, metric: &Metric) -> Result<(), RenderError> {
//!         self.lines.push(format!("{} = {}", metric.name(), metric));
//!         Ok(())
//!     }
//!
//!     fn suppressed_error(&self) -> bool {
//!         self.suppressed
//!     }
//!
//!     fn set_suppressed_error(&mut self, suppressed: bool) {
//!         self.suppressed = suppressed;
//!     }
//! }
//!
//! let registry = Registry::new();
//! let hits = registry.create_unsigned(Descriptor::new("hits").unit("requests"), 0).unwrap();
//! let ratio = registry.create_float("ratio", 0.5).unwrap();
//!
//! hits.increment();
//! ratio.add(0.25);
//!
//! let mut renderer = Lines::default();
//! registry.render(&mut renderer, "").unwrap();
//! assert_eq!(renderer.lines, vec!["hits = 1", "ratio = 0.75"]);
//! ```
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod atomics;
pub use self::atomics::Number;

mod boolean;
pub use self::boolean::BoolMetric;

mod configuration;
pub use self::configuration::Configuration;

mod error;
pub use self::error::{MeasuroError, RenderError, Result};

mod hook;
pub use self::hook::Hook;

mod kind;
pub use self::kind::MetricKind;

mod metadata;
pub use self::metadata::{Descriptor, Metadata};

mod metric;
pub use self::metric::{DerivedMetric, Metric, Value};

mod number;
pub use self::number::{FloatMetric, NumberMetric, SignedMetric, UnsignedMetric};

mod rate;
pub use self::rate::{Proxy, RateMetric, RATE_CALCULATION_INTERVAL};

mod registry;
pub use self::registry::Registry;

mod render;
pub use self::render::Renderer;

mod schedule;

mod source;
pub use self::source::NumericSource;

mod string;
pub use self::string::StringMetric;

mod sum;
pub use self::sum::SumMetric;

mod throttle;
pub use self::throttle::{Throttle, Throttled};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Copyright notice, suitable for inclusion in an application's `--version` output.
pub const COPYRIGHT: &str = concat!(
    "Measuro version ",
    env!("CARGO_PKG_VERSION"),
    "\n\nReleased under the MIT licence - for details see ",
    env!("CARGO_PKG_REPOSITORY"),
);

/// Gets the major, minor and patch components of [`VERSION`].
pub fn version() -> (u32, u32, u32) {
    fn component(value: &str) -> u32 {
        value.parse().unwrap_or(0)
    }

    (
        component(env!("CARGO_PKG_VERSION_MAJOR")),
        component(env!("CARGO_PKG_VERSION_MINOR")),
        component(env!("CARGO_PKG_VERSION_PATCH")),
    )
}
