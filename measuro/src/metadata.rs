use std::time::Duration;

use crate::MetricKind;

/// Metadata describing a metric.
///
/// All metrics have the following metadata:
///
/// - A [`name`](Metadata::name), unique within a registry and case-sensitive.
/// - A [`unit`](Metadata::unit), which may be empty.
/// - A [`description`](Metadata::description), which may be empty.
/// - A [`kind`](Metadata::kind), fixed when the metric is created.
/// - A [`hook rate limit`](Metadata::hook_rate_limit), the minimum interval between two
///   notifications of the metric's dependents.  A zero limit notifies on every update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    name: String,
    unit: String,
    description: String,
    kind: MetricKind,
    hook_rate_limit: Duration,
}

impl Metadata {
    /// Returns the name of the metric.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the unit of the metric.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Returns the description of the metric.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the kind of the metric.
    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Returns the human-readable name of the metric's kind.
    pub fn kind_name(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Returns the minimum interval between two notifications of the metric's dependents.
    pub fn hook_rate_limit(&self) -> Duration {
        self.hook_rate_limit
    }
}

/// Describes a metric about to be created.
///
/// Anything that converts into a string converts into a descriptor with an empty unit and
/// description, so the simplest metrics can be created by name alone:
///
/// ```rust
/// # use measuro::{Descriptor, Registry};
/// # use std::time::Duration;
/// let registry = Registry::new();
/// let plain = registry.create_unsigned("requests", 0).unwrap();
/// let detailed = registry
///     .create_unsigned(
///         Descriptor::new("bytes_in")
///             .unit("bytes")
///             .description("Bytes read from the network")
///             .hook_rate_limit(Duration::ZERO),
///         0,
///     )
///     .unwrap();
///
/// assert_eq!(plain.unit(), "");
/// assert_eq!(detailed.unit(), "bytes");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    name: String,
    unit: String,
    description: String,
    hook_rate_limit: Option<Duration>,
}

impl Descriptor {
    /// Creates a new [`Descriptor`] with the given name.
    pub fn new<N: Into<String>>(name: N) -> Descriptor {
        Descriptor {
            name: name.into(),
            unit: String::new(),
            description: String::new(),
            hook_rate_limit: None,
        }
    }

    /// Sets the unit.
    ///
    /// Defaults to an empty string.
    pub fn unit<U: Into<String>>(mut self, unit: U) -> Self {
        self.unit = unit.into();
        self
    }

    /// Sets the description.
    ///
    /// Defaults to an empty string.
    pub fn description<D: Into<String>>(mut self, description: D) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the hook rate limit.
    ///
    /// Defaults to the rate limit of whatever creates the metric: the registry's configured limit
    /// for registry-created metrics, or zero for standalone ones.
    pub fn hook_rate_limit(mut self, limit: Duration) -> Self {
        self.hook_rate_limit = Some(limit);
        self
    }

    /// Returns the name being described.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_metadata(self, kind: MetricKind, default_limit: Duration) -> Metadata {
        Metadata {
            name: self.name,
            unit: self.unit,
            description: self.description,
            kind,
            hook_rate_limit: self.hook_rate_limit.unwrap_or(default_limit),
        }
    }
}

impl From<&str> for Descriptor {
    fn from(name: &str) -> Self {
        Descriptor::new(name)
    }
}

impl From<String> for Descriptor {
    fn from(name: String) -> Self {
        Descriptor::new(name)
    }
}
