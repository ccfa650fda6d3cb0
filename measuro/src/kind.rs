use std::fmt;

/// Metric kind.
///
/// Defines the kind, or type, of a metric.  Value cells hold a value directly:
/// - unsigned integers
/// - signed integers
/// - floats
/// - strings
/// - booleans
///
/// Derived metrics compute their value from other metrics:
/// - rates
/// - sums
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum MetricKind {
    /// Unsigned integer type.
    Unsigned,
    /// Signed integer type.
    Signed,
    /// Floating point type.
    Float,
    /// Rate of change of another metric.
    Rate,
    /// Total of a set of other metrics.
    Sum,
    /// String type.
    String,
    /// Boolean type.
    Bool,
}

impl MetricKind {
    /// All metric kinds.
    pub const ALL: [MetricKind; 7] = [
        MetricKind::Unsigned,
        MetricKind::Signed,
        MetricKind::Float,
        MetricKind::Rate,
        MetricKind::Sum,
        MetricKind::String,
        MetricKind::Bool,
    ];

    /// Gets the human-readable name of this kind, as used by renderers.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Unsigned => "UINT",
            MetricKind::Signed => "INT",
            MetricKind::Float => "FLOAT",
            MetricKind::Rate => "RATE",
            MetricKind::Sum => "SUM",
            MetricKind::String => "STR",
            MetricKind::Bool => "BOOL",
        }
    }

    /// Whether or not metrics of this kind can be looked up by name in a registry.
    ///
    /// Rates and sums are registered by name but are only reachable through the handle returned
    /// when they were created.
    pub const fn is_lookupable(&self) -> bool {
        !self.is_derived()
    }

    /// Whether or not metrics of this kind compute their value from other metrics.
    pub const fn is_derived(&self) -> bool {
        matches!(self, MetricKind::Rate | MetricKind::Sum)
    }

    /// Whether or not metrics of this kind hold a numeric value.
    pub const fn is_numeric(&self) -> bool {
        !matches!(self, MetricKind::String | MetricKind::Bool)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
