use std::fmt;
use std::sync::Arc;

use crate::{
    BoolMetric, FloatMetric, MeasuroError, Metadata, MetricKind, Result, SignedMetric,
    StringMetric, UnsignedMetric,
};

/// A metric whose value is computed from other metrics.
///
/// Implemented by [`RateMetric`](crate::RateMetric) and [`SumMetric`](crate::SumMetric) for every
/// source type, so that a registry can hold derived metrics without knowing what they derive
/// from.
pub trait DerivedMetric: fmt::Display + Send + Sync {
    /// Gets the metadata of this metric.
    fn metadata(&self) -> &Metadata;

    /// Recomputes the cached value, subject to the metric's own recalculation rules.
    fn calculate(&self);

    /// Gets the cached value.
    fn value(&self) -> Value;
}

/// A snapshot of a metric's value in its native type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An unsigned integer.
    Unsigned(u64),
    /// A signed integer.
    Signed(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    String(String),
    /// A boolean.
    Bool(bool),
}

/// A handle to any metric tracked by a registry.
///
/// Renderers receive metrics as this type and dispatch on the variant, or use the metadata
/// accessors and casts that every metric supports.  Casting to a native type the metric's kind
/// does not support fails with [`MeasuroError::Cast`].
#[derive(Clone)]
pub enum Metric {
    /// An unsigned integer metric.
    Unsigned(Arc<UnsignedMetric>),
    /// A signed integer metric.
    Signed(Arc<SignedMetric>),
    /// A floating point metric.
    Float(Arc<FloatMetric>),
    /// A rate of another metric.
    Rate(Arc<dyn DerivedMetric>),
    /// A sum of other metrics.
    Sum(Arc<dyn DerivedMetric>),
    /// A string metric.
    String(Arc<StringMetric>),
    /// A boolean metric.
    Bool(Arc<BoolMetric>),
}

impl Metric {
    /// Gets the metadata of this metric.
    pub fn metadata(&self) -> &Metadata {
        match self {
            Metric::Unsigned(m) => m.metadata(),
            Metric::Signed(m) => m.metadata(),
            Metric::Float(m) => m.metadata(),
            Metric::Rate(m) | Metric::Sum(m) => m.metadata(),
            Metric::String(m) => m.metadata(),
            Metric::Bool(m) => m.metadata(),
        }
    }

    /// Gets the name of this metric.
    pub fn name(&self) -> &str {
        self.metadata().name()
    }

    /// Gets the unit of this metric.
    pub fn unit(&self) -> &str {
        self.metadata().unit()
    }

    /// Gets the description of this metric.
    pub fn description(&self) -> &str {
        self.metadata().description()
    }

    /// Gets the kind of this metric.
    pub fn kind(&self) -> MetricKind {
        self.metadata().kind()
    }

    /// Gets the human-readable name of this metric's kind.
    pub fn kind_name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Recomputes derived metrics.  Does nothing for value cells.
    pub fn calculate(&self) {
        if let Metric::Rate(m) | Metric::Sum(m) = self {
            m.calculate();
        }
    }

    /// Gets the current value.
    pub fn value(&self) -> Value {
        match self {
            Metric::Unsigned(m) => Value::Unsigned(m.get()),
            Metric::Signed(m) => Value::Signed(m.get()),
            Metric::Float(m) => Value::Float(m.get()),
            Metric::Rate(m) | Metric::Sum(m) => m.value(),
            Metric::String(m) => Value::String(m.get()),
            Metric::Bool(m) => Value::Bool(m.get()),
        }
    }

    /// Gets the value as an unsigned integer.
    ///
    /// Supported by unsigned metrics and sums of unsigned metrics.
    pub fn as_u64(&self) -> Result<u64> {
        match self.value() {
            Value::Unsigned(v) => Ok(v),
            _ => Err(self.cast_error(MetricKind::Unsigned)),
        }
    }

    /// Gets the value as a signed integer.
    ///
    /// Supported by signed metrics and sums of signed metrics.
    pub fn as_i64(&self) -> Result<i64> {
        match self.value() {
            Value::Signed(v) => Ok(v),
            _ => Err(self.cast_error(MetricKind::Signed)),
        }
    }

    /// Gets the value as a float.
    ///
    /// Supported by every numeric kind.
    pub fn as_f64(&self) -> Result<f64> {
        match self.value() {
            Value::Unsigned(v) => Ok(v as f64),
            Value::Signed(v) => Ok(v as f64),
            Value::Float(v) => Ok(v),
            _ => Err(self.cast_error(MetricKind::Float)),
        }
    }

    /// Gets the value as a boolean.
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Metric::Bool(m) => Ok(m.get()),
            _ => Err(self.cast_error(MetricKind::Bool)),
        }
    }

    /// Gets the value as a string.
    ///
    /// Only string metrics support this cast; every metric can be formatted with `to_string`.
    pub fn as_string(&self) -> Result<String> {
        match self {
            Metric::String(m) => Ok(m.get()),
            _ => Err(self.cast_error(MetricKind::String)),
        }
    }

    fn cast_error(&self, requested: MetricKind) -> MeasuroError {
        MeasuroError::Cast { name: self.name().to_owned(), actual: self.kind(), requested }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Unsigned(m) => fmt::Display::fmt(m, f),
            Metric::Signed(m) => fmt::Display::fmt(m, f),
            Metric::Float(m) => fmt::Display::fmt(m, f),
            Metric::Rate(m) | Metric::Sum(m) => fmt::Display::fmt(m, f),
            Metric::String(m) => fmt::Display::fmt(m, f),
            Metric::Bool(m) => fmt::Display::fmt(m, f),
        }
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metric")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("value", &self.value())
            .finish()
    }
}

impl From<Arc<UnsignedMetric>> for Metric {
    fn from(metric: Arc<UnsignedMetric>) -> Self {
        Metric::Unsigned(metric)
    }
}

impl From<Arc<SignedMetric>> for Metric {
    fn from(metric: Arc<SignedMetric>) -> Self {
        Metric::Signed(metric)
    }
}

impl From<Arc<FloatMetric>> for Metric {
    fn from(metric: Arc<FloatMetric>) -> Self {
        Metric::Float(metric)
    }
}

impl From<Arc<StringMetric>> for Metric {
    fn from(metric: Arc<StringMetric>) -> Self {
        Metric::String(metric)
    }
}

impl From<Arc<BoolMetric>> for Metric {
    fn from(metric: Arc<BoolMetric>) -> Self {
        Metric::Bool(metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RateMetric, SumMetric};

    #[test]
    fn casts_follow_kind() {
        let metric = Metric::from(Arc::new(UnsignedMetric::new("count", 1024)));
        assert_eq!(metric.as_u64().unwrap(), 1024);
        assert_eq!(metric.as_f64().unwrap(), 1024.0);
        assert_eq!(metric.kind_name(), "UINT");
        assert_eq!(metric.to_string(), "1024");

        let err = metric.as_i64().unwrap_err();
        assert!(matches!(
            err,
            MeasuroError::Cast { actual: MetricKind::Unsigned, requested: MetricKind::Signed, .. }
        ));
        assert!(metric.as_bool().unwrap_err().is_cast_error());
        assert!(metric.as_string().unwrap_err().is_cast_error());
    }

    #[test]
    fn string_and_bool_are_not_numeric() {
        let label = Metric::from(Arc::new(StringMetric::new("label", "init")));
        let err = label.as_f64().unwrap_err();
        assert!(matches!(
            err,
            MeasuroError::Cast { actual: MetricKind::String, requested: MetricKind::Float, .. }
        ));
        assert_eq!(label.as_string().unwrap(), "init");

        let flag = Metric::from(Arc::new(BoolMetric::new("flag", true)));
        assert!(flag.as_u64().is_err());
        assert!(flag.as_bool().unwrap());
        assert_eq!(flag.to_string(), "TRUE");
        assert_eq!(flag.value(), Value::Bool(true));
    }

    #[test]
    fn derived_metrics_dispatch() {
        let target = Arc::new(SignedMetric::new("tgt", -5));
        let sum = Arc::new(SumMetric::new("total", vec![Arc::clone(&target)]));
        let metric = Metric::Sum(sum);
        assert_eq!(metric.as_i64().unwrap(), 0);

        metric.calculate();
        assert_eq!(metric.as_i64().unwrap(), -5);
        assert_eq!(metric.as_f64().unwrap(), -5.0);
        assert!(metric.as_u64().is_err());
        assert_eq!(metric.kind_name(), "SUM");

        let rate = Metric::Rate(Arc::new(RateMetric::new("tgt_rate", target)));
        assert_eq!(rate.as_f64().unwrap(), 0.0);
        assert_eq!(rate.to_string(), "0.00");
        assert!(rate.as_u64().is_err());
    }
}
