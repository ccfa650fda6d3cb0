use crate::{Metadata, Number};

/// A metric that derived metrics can read a numeric value from.
///
/// Number metrics yield their current value.  Derived metrics are pull-based, so sampling a sum
/// or a rate recalculates it first: a rate of a sum always sees a fresh total.
pub trait NumericSource: Send + Sync + 'static {
    /// Native type of the sampled value.
    type Native: Number;

    /// Gets the metadata of the source metric.
    fn metadata(&self) -> &Metadata;

    /// Reads the current value.
    fn sample(&self) -> Self::Native;
}
