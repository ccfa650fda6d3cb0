//! Atomic storage for numeric metrics.
//!
//! Every numeric metric keeps its value in a single atomic slot so that readers observe either
//! the value before an update or the value after it, never a mix of the two.  Integers map to the
//! matching atomic integer, while floats are stored as their bit pattern in an `AtomicU64`.
//!
//! We always require 64-bit atomics regardless of whether the standard library exposes them for
//! the target architecture, so 32-bit targets fall back to `portable-atomic`.

use std::fmt;
use std::sync::atomic::Ordering;

#[cfg(target_pointer_width = "32")]
pub use portable_atomic::{AtomicI64, AtomicU64};
#[cfg(not(target_pointer_width = "32"))]
pub use std::sync::atomic::{AtomicI64, AtomicU64};

use crate::{MetricKind, Value};

/// A native numeric type that a metric can hold.
///
/// Implemented for `u64` (unsigned metrics), `i64` (signed metrics) and `f64` (float metrics,
/// rates and sums of floats).  Integer arithmetic wraps on overflow, mirroring the behavior of the
/// underlying atomic fetch operations.
pub trait Number:
    Copy + Default + PartialEq + PartialOrd + fmt::Debug + Send + Sync + 'static
{
    /// Atomic slot used to store the value.
    type Atomic: fmt::Debug + Send + Sync;

    /// Kind of value cell holding this type.
    const KIND: MetricKind;

    /// Additive identity.
    const ZERO: Self;

    /// Unit step used by increments and decrements.
    const ONE: Self;

    /// Creates an atomic slot holding `value`.
    fn new_atomic(value: Self) -> Self::Atomic;

    /// Loads the current value.
    fn load(atomic: &Self::Atomic) -> Self;

    /// Replaces the current value.
    fn store(atomic: &Self::Atomic, value: Self);

    /// Adds `delta` to the current value, returning the previous value.
    fn fetch_add(atomic: &Self::Atomic, delta: Self) -> Self;

    /// Subtracts `delta` from the current value, returning the previous value.
    fn fetch_sub(atomic: &Self::Atomic, delta: Self) -> Self;

    /// Adds two values the same way [`fetch_add`](Number::fetch_add) does.
    fn wrapping_add(self, rhs: Self) -> Self;

    /// Subtracts two values the same way [`fetch_sub`](Number::fetch_sub) does.
    fn wrapping_sub(self, rhs: Self) -> Self;

    /// Converts the value to a float, as used for rate calculations.
    fn to_f64(self) -> f64;

    /// Converts the value to a [`Value`].
    fn into_value(self) -> Value;

    /// Writes the textual form of the value.
    ///
    /// Integers are written as-is, floats always carry exactly two decimal places.
    fn fmt_value(self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

macro_rules! impl_integer {
    ($ty:ty, $atomic:ty, $kind:expr, $variant:ident) => {
        impl Number for $ty {
            type Atomic = $atomic;

            const KIND: MetricKind = $kind;
            const ZERO: Self = 0;
            const ONE: Self = 1;

            fn new_atomic(value: Self) -> Self::Atomic {
                <$atomic>::new(value)
            }

            fn load(atomic: &Self::Atomic) -> Self {
                atomic.load(Ordering::Acquire)
            }

            fn store(atomic: &Self::Atomic, value: Self) {
                atomic.store(value, Ordering::Release);
            }

            fn fetch_add(atomic: &Self::Atomic, delta: Self) -> Self {
                atomic.fetch_add(delta, Ordering::AcqRel)
            }

            fn fetch_sub(atomic: &Self::Atomic, delta: Self) -> Self {
                atomic.fetch_sub(delta, Ordering::AcqRel)
            }

            fn wrapping_add(self, rhs: Self) -> Self {
                <$ty>::wrapping_add(self, rhs)
            }

            fn wrapping_sub(self, rhs: Self) -> Self {
                <$ty>::wrapping_sub(self, rhs)
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn fmt_value(self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self)
            }
        }
    };
}

impl_integer!(u64, AtomicU64, MetricKind::Unsigned, Unsigned);
impl_integer!(i64, AtomicI64, MetricKind::Signed, Signed);

impl Number for f64 {
    type Atomic = AtomicU64;

    const KIND: MetricKind = MetricKind::Float;
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;

    fn new_atomic(value: Self) -> Self::Atomic {
        AtomicU64::new(value.to_bits())
    }

    fn load(atomic: &Self::Atomic) -> Self {
        f64::from_bits(atomic.load(Ordering::Acquire))
    }

    fn store(atomic: &Self::Atomic, value: Self) {
        atomic.store(value.to_bits(), Ordering::Release);
    }

    fn fetch_add(atomic: &Self::Atomic, delta: Self) -> Self {
        let result = atomic.fetch_update(Ordering::AcqRel, Ordering::Relaxed, |curr| {
            let input = f64::from_bits(curr);
            Some((input + delta).to_bits())
        });

        // The closure never rejects an update, so both arms carry the previous value.
        f64::from_bits(result.unwrap_or_else(|curr| curr))
    }

    fn fetch_sub(atomic: &Self::Atomic, delta: Self) -> Self {
        Self::fetch_add(atomic, -delta)
    }

    fn wrapping_add(self, rhs: Self) -> Self {
        self + rhs
    }

    fn wrapping_sub(self, rhs: Self) -> Self {
        self - rhs
    }

    fn to_f64(self) -> f64 {
        self
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn fmt_value(self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_fetch_returns_previous() {
        let slot = u64::new_atomic(5);
        assert_eq!(u64::fetch_add(&slot, 3), 5);
        assert_eq!(u64::fetch_sub(&slot, 1), 8);
        assert_eq!(u64::load(&slot), 7);
    }

    #[test]
    fn unsigned_wraps() {
        let slot = u64::new_atomic(0);
        assert_eq!(u64::fetch_sub(&slot, 1), 0);
        assert_eq!(u64::load(&slot), u64::MAX);
        assert_eq!(u64::MAX.wrapping_add(1), 0);
    }

    #[test]
    fn float_bits_round_through_slot() {
        let slot = f64::new_atomic(10.25);
        assert_eq!(f64::fetch_add(&slot, 0.5), 10.25);
        assert_eq!(f64::fetch_sub(&slot, 0.75), 10.75);
        assert_eq!(f64::load(&slot), 10.0);

        f64::store(&slot, -1.5);
        assert_eq!(f64::load(&slot), -1.5);
    }
}
