use std::io;

use thiserror::Error;

use crate::MetricKind;

/// Error returned by a [`Renderer`](crate::Renderer) callback.
pub type RenderError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience alias for results produced by this crate.
pub type Result<T, E = MeasuroError> = std::result::Result<T, E>;

/// Errors that can occur while creating, looking up, casting or rendering metrics.
#[derive(Debug, Error)]
pub enum MeasuroError {
    /// A metric was created with a name that is already registered.
    #[error("a metric already exists with the name \"{0}\"")]
    AlreadyExists(String),

    /// A lookup named a metric that does not exist.
    #[error("no metric exists called \"{0}\"")]
    NotFound(String),

    /// A lookup named a metric of a different kind than the one requested.
    #[error("the metric called \"{name}\" is of an unexpected kind: actual kind is {actual}; expected kind is {expected}")]
    UnexpectedKind {
        /// Name of the metric.
        name: String,
        /// Kind the metric was created with.
        actual: MetricKind,
        /// Kind the caller asked for.
        expected: MetricKind,
    },

    /// A lookup named a derived metric, which is registered by name but cannot be looked up.
    #[error("the metric called \"{0}\" is not of a kind that can be looked up")]
    NotLookupable(String),

    /// A metric's value was requested as a native type its kind does not support.
    #[error("the metric called \"{name}\" of kind {actual} cannot be cast to {requested}")]
    Cast {
        /// Name of the metric.
        name: String,
        /// Kind the metric was created with.
        actual: MetricKind,
        /// Kind matching the native type the caller asked for.
        requested: MetricKind,
    },

    /// A renderer failed in `before` or `render`.
    #[error("failed to render metrics: {0}")]
    Render(#[source] RenderError),

    /// The scheduled render thread could not be started.
    #[error("failed to spawn render thread: {0}")]
    Spawn(#[from] io::Error),
}

impl MeasuroError {
    /// Whether this error is a name error: a duplicate name on creation or a missing name on lookup.
    pub fn is_name_error(&self) -> bool {
        matches!(self, MeasuroError::AlreadyExists(_) | MeasuroError::NotFound(_))
    }

    /// Whether this error is a type error raised by a lookup.
    pub fn is_type_error(&self) -> bool {
        matches!(self, MeasuroError::UnexpectedKind { .. } | MeasuroError::NotLookupable(_))
    }

    /// Whether this error is a cast error.
    pub fn is_cast_error(&self) -> bool {
        matches!(self, MeasuroError::Cast { .. })
    }
}
