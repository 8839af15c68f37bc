//! Observability port.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Metric tags, ordered by key.
pub type MetricTags = BTreeMap<String, String>;

/// Result type for observability operations.
pub type ObservabilityResult<T> = Result<T, ObservabilityError>;

/// Metric instrument kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Monotonic sum.
    Counter,
    /// Last observed value.
    Gauge,
    /// Distribution of observations.
    Histogram,
}

impl MetricKind {
    /// Returns the lowercase instrument name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome attached to a span.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SpanStatus {
    /// The operation succeeded.
    #[default]
    Ok,
    /// The operation failed with a description.
    Error(String),
}

impl SpanStatus {
    /// Returns `true` for [`SpanStatus::Ok`].
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Errors raised by observability backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObservabilityError {
    /// The metric name is empty after normalisation.
    #[error("invalid metric name: '{0}'")]
    InvalidMetricName(String),
    /// The metric was already registered with another instrument kind.
    #[error("metric {name} is a {registered}, not a {requested}")]
    KindMismatch {
        /// Normalised metric name.
        name: String,
        /// Kind the metric was first recorded as.
        registered: MetricKind,
        /// Kind requested by the caller.
        requested: MetricKind,
    },
    /// The backend failed to export or flush.
    #[error("observability backend failed: {0}")]
    Backend(String),
}

/// Scoped handle for one traced operation.
///
/// The span ends when dropped; its status defaults to [`SpanStatus::Ok`].
pub trait OperationSpan: Send {
    /// Attaches an attribute.
    fn set_attribute(&mut self, key: &str, value: Value);

    /// Sets the outcome reported when the span ends.
    fn set_status(&mut self, status: SpanStatus);

    /// Records a timestamped event inside the span.
    fn add_event(&mut self, name: &str, attributes: Map<String, Value>);
}

/// Tracing and metrics facade consumed by the task service.
pub trait Observability: Send + Sync {
    /// Starts a span for `operation`.
    fn span(&self, operation: &str) -> Box<dyn OperationSpan>;

    /// Records one metric observation.
    ///
    /// # Errors
    ///
    /// Returns [`ObservabilityError`] when the backend rejects the metric.
    fn record_metric(
        &self,
        kind: MetricKind,
        name: &str,
        value: f64,
        tags: &MetricTags,
    ) -> ObservabilityResult<()>;

    /// Flushes pending telemetry.
    ///
    /// # Errors
    ///
    /// Returns [`ObservabilityError::Backend`] when the export fails.
    fn flush(&self) -> ObservabilityResult<()>;
}
