//! Operation tracing and metric recording.
//!
//! [`Observability`] is the port consumed by the task service. Backends:
//!
//! - [`NoopObservability`]: discards everything
//! - [`ConsoleObservability`]: reports through `tracing` and keeps an
//!   in-memory aggregate
//! - [`OpenTelemetryObservability`]: forwards to the `opentelemetry` global
//!   tracer and meter
//! - [`PrometheusObservability`]: in-process collector rendering the text
//!   exposition format

mod console;
mod noop;
mod otel;
mod port;
mod prometheus;

pub use console::{ConsoleObservability, MetricAggregate};
pub use noop::{NoopObservability, NoopSpan};
pub use otel::{DEFAULT_SERVICE_NAME, OpenTelemetryObservability};
pub use port::{
    MetricKind, MetricTags, Observability, ObservabilityError, ObservabilityResult,
    OperationSpan, SpanStatus,
};
pub use prometheus::{DEFAULT_BUCKETS, PrometheusObservability};
