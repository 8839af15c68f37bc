//! Disabled observability backend.

use super::port::{
    MetricKind, MetricTags, Observability, ObservabilityResult, OperationSpan, SpanStatus,
};
use serde_json::{Map, Value};

/// Span that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSpan;

impl OperationSpan for NoopSpan {
    fn set_attribute(&mut self, _key: &str, _value: Value) {}

    fn set_status(&mut self, _status: SpanStatus) {}

    fn add_event(&mut self, _name: &str, _attributes: Map<String, Value>) {}
}

/// Observability backend that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObservability;

impl Observability for NoopObservability {
    fn span(&self, _operation: &str) -> Box<dyn OperationSpan> {
        Box::new(NoopSpan)
    }

    fn record_metric(
        &self,
        _kind: MetricKind,
        _name: &str,
        _value: f64,
        _tags: &MetricTags,
    ) -> ObservabilityResult<()> {
        Ok(())
    }

    fn flush(&self) -> ObservabilityResult<()> {
        Ok(())
    }
}
