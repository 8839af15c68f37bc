//! OpenTelemetry observability backend.

use super::port::{
    MetricKind, MetricTags, Observability, ObservabilityError, ObservabilityResult,
    OperationSpan, SpanStatus,
};
use opentelemetry::{
    KeyValue, global,
    global::{BoxedSpan, BoxedTracer},
    metrics::{Counter, Gauge, Histogram, Meter},
    trace::{Span as _, Status, Tracer as _},
};
use opentelemetry_sdk::{Resource, metrics::SdkMeterProvider, trace::SdkTracerProvider};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Service name used when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "taskhub";

const METER_NAME: &str = "taskhub";

#[derive(Default)]
struct Instruments {
    counters: HashMap<String, Counter<f64>>,
    gauges: HashMap<String, Gauge<f64>>,
    histograms: HashMap<String, Histogram<f64>>,
}

/// Backend forwarding spans and metrics to the `opentelemetry` globals.
///
/// Constructing the backend installs its tracer and meter providers as the
/// process-wide globals. Instruments are created lazily and cached by metric
/// name.
pub struct OpenTelemetryObservability {
    service_name: String,
    tracer: BoxedTracer,
    meter: Meter,
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
    instruments: Mutex<Instruments>,
}

impl fmt::Debug for OpenTelemetryObservability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenTelemetryObservability")
            .field("service_name", &self.service_name)
            .finish_non_exhaustive()
    }
}

impl OpenTelemetryObservability {
    /// Creates a backend with exporter-less SDK providers tagged with
    /// `service_name`.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: String = service_name.into();
        let resource = Resource::builder().with_service_name(name.clone()).build();
        let tracer_provider = SdkTracerProvider::builder()
            .with_resource(resource.clone())
            .build();
        let meter_provider = SdkMeterProvider::builder().with_resource(resource).build();
        Self::with_providers(name, tracer_provider, meter_provider)
    }

    /// Creates a backend over caller-configured providers, for example ones
    /// with exporters attached.
    #[must_use]
    pub fn with_providers(
        service_name: impl Into<String>,
        tracer_provider: SdkTracerProvider,
        meter_provider: SdkMeterProvider,
    ) -> Self {
        let name: String = service_name.into();
        global::set_tracer_provider(tracer_provider.clone());
        global::set_meter_provider(meter_provider.clone());
        Self {
            tracer: global::tracer(name.clone()),
            meter: global::meter(METER_NAME),
            service_name: name,
            tracer_provider,
            meter_provider,
            instruments: Mutex::new(Instruments::default()),
        }
    }

    /// Returns the configured service name.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Observability for OpenTelemetryObservability {
    fn span(&self, operation: &str) -> Box<dyn OperationSpan> {
        Box::new(OtelSpan {
            span: self.tracer.start(operation.to_owned()),
        })
    }

    fn record_metric(
        &self,
        kind: MetricKind,
        name: &str,
        value: f64,
        tags: &MetricTags,
    ) -> ObservabilityResult<()> {
        if name.trim().is_empty() {
            return Err(ObservabilityError::InvalidMetricName(name.to_owned()));
        }
        let attributes: Vec<KeyValue> = tags
            .iter()
            .map(|(tag, text)| KeyValue::new(tag.clone(), text.clone()))
            .collect();
        let mut instruments = self
            .instruments
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match kind {
            MetricKind::Counter => instruments
                .counters
                .entry(name.to_owned())
                .or_insert_with(|| self.meter.f64_counter(name.to_owned()).build())
                .add(value, &attributes),
            MetricKind::Gauge => instruments
                .gauges
                .entry(name.to_owned())
                .or_insert_with(|| self.meter.f64_gauge(name.to_owned()).build())
                .record(value, &attributes),
            MetricKind::Histogram => instruments
                .histograms
                .entry(name.to_owned())
                .or_insert_with(|| self.meter.f64_histogram(name.to_owned()).build())
                .record(value, &attributes),
        }
        Ok(())
    }

    fn flush(&self) -> ObservabilityResult<()> {
        self.tracer_provider
            .force_flush()
            .map_err(|err| ObservabilityError::Backend(err.to_string()))?;
        self.meter_provider
            .force_flush()
            .map_err(|err| ObservabilityError::Backend(err.to_string()))
    }
}

struct OtelSpan {
    span: BoxedSpan,
}

impl OperationSpan for OtelSpan {
    fn set_attribute(&mut self, key: &str, value: Value) {
        self.span.set_attribute(to_key_value(key, value));
    }

    fn set_status(&mut self, status: SpanStatus) {
        self.span.set_status(match status {
            SpanStatus::Ok => Status::Ok,
            SpanStatus::Error(message) => Status::error(message),
        });
    }

    fn add_event(&mut self, name: &str, attributes: Map<String, Value>) {
        let converted = attributes
            .into_iter()
            .map(|(key, value)| to_key_value(&key, value))
            .collect();
        self.span.add_event(name.to_owned(), converted);
    }
}

impl Drop for OtelSpan {
    fn drop(&mut self) {
        self.span.end();
    }
}

fn to_key_value(key: &str, value: Value) -> KeyValue {
    let owned = key.to_owned();
    match value {
        Value::Bool(flag) => KeyValue::new(owned, flag),
        Value::Number(number) => number.as_i64().map_or_else(
            || KeyValue::new(owned.clone(), number.as_f64().unwrap_or_default()),
            |integer| KeyValue::new(owned.clone(), integer),
        ),
        Value::String(text) => KeyValue::new(owned, text),
        other => KeyValue::new(owned, other.to_string()),
    }
}
