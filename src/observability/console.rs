//! Console observability backend reporting through `tracing`.

use super::port::{
    MetricKind, MetricTags, Observability, ObservabilityError, ObservabilityResult,
    OperationSpan, SpanStatus,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info};

/// Aggregated value of one metric series.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricAggregate {
    /// Running sum of counter increments.
    Counter(f64),
    /// Last recorded gauge value.
    Gauge(f64),
    /// Every histogram observation in arrival order.
    Histogram(Vec<f64>),
}

impl MetricAggregate {
    const fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Gauge(_) => MetricKind::Gauge,
            Self::Histogram(_) => MetricKind::Histogram,
        }
    }
}

type Aggregates = Arc<Mutex<BTreeMap<String, MetricAggregate>>>;

/// Development backend logging span outcomes and metrics.
///
/// Series are keyed by `name:{tags as JSON}`. When `verbose` is false,
/// aggregation still happens but nothing is logged.
#[derive(Debug, Clone, Default)]
pub struct ConsoleObservability {
    verbose: bool,
    metrics: Aggregates,
}

impl ConsoleObservability {
    /// Creates a console backend.
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            metrics: Aggregates::default(),
        }
    }

    /// Returns a copy of every aggregated series.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, MetricAggregate> {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn series_key(name: &str, tags: &MetricTags) -> String {
        let encoded = serde_json::to_string(tags).unwrap_or_default();
        format!("{name}:{encoded}")
    }
}

impl Observability for ConsoleObservability {
    fn span(&self, operation: &str) -> Box<dyn OperationSpan> {
        Box::new(ConsoleSpan {
            operation: operation.to_owned(),
            verbose: self.verbose,
            started: Instant::now(),
            attributes: Map::new(),
            status: SpanStatus::Ok,
        })
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "counter series accumulate fractional increments"
    )]
    fn record_metric(
        &self,
        kind: MetricKind,
        name: &str,
        value: f64,
        tags: &MetricTags,
    ) -> ObservabilityResult<()> {
        let key = Self::series_key(name, tags);
        {
            let mut metrics = self.metrics.lock().unwrap_or_else(PoisonError::into_inner);
            match metrics.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(match kind {
                        MetricKind::Counter => MetricAggregate::Counter(value),
                        MetricKind::Gauge => MetricAggregate::Gauge(value),
                        MetricKind::Histogram => MetricAggregate::Histogram(vec![value]),
                    });
                }
                Entry::Occupied(mut slot) => match (kind, slot.get_mut()) {
                    (MetricKind::Counter, MetricAggregate::Counter(sum)) => *sum += value,
                    (MetricKind::Gauge, MetricAggregate::Gauge(last)) => *last = value,
                    (MetricKind::Histogram, MetricAggregate::Histogram(samples)) => {
                        samples.push(value);
                    }
                    (_, existing) => {
                        return Err(ObservabilityError::KindMismatch {
                            name: name.to_owned(),
                            registered: existing.kind(),
                            requested: kind,
                        });
                    }
                },
            }
        }
        if self.verbose {
            info!(metric = name, value, kind = %kind, tags = ?tags, "[APM] metric");
        }
        Ok(())
    }

    fn flush(&self) -> ObservabilityResult<()> {
        if !self.verbose {
            return Ok(());
        }
        let metrics = self.snapshot();
        if metrics.is_empty() {
            return Ok(());
        }
        info!("[APM] metrics summary");
        for (key, aggregate) in &metrics {
            match aggregate {
                MetricAggregate::Counter(value) | MetricAggregate::Gauge(value) => {
                    info!(series = %key, value, "[APM] metric total");
                }
                MetricAggregate::Histogram(samples) => {
                    info!(series = %key, samples = ?samples, "[APM] metric samples");
                }
            }
        }
        Ok(())
    }
}

struct ConsoleSpan {
    operation: String,
    verbose: bool,
    started: Instant,
    attributes: Map<String, Value>,
    status: SpanStatus,
}

impl OperationSpan for ConsoleSpan {
    fn set_attribute(&mut self, key: &str, value: Value) {
        self.attributes.insert(key.to_owned(), value);
    }

    fn set_status(&mut self, status: SpanStatus) {
        self.status = status;
    }

    fn add_event(&mut self, name: &str, attributes: Map<String, Value>) {
        if self.verbose {
            debug!(operation = %self.operation, event = name, attributes = ?attributes, "[APM] event");
        }
    }
}

impl Drop for ConsoleSpan {
    fn drop(&mut self) {
        if !self.verbose {
            return;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        match &self.status {
            SpanStatus::Ok => info!("[APM] ✓ {} ({elapsed:.3}s)", self.operation),
            SpanStatus::Error(message) => {
                info!(error = %message, "[APM] ✗ {} ({elapsed:.3}s)", self.operation);
            }
        }
        if !self.attributes.is_empty() {
            let attributes = serde_json::Value::Object(self.attributes.clone());
            debug!(attributes = %attributes, "[APM] span attributes");
        }
    }
}
