//! In-process Prometheus-style collector.

use super::port::{
    MetricKind, MetricTags, Observability, ObservabilityError, ObservabilityResult,
    OperationSpan, SpanStatus,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::warn;

/// Default histogram bucket upper bounds, in seconds.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

const OPERATIONS_TOTAL: &str = "task_operations_total";
const TASK_DURATION: &str = "task_duration_seconds";

type Labels = Vec<(String, String)>;

#[derive(Debug, Clone)]
enum Series {
    Counter(f64),
    Gauge(f64),
    Histogram {
        buckets: Vec<u64>,
        sum: f64,
        count: u64,
    },
}

impl Series {
    fn empty(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counter => Self::Counter(0.0),
            MetricKind::Gauge => Self::Gauge(0.0),
            MetricKind::Histogram => Self::Histogram {
                buckets: vec![0; DEFAULT_BUCKETS.len()],
                sum: 0.0,
                count: 0,
            },
        }
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "counters and histogram sums accumulate observed values"
    )]
    fn observe(&mut self, value: f64) {
        match self {
            Self::Counter(total) => *total += value,
            Self::Gauge(last) => *last = value,
            Self::Histogram {
                buckets,
                sum,
                count,
            } => {
                for (bucket, bound) in buckets.iter_mut().zip(DEFAULT_BUCKETS) {
                    if value <= bound {
                        *bucket += 1;
                    }
                }
                *sum += value;
                *count += 1;
            }
        }
    }
}

#[derive(Debug)]
struct Family {
    kind: MetricKind,
    help: String,
    series: BTreeMap<Labels, Series>,
}

#[derive(Debug, Default)]
struct Registry {
    families: BTreeMap<String, Family>,
}

impl Registry {
    fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.register(OPERATIONS_TOTAL, MetricKind::Counter, "Total task operations");
        registry.register(TASK_DURATION, MetricKind::Histogram, "Task duration in seconds");
        registry
    }

    fn register(&mut self, name: &str, kind: MetricKind, help: &str) {
        self.families.entry(name.to_owned()).or_insert_with(|| Family {
            kind,
            help: help.to_owned(),
            series: BTreeMap::new(),
        });
    }

    fn observe(
        &mut self,
        name: &str,
        kind: MetricKind,
        value: f64,
        labels: Labels,
        help: &str,
    ) -> ObservabilityResult<()> {
        self.register(name, kind, help);
        let family = self
            .families
            .get_mut(name)
            .ok_or_else(|| ObservabilityError::InvalidMetricName(name.to_owned()))?;
        if family.kind != kind {
            return Err(ObservabilityError::KindMismatch {
                name: name.to_owned(),
                registered: family.kind,
                requested: kind,
            });
        }
        family
            .series
            .entry(labels)
            .or_insert_with(|| Series::empty(kind))
            .observe(value);
        Ok(())
    }

    fn render(&self) -> String {
        let mut output = String::new();
        for (name, family) in &self.families {
            output.push_str(&format!("# HELP {name} {}\n", family.help));
            output.push_str(&format!("# TYPE {name} {}\n", family.kind));
            for (labels, series) in &family.series {
                match series {
                    Series::Counter(value) | Series::Gauge(value) => {
                        output.push_str(&format!("{name}{} {value}\n", render_labels(labels, None)));
                    }
                    Series::Histogram {
                        buckets,
                        sum,
                        count,
                    } => {
                        for (bucket, bound) in buckets.iter().zip(DEFAULT_BUCKETS) {
                            let le = bound.to_string();
                            output.push_str(&format!(
                                "{name}_bucket{} {bucket}\n",
                                render_labels(labels, Some(&le))
                            ));
                        }
                        output.push_str(&format!(
                            "{name}_bucket{} {count}\n",
                            render_labels(labels, Some("+Inf"))
                        ));
                        let plain = render_labels(labels, None);
                        output.push_str(&format!("{name}_sum{plain} {sum}\n"));
                        output.push_str(&format!("{name}_count{plain} {count}\n"));
                    }
                }
            }
        }
        output
    }
}

/// Collector backend exposing metrics in Prometheus text format.
///
/// Metric names are normalised by replacing every character outside
/// `[A-Za-z0-9_:]` with `_`. Spans count `task_operations_total` by
/// operation and outcome; operations named `task.*` also observe a
/// `<operation>_duration_seconds` histogram.
#[derive(Debug, Clone)]
pub struct PrometheusObservability {
    registry: Arc<Mutex<Registry>>,
}

impl Default for PrometheusObservability {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::with_defaults())),
        }
    }
}

impl PrometheusObservability {
    /// Creates a collector with the default task metric families.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders every metric family in text exposition format.
    #[must_use]
    pub fn render(&self) -> String {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .render()
    }
}

impl Observability for PrometheusObservability {
    fn span(&self, operation: &str) -> Box<dyn OperationSpan> {
        Box::new(PrometheusSpan {
            operation: operation.to_owned(),
            started: Instant::now(),
            status: SpanStatus::Ok,
            registry: Arc::clone(&self.registry),
        })
    }

    fn record_metric(
        &self,
        kind: MetricKind,
        name: &str,
        value: f64,
        tags: &MetricTags,
    ) -> ObservabilityResult<()> {
        let metric_name = normalise_name(name)?;
        let labels = tags
            .iter()
            .map(|(key, label)| (key.clone(), label.clone()))
            .collect();
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .observe(&metric_name, kind, value, labels, &format!("Metric: {name}"))
    }

    fn flush(&self) -> ObservabilityResult<()> {
        Ok(())
    }
}

struct PrometheusSpan {
    operation: String,
    started: Instant,
    status: SpanStatus,
    registry: Arc<Mutex<Registry>>,
}

impl PrometheusSpan {
    fn finish(&self) -> ObservabilityResult<()> {
        let outcome = if self.status.is_ok() { "success" } else { "error" };
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.observe(
            OPERATIONS_TOTAL,
            MetricKind::Counter,
            1.0,
            vec![
                ("operation".to_owned(), self.operation.clone()),
                ("status".to_owned(), outcome.to_owned()),
            ],
            "Total task operations",
        )?;
        if self.operation.starts_with("task.") {
            let name = format!("{}_duration_seconds", normalise_name(&self.operation)?);
            registry.observe(
                &name,
                MetricKind::Histogram,
                self.started.elapsed().as_secs_f64(),
                Vec::new(),
                &format!("Duration of {}", self.operation),
            )?;
        }
        Ok(())
    }
}

impl OperationSpan for PrometheusSpan {
    fn set_attribute(&mut self, _key: &str, _value: Value) {}

    fn set_status(&mut self, status: SpanStatus) {
        self.status = status;
    }

    fn add_event(&mut self, _name: &str, _attributes: Map<String, Value>) {}
}

impl Drop for PrometheusSpan {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            warn!(operation = %self.operation, error = %err, "failed to record span metrics");
        }
    }
}

fn normalise_name(name: &str) -> ObservabilityResult<String> {
    let normalised: String = name
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == ':' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    match normalised.chars().next() {
        None => Err(ObservabilityError::InvalidMetricName(name.to_owned())),
        Some(first) if first.is_ascii_digit() => Ok(format!("_{normalised}")),
        Some(_) => Ok(normalised),
    }
}

fn render_labels(labels: &Labels, le: Option<&str>) -> String {
    let mut pairs: Vec<String> = labels
        .iter()
        .map(|(key, value)| format!("{key}=\"{}\"", escape_label(value)))
        .collect();
    if let Some(bound) = le {
        pairs.push(format!("le=\"{bound}\""));
    }
    if pairs.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", pairs.join(","))
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
