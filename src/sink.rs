//! Metrics sink boundary.
//!
//! The tracker pushes all metrics through [`MetricsSink`], keeping the
//! backend swappable: [`PrometheusSink`] for production, [`NoopSink`] when no
//! backend is wired, or a recording stub in tests. Sink calls are
//! fire-and-forget from the tracker's point of view; a failing backend must
//! never disturb connection handling, so implementations log and swallow
//! their own errors.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use prometheus::{Counter, Encoder, Gauge, Registry, TextEncoder};

/// A backend accepting named counter increments and named gauge values.
pub trait MetricsSink: Send + Sync {
    /// Increment the named counter by `value`.
    fn count(&self, name: &str, value: f64);

    /// Set the named gauge to `value`.
    fn gauge(&self, name: &str, value: f64);
}

/// Sink that discards every metric.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn count(&self, _name: &str, _value: f64) {}

    fn gauge(&self, _name: &str, _value: f64) {}
}

/// Prometheus-backed sink.
///
/// Counters and gauges are registered lazily, one per distinct metric name.
/// Dotted statsd-style names are rewritten to the Prometheus charset
/// (`http.server.connstate.new` becomes `http_server_connstate_new`); the
/// original name is kept as the help text.
pub struct PrometheusSink {
    registry: Registry,
    counters: DashMap<String, Counter>,
    gauges: DashMap<String, Gauge>,
}

impl PrometheusSink {
    /// Build a sink with its own private registry.
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Build a sink on an existing registry, e.g. one shared with other
    /// collectors.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            counters: DashMap::new(),
            gauges: DashMap::new(),
        }
    }

    /// Gather all metrics and encode them in Prometheus text format.
    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!(error = %e, "Failed to encode Prometheus metrics");
            return String::new();
        }
        match String::from_utf8(buffer) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
                String::new()
            }
        }
    }
}

impl Default for PrometheusSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for PrometheusSink {
    fn count(&self, name: &str, value: f64) {
        if value < 0.0 {
            tracing::warn!(metric = name, value, "Dropping negative counter increment");
            return;
        }
        match self.counters.entry(name.to_string()) {
            Entry::Occupied(entry) => entry.get().inc_by(value),
            Entry::Vacant(slot) => match Counter::new(metric_name(name), name.to_string()) {
                Ok(counter) => {
                    if let Err(e) = self.registry.register(Box::new(counter.clone())) {
                        tracing::warn!(metric = name, error = %e, "Failed to register counter");
                    }
                    counter.inc_by(value);
                    slot.insert(counter);
                }
                Err(e) => {
                    tracing::warn!(metric = name, error = %e, "Invalid counter name");
                }
            },
        }
    }

    fn gauge(&self, name: &str, value: f64) {
        match self.gauges.entry(name.to_string()) {
            Entry::Occupied(entry) => entry.get().set(value),
            Entry::Vacant(slot) => match Gauge::new(metric_name(name), name.to_string()) {
                Ok(gauge) => {
                    if let Err(e) = self.registry.register(Box::new(gauge.clone())) {
                        tracing::warn!(metric = name, error = %e, "Failed to register gauge");
                    }
                    gauge.set(value);
                    slot.insert(gauge);
                }
                Err(e) => {
                    tracing::warn!(metric = name, error = %e, "Invalid gauge name");
                }
            },
        }
    }
}

/// Rewrite a metric name to the `[a-zA-Z0-9_:]` charset Prometheus accepts.
fn metric_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Sink that records every call, for assertions in unit tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    pub counts: parking_lot::Mutex<Vec<(String, f64)>>,
    pub gauges: parking_lot::Mutex<Vec<(String, f64)>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn count_total(&self, name: &str) -> f64 {
        self.counts
            .lock()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v)
            .sum()
    }

    pub fn gauge_values(&self, name: &str) -> Vec<f64> {
        self.gauges
            .lock()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| *v)
            .collect()
    }
}

#[cfg(test)]
impl MetricsSink for RecordingSink {
    fn count(&self, name: &str, value: f64) {
        self.counts.lock().push((name.to_string(), value));
    }

    fn gauge(&self, name: &str, value: f64) {
        self.gauges.lock().push((name.to_string(), value));
    }
}
