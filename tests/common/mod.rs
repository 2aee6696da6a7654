//! Integration test common infrastructure.
//!
//! Provides a recording metrics sink for asserting on counter and gauge
//! traffic emitted through the public API.

use connstate::MetricsSink;
use parking_lot::Mutex;

/// Sink that records every counter and gauge call it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub counts: Mutex<Vec<(String, f64)>>,
    pub gauges: Mutex<Vec<(String, f64)>>,
}

impl RecordingSink {
    /// Sum of all increments recorded for a counter name.
    pub fn count_total(&self, name: &str) -> f64 {
        self.counts
            .lock()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v)
            .sum()
    }

    /// Every value set on a gauge name, in emission order.
    pub fn gauge_values(&self, name: &str) -> Vec<f64> {
        self.gauges
            .lock()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Total number of gauge calls recorded so far.
    pub fn gauge_calls(&self) -> usize {
        self.gauges.lock().len()
    }
}

impl MetricsSink for RecordingSink {
    fn count(&self, name: &str, value: f64) {
        self.counts.lock().push((name.to_string(), value));
    }

    fn gauge(&self, name: &str, value: f64) {
        self.gauges.lock().push((name.to_string(), value));
    }
}
