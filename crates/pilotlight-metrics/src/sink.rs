//! The sample type and sink implementations.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

/// Unit attached to a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    None,
    Seconds,
    Percent,
    Count,
}

impl Unit {
    fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Seconds => "seconds",
            Self::Percent => "percent",
            Self::Count => "count",
        }
    }
}

/// A single named, dimensioned, timestamped numeric sample.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: &'static str,
    pub value: f64,
    pub unit: Unit,
    pub dimensions: Vec<(String, String)>,
    /// Unix timestamp (seconds) at which the sample was taken.
    pub timestamp: u64,
}

impl MetricSample {
    /// A sample taken now, with no unit and no dimensions.
    pub fn new(name: &'static str, value: f64) -> Self {
        Self {
            name,
            value,
            unit: Unit::None,
            dimensions: Vec::new(),
            timestamp: epoch_secs(),
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_dimension(mut self, key: &str, value: &str) -> Self {
        self.dimensions.push((key.to_string(), value.to_string()));
        self
    }
}

/// Sink for metric samples. Implementations must be cheap and must
/// never fail the caller.
pub trait MetricsSink: Send + Sync {
    fn record(&self, sample: MetricSample);
}

/// Renders samples as structured log events.
pub struct LogSink;

impl MetricsSink for LogSink {
    fn record(&self, sample: MetricSample) {
        info!(
            target: "pilotlight::metrics",
            metric = sample.name,
            value = sample.value,
            unit = sample.unit.as_str(),
            dimensions = ?sample.dimensions,
            "metric sample"
        );
    }
}

/// Captures samples in memory for test assertions.
#[derive(Default)]
pub struct MemorySink {
    samples: Mutex<Vec<MetricSample>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured samples, in recording order.
    pub fn samples(&self) -> Vec<MetricSample> {
        self.samples.lock().unwrap().clone()
    }

    /// Captured samples with the given name.
    pub fn named(&self, name: &str) -> Vec<MetricSample> {
        self.samples
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect()
    }

    /// The most recent value recorded under `name`, if any.
    pub fn last_value(&self, name: &str) -> Option<f64> {
        self.samples
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.name == name)
            .map(|s| s.value)
    }
}

impl MetricsSink for MemorySink {
    fn record(&self, sample: MetricSample) {
        self.samples.lock().unwrap().push(sample);
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
