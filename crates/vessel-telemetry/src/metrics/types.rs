// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Metric identifiers, values and errors.

use std::fmt::{self, Display};
use thiserror::Error;

/// A structured identifier for a metric: `namespace:name[k=v,...]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricId {
    /// The broad category of the metric (e.g. "assets", "memory").
    pub namespace: String,
    /// The specific name of the metric (e.g. "loads_started").
    pub name: String,
    /// Key-value labels, kept sorted by key.
    pub labels: Vec<(String, String)>,
}

impl MetricId {
    /// Creates an unlabelled id.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            labels: Vec::new(),
        }
    }

    /// Adds a label, keeping labels sorted by key.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self.labels.sort_by(|a, b| a.0.cmp(&b.0));
        self
    }
}

impl Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)?;
        if !self.labels.is_empty() {
            let labels = self
                .labels
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(",");
            write!(f, "[{labels}]")?;
        }
        Ok(())
    }
}

/// The fundamental type of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    /// Only ever increases.
    Counter,
    /// Goes up and down.
    Gauge,
    /// Distribution of samples.
    Histogram,
}

/// The current value of a metric.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// Counter total.
    Counter(u64),
    /// Gauge reading.
    Gauge(f64),
    /// Histogram summary.
    Histogram {
        /// Upper bounds of the buckets.
        bucket_bounds: Vec<f64>,
        /// Samples per bucket; the last slot counts samples above every bound.
        bucket_counts: Vec<u64>,
        /// Number of samples.
        count: u64,
        /// Sum of samples.
        sum: f64,
    },
}

impl MetricValue {
    /// The type of this value.
    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricValue::Counter(_) => MetricType::Counter,
            MetricValue::Gauge(_) => MetricType::Gauge,
            MetricValue::Histogram { .. } => MetricType::Histogram,
        }
    }
}

/// A specialized `Result` type for metric operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// An error raised by the metrics registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    /// No metric is registered under the id.
    #[error("metric not found: {0}")]
    MetricNotFound(MetricId),
    /// The metric exists with another type.
    #[error("type mismatch: expected {expected:?}, found {found:?}")]
    TypeMismatch {
        /// The type the operation needs.
        expected: MetricType,
        /// The registered type.
        found: MetricType,
    },
    /// The storage lock was poisoned by a panicking writer.
    #[error("metric storage unavailable: {0}")]
    StorageError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_sorted_and_displayed() {
        let id = MetricId::new("memory", "current_bytes")
            .with_label("kind", "image")
            .with_label("backend", "ram");
        assert_eq!(id.to_string(), "memory:current_bytes[backend=ram,kind=image]");
    }
}
