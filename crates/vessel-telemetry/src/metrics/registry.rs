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

//! Registry for managing metrics.

use super::types::{MetricId, MetricType, MetricValue, MetricsError, MetricsResult};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

type Storage = Arc<Mutex<BTreeMap<MetricId, MetricValue>>>;

fn lock(storage: &Storage) -> MetricsResult<MutexGuard<'_, BTreeMap<MetricId, MetricValue>>> {
    storage
        .lock()
        .map_err(|e| MetricsError::StorageError(e.to_string()))
}

/// Central, in-memory registry for metrics.
///
/// Registration hands out typed handles that update the shared storage
/// directly. Handles are cheap to clone and can be kept by any subsystem.
#[derive(Debug, Clone, Default)]
pub struct MetricsRegistry {
    storage: Storage,
}

impl MetricsRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, id: MetricId, initial: MetricValue) -> MetricsResult<()> {
        let mut storage = lock(&self.storage)?;
        if let Some(existing) = storage.get(&id) {
            let found = existing.metric_type();
            let expected = initial.metric_type();
            if found != expected {
                return Err(MetricsError::TypeMismatch { expected, found });
            }
            // Re-registering keeps the accumulated value.
            return Ok(());
        }
        storage.insert(id, initial);
        Ok(())
    }

    /// Registers (or reattaches to) a counter.
    pub fn register_counter(&self, id: MetricId) -> MetricsResult<CounterHandle> {
        self.register(id.clone(), MetricValue::Counter(0))?;
        Ok(CounterHandle {
            id,
            storage: self.storage.clone(),
        })
    }

    /// Registers (or reattaches to) a gauge.
    pub fn register_gauge(&self, id: MetricId) -> MetricsResult<GaugeHandle> {
        self.register(id.clone(), MetricValue::Gauge(0.0))?;
        Ok(GaugeHandle {
            id,
            storage: self.storage.clone(),
        })
    }

    /// Registers (or reattaches to) a histogram with the given bucket bounds.
    pub fn register_histogram(
        &self,
        id: MetricId,
        mut bucket_bounds: Vec<f64>,
    ) -> MetricsResult<HistogramHandle> {
        bucket_bounds.sort_by(f64::total_cmp);
        let bucket_counts = vec![0; bucket_bounds.len() + 1];
        self.register(
            id.clone(),
            MetricValue::Histogram {
                bucket_bounds,
                bucket_counts,
                count: 0,
                sum: 0.0,
            },
        )?;
        Ok(HistogramHandle {
            id,
            storage: self.storage.clone(),
        })
    }

    /// Returns the current value of a metric.
    pub fn get(&self, id: &MetricId) -> MetricsResult<MetricValue> {
        lock(&self.storage)?
            .get(id)
            .cloned()
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))
    }

    /// Returns every metric of a namespace.
    pub fn namespace(&self, namespace: &str) -> Vec<(MetricId, MetricValue)> {
        match lock(&self.storage) {
            Ok(storage) => storage
                .iter()
                .filter(|(id, _)| id.namespace == namespace)
                .map(|(id, value)| (id.clone(), value.clone()))
                .collect(),
            Err(e) => {
                log::warn!("Metrics snapshot failed: {e}");
                Vec::new()
            }
        }
    }

    /// Number of registered metrics.
    pub fn metric_count(&self) -> usize {
        lock(&self.storage).map(|s| s.len()).unwrap_or(0)
    }
}

fn update<T>(
    storage: &Storage,
    id: &MetricId,
    f: impl FnOnce(&mut MetricValue) -> Option<T>,
    expected: MetricType,
) -> MetricsResult<T> {
    let mut storage = lock(storage)?;
    let value = storage
        .get_mut(id)
        .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))?;
    let found = value.metric_type();
    f(value).ok_or(MetricsError::TypeMismatch { expected, found })
}

/// Handle for counter operations.
#[derive(Debug, Clone)]
pub struct CounterHandle {
    id: MetricId,
    storage: Storage,
}

impl CounterHandle {
    /// Increments by one and returns the new total.
    pub fn increment(&self) -> MetricsResult<u64> {
        self.increment_by(1)
    }

    /// Increments by `amount` and returns the new total.
    pub fn increment_by(&self, amount: u64) -> MetricsResult<u64> {
        update(
            &self.storage,
            &self.id,
            |value| match value {
                MetricValue::Counter(total) => {
                    *total += amount;
                    Some(*total)
                }
                _ => None,
            },
            MetricType::Counter,
        )
    }

    /// Current total.
    pub fn get(&self) -> MetricsResult<u64> {
        update(
            &self.storage,
            &self.id,
            |value| match value {
                MetricValue::Counter(total) => Some(*total),
                _ => None,
            },
            MetricType::Counter,
        )
    }

    /// The metric id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Handle for gauge operations.
#[derive(Debug, Clone)]
pub struct GaugeHandle {
    id: MetricId,
    storage: Storage,
}

impl GaugeHandle {
    /// Sets the gauge.
    pub fn set(&self, reading: f64) -> MetricsResult<()> {
        update(
            &self.storage,
            &self.id,
            |value| match value {
                MetricValue::Gauge(current) => {
                    *current = reading;
                    Some(())
                }
                _ => None,
            },
            MetricType::Gauge,
        )
    }

    /// Current reading.
    pub fn get(&self) -> MetricsResult<f64> {
        update(
            &self.storage,
            &self.id,
            |value| match value {
                MetricValue::Gauge(current) => Some(*current),
                _ => None,
            },
            MetricType::Gauge,
        )
    }

    /// The metric id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Handle for histogram operations.
#[derive(Debug, Clone)]
pub struct HistogramHandle {
    id: MetricId,
    storage: Storage,
}

impl HistogramHandle {
    /// Records one sample.
    pub fn observe(&self, sample: f64) -> MetricsResult<()> {
        update(
            &self.storage,
            &self.id,
            |value| match value {
                MetricValue::Histogram {
                    bucket_bounds,
                    bucket_counts,
                    count,
                    sum,
                } => {
                    let bucket = bucket_bounds
                        .iter()
                        .position(|bound| sample <= *bound)
                        .unwrap_or(bucket_bounds.len());
                    bucket_counts[bucket] += 1;
                    *count += 1;
                    *sum += sample;
                    Some(())
                }
                _ => None,
            },
            MetricType::Histogram,
        )
    }

    /// Number of recorded samples.
    pub fn count(&self) -> MetricsResult<u64> {
        update(
            &self.storage,
            &self.id,
            |value| match value {
                MetricValue::Histogram { count, .. } => Some(*count),
                _ => None,
            },
            MetricType::Histogram,
        )
    }

    /// The metric id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}
