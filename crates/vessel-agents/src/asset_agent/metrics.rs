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

//! Metric handles recorded by the cache.

use vessel_core::asset::AssetKind;
use vessel_telemetry::{
    CounterHandle, GaugeHandle, HistogramHandle, MetricId, MetricsRegistry, MetricsResult,
};

/// A collection of metric handles used by the cache and its loader registry.
#[derive(Debug, Clone)]
pub(crate) struct CacheMetrics {
    pub(crate) loads_started: CounterHandle,
    pub(crate) loads_failed: CounterHandle,
    pub(crate) retries_scheduled: CounterHandle,
    pub(crate) evictions: CounterHandle,
    pub(crate) decode_time_ms: HistogramHandle,
    memory: [GaugeHandle; AssetKind::ALL.len()],
}

impl CacheMetrics {
    pub(crate) fn new(registry: &MetricsRegistry) -> MetricsResult<Self> {
        let gauge = |kind: AssetKind| {
            registry.register_gauge(
                MetricId::new("memory", "current_bytes").with_label("kind", kind.as_str()),
            )
        };
        Ok(Self {
            loads_started: registry.register_counter(MetricId::new("assets", "loads_started"))?,
            loads_failed: registry.register_counter(MetricId::new("assets", "loads_failed"))?,
            retries_scheduled: registry
                .register_counter(MetricId::new("assets", "retries_scheduled"))?,
            evictions: registry.register_counter(MetricId::new("assets", "evictions"))?,
            decode_time_ms: registry.register_histogram(
                MetricId::new("assets", "decode_time"),
                vec![1.0, 5.0, 16.0, 33.0, 100.0, 500.0],
            )?,
            memory: [
                gauge(AssetKind::Image)?,
                gauge(AssetKind::Audio)?,
                gauge(AssetKind::Video)?,
            ],
        })
    }

    pub(crate) fn bump(counter: &CounterHandle) {
        if let Err(e) = counter.increment() {
            log::warn!("Failed to update metric {}: {}", counter.id(), e);
        }
    }

    pub(crate) fn set_memory(&self, kind: AssetKind, bytes: u64) {
        let gauge = &self.memory[kind.index()];
        if let Err(e) = gauge.set(bytes as f64) {
            log::warn!("Failed to update metric {}: {}", gauge.id(), e);
        }
    }
}
