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

//! Tunables of the cache service.

use crate::asset::AssetKind;
use crate::error::{CacheError, CacheResult};
use crate::event::DEFAULT_EVENT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What happens when a record's reference count drops to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePolicy {
    /// Push the record onto the unload queue right away.
    #[default]
    Immediate,
    /// Keep the record resident; it is reclaimed by budget eviction or an
    /// explicit `unload_unused_async`.
    Retain,
}

/// Configuration of an `AssetCache`.
///
/// Every field has a default, so a JSON document only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Loads dispatched per tick.
    pub max_loads_per_frame: usize,
    /// Records unloaded from the unload queue per tick.
    pub max_unloads_per_frame: usize,
    /// Fetches allowed in flight at once.
    pub max_in_flight: usize,
    /// Transport failures retried before a record ends in `ERROR`.
    pub retry_limit: u32,
    /// Delay before the first retry, in milliseconds.
    pub retry_base_delay_ms: u64,
    /// Extra delay added per previous retry, in milliseconds.
    pub retry_delay_increment_ms: u64,
    /// Root relative addresses are resolved against.
    pub streaming_root: PathBuf,
    /// Behaviour when the last reference is released.
    pub release_policy: ReleasePolicy,
    /// Optional memory budget per kind, in bytes.
    pub budgets: BTreeMap<AssetKind, u64>,
    /// Reusable video decoder instances.
    pub video_decoder_pool: usize,
    /// Worker threads of the threaded transport.
    pub transport_workers: usize,
    /// Unread events kept by the event channel before the oldest are dropped.
    pub event_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_loads_per_frame: 4,
            max_unloads_per_frame: 8,
            max_in_flight: 16,
            retry_limit: 10,
            retry_base_delay_ms: 1000,
            retry_delay_increment_ms: 1000,
            streaming_root: PathBuf::from("StreamingAssets"),
            release_policy: ReleasePolicy::Immediate,
            budgets: BTreeMap::new(),
            video_decoder_pool: 4,
            transport_workers: 4,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// Parses a configuration from JSON text.
    pub fn from_json_str(json: &str) -> CacheResult<Self> {
        serde_json::from_str(json).map_err(CacheError::Config)
    }

    /// Reads and parses a configuration file.
    pub fn load(path: impl AsRef<Path>) -> CacheResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Delay before a retry, given how many retries already happened.
    ///
    /// Grows linearly: `base + retry_count * increment`.
    pub fn retry_delay(&self, retry_count: u32) -> Duration {
        Duration::from_millis(
            self.retry_base_delay_ms
                .saturating_add(self.retry_delay_increment_ms.saturating_mul(retry_count as u64)),
        )
    }

    /// The configured budget of a kind.
    pub fn budget(&self, kind: AssetKind) -> Option<u64> {
        self.budgets.get(&kind).copied()
    }

    /// Sets a budget, builder style.
    pub fn with_budget(mut self, kind: AssetKind, bytes: u64) -> Self {
        self.budgets.insert(kind, bytes);
        self
    }
}
