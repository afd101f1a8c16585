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

//! A registry of type loader lanes keyed by asset kind.

use super::metrics::CacheMetrics;
use std::collections::HashMap;
use vessel_core::asset::{AssetKind, LoadedResource, ResourceRef};
use vessel_core::error::FetchError;
use vessel_lanes::{FetchRequest, TypeLoaderLane};
use vessel_telemetry::ScopedMetricTimer;

/// The loaders the cache dispatches to.
#[derive(Default)]
pub(crate) struct LoaderLaneRegistry {
    lanes: HashMap<AssetKind, Box<dyn TypeLoaderLane>>,
}

impl LoaderLaneRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a lane under its kind, returning the lane it replaced.
    pub(crate) fn register(
        &mut self,
        lane: Box<dyn TypeLoaderLane>,
    ) -> Option<Box<dyn TypeLoaderLane>> {
        let kind = lane.kind();
        log::debug!("Registering {} for {} assets", lane.strategy_name(), kind);
        self.lanes.insert(kind, lane)
    }

    pub(crate) fn contains(&self, kind: AssetKind) -> bool {
        self.lanes.contains_key(&kind)
    }

    pub(crate) fn get_mut(&mut self, kind: AssetKind) -> Option<&mut (dyn TypeLoaderLane + 'static)> {
        self.lanes.get_mut(&kind).map(|lane| lane.as_mut())
    }

    /// Decodes fetched bytes through the lane of `kind`, timing the decode.
    pub(crate) fn decode(
        &mut self,
        kind: AssetKind,
        request: &FetchRequest<'_>,
        bytes: Vec<u8>,
        metrics: Option<&CacheMetrics>,
    ) -> Result<LoadedResource, FetchError> {
        let lane = self
            .get_mut(kind)
            .ok_or_else(|| FetchError::Unknown(format!("no loader registered for {kind}")))?;
        let _timer = metrics.map(|m| ScopedMetricTimer::new(&m.decode_time_ms));
        lane.on_fetch_complete(request, bytes)
    }

    /// Hands a resource back to the lane that produced it.
    pub(crate) fn release(&mut self, kind: AssetKind, resource: &ResourceRef) {
        if let Some(lane) = self.get_mut(kind) {
            lane.release(resource);
        }
    }
}
