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

//! The per-record attribute rows stored by the [`RecordStore`](crate::RecordStore).

use std::time::Duration;
use vessel_core::asset::{AssetKind, ResourceRef};
use vessel_core::callback::AssetCallback;
use vessel_core::fetch::FetchTicket;
use vessel_core::manifest::AssetSettings;
use vessel_core::status::{AssetStatus, LoadResultKind};

use crate::pool::ListPool;

/// Immutable description of a record, fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetMetaInfo {
    /// The address the record was requested with.
    pub address: String,
    /// FNV-1a hash of `address`.
    pub address_hash: u32,
    /// The address handed to the transport.
    pub fetch_address: String,
    /// Kind of the asset.
    pub kind: AssetKind,
    /// Declared subtype, empty when unknown.
    pub subkind: String,
    /// Size declared by the manifest, `0` when unknown.
    pub declared_size: u64,
    /// Settings the loader applies.
    pub settings: AssetSettings,
}

/// Mutable state of a record.
#[derive(Debug, Clone, Default)]
pub struct AssetStateInfo {
    /// Number of outstanding requests.
    pub ref_count: u32,
    /// Lifecycle flags.
    pub status: AssetStatus,
    /// Clock time of the last request or release.
    pub last_access: Duration,
    /// Footprint of the bound resource.
    pub byte_size: u64,
    /// The bound resource, present while `LOADED`.
    pub resource: Option<ResourceRef>,
    /// Outcome of the most recent load attempt.
    pub last_result: Option<LoadResultKind>,
}

/// In-flight fetch bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetLoadInfo {
    /// The outstanding fetch, if any.
    pub ticket: Option<FetchTicket>,
    /// Transport failures retried so far.
    pub retry_count: u32,
}

/// Subscribers of a record: one inline slot plus a pooled overflow list.
#[derive(Debug, Clone, Default)]
pub struct AssetCallbackInfo {
    inline: Option<AssetCallback>,
    overflow: Option<Vec<AssetCallback>>,
}

impl AssetCallbackInfo {
    /// Adds a subscriber, spilling into a pooled list once the inline slot is taken.
    pub fn subscribe(&mut self, callback: AssetCallback, pool: &mut ListPool<AssetCallback>) {
        if self.inline.is_none() {
            self.inline = Some(callback);
            return;
        }
        self.overflow
            .get_or_insert_with(|| pool.acquire())
            .push(callback);
    }

    /// Removes one occurrence of `callback`. The overflow list uses
    /// swap-remove, so order among overflow subscribers is not preserved.
    pub fn unsubscribe(
        &mut self,
        callback: &AssetCallback,
        pool: &mut ListPool<AssetCallback>,
    ) -> bool {
        if self.inline.as_ref() == Some(callback) {
            self.inline = None;
            return true;
        }
        let Some(list) = self.overflow.as_mut() else {
            return false;
        };
        let Some(position) = list.iter().position(|c| c == callback) else {
            return false;
        };
        list.swap_remove(position);
        if list.is_empty() {
            if let Some(list) = self.overflow.take() {
                pool.release(list);
            }
        }
        true
    }

    /// Visits every subscriber: the inline slot first, then the overflow list.
    pub fn iter(&self) -> impl Iterator<Item = &AssetCallback> {
        self.inline
            .iter()
            .chain(self.overflow.iter().flat_map(|list| list.iter()))
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.inline.iter().count() + self.overflow.as_ref().map_or(0, Vec::len)
    }

    /// Returns `true` when nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every subscriber, handing the overflow list back to the pool.
    pub fn clear(&mut self, pool: &mut ListPool<AssetCallback>) {
        self.inline = None;
        if let Some(list) = self.overflow.take() {
            pool.release(list);
        }
    }
}
