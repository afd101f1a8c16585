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

//! Structure-of-arrays storage for cache records.

use crate::pool::ListPool;
use crate::records::{AssetCallbackInfo, AssetLoadInfo, AssetMetaInfo, AssetStateInfo};
use crate::slot::SlotAllocator;
use vessel_core::callback::AssetCallback;
use vessel_core::handle::AssetHandle;

/// Parallel attribute tables indexed by slot.
///
/// Every accessor validates the handle first: stale or empty handles read as
/// absent instead of reaching another record's rows. Growth pushes a row to
/// every table together, and freeing a slot resets all of its rows.
#[derive(Debug, Default)]
pub struct RecordStore {
    slots: SlotAllocator,
    meta: Vec<Option<AssetMetaInfo>>,
    state: Vec<AssetStateInfo>,
    load: Vec<AssetLoadInfo>,
    callbacks: Vec<AssetCallbackInfo>,
    callback_pool: ListPool<AssetCallback>,
}

impl RecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a record and fills its meta row. State, load and callback rows
    /// start zeroed.
    pub fn alloc(&mut self, meta: AssetMetaInfo) -> Option<AssetHandle> {
        let handle = self.slots.alloc()?;
        let index = handle.index() as usize;
        if index == self.meta.len() {
            self.meta.push(None);
            self.state.push(AssetStateInfo::default());
            self.load.push(AssetLoadInfo::default());
            self.callbacks.push(AssetCallbackInfo::default());
        }
        self.meta[index] = Some(meta);
        Some(handle)
    }

    /// Frees a record and clears its rows. Returns `false` for invalid handles.
    ///
    /// The bound resource is dropped with the state row; releasing it through
    /// its loader is the caller's job and must happen first.
    pub fn free(&mut self, handle: AssetHandle) -> bool {
        if !self.slots.free(handle) {
            return false;
        }
        let index = handle.index() as usize;
        self.meta[index] = None;
        self.state[index] = AssetStateInfo::default();
        self.load[index] = AssetLoadInfo::default();
        self.callbacks[index].clear(&mut self.callback_pool);
        true
    }

    /// Liveness and generation check.
    pub fn is_valid(&self, handle: AssetHandle) -> bool {
        self.slots.is_valid(handle)
    }

    /// The immutable meta row.
    pub fn meta(&self, handle: AssetHandle) -> Option<&AssetMetaInfo> {
        if !self.is_valid(handle) {
            return None;
        }
        self.meta[handle.index() as usize].as_ref()
    }

    /// The state row.
    pub fn state(&self, handle: AssetHandle) -> Option<&AssetStateInfo> {
        self.is_valid(handle)
            .then(|| &self.state[handle.index() as usize])
    }

    /// The state row, mutably.
    pub fn state_mut(&mut self, handle: AssetHandle) -> Option<&mut AssetStateInfo> {
        if !self.is_valid(handle) {
            return None;
        }
        Some(&mut self.state[handle.index() as usize])
    }

    /// The load row.
    pub fn load(&self, handle: AssetHandle) -> Option<&AssetLoadInfo> {
        self.is_valid(handle)
            .then(|| &self.load[handle.index() as usize])
    }

    /// The load row, mutably.
    pub fn load_mut(&mut self, handle: AssetHandle) -> Option<&mut AssetLoadInfo> {
        if !self.is_valid(handle) {
            return None;
        }
        Some(&mut self.load[handle.index() as usize])
    }

    /// The subscriber row.
    pub fn callbacks(&self, handle: AssetHandle) -> Option<&AssetCallbackInfo> {
        self.is_valid(handle)
            .then(|| &self.callbacks[handle.index() as usize])
    }

    /// Adds a subscriber. Returns `false` for invalid handles.
    pub fn subscribe(&mut self, handle: AssetHandle, callback: AssetCallback) -> bool {
        if !self.is_valid(handle) {
            return false;
        }
        self.callbacks[handle.index() as usize].subscribe(callback, &mut self.callback_pool);
        true
    }

    /// Removes a subscriber. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, handle: AssetHandle, callback: &AssetCallback) -> bool {
        if !self.is_valid(handle) {
            return false;
        }
        self.callbacks[handle.index() as usize].unsubscribe(callback, &mut self.callback_pool)
    }

    /// Handles of every live record, in slot order.
    pub fn handles(&self) -> Vec<AssetHandle> {
        self.slots.live_handles().collect()
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` when no record is alive.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vessel_core::asset::AssetKind;
    use vessel_core::status::AssetStatus;

    fn meta(address: &str) -> AssetMetaInfo {
        AssetMetaInfo {
            address: address.to_string(),
            address_hash: vessel_core::address::fnv1a_32(address),
            fetch_address: format!("file:///assets/{address}"),
            kind: AssetKind::Image,
            subkind: String::new(),
            declared_size: 0,
            settings: Default::default(),
        }
    }

    #[test]
    fn rows_are_reset_on_free() {
        let mut store = RecordStore::new();
        let handle = store.alloc(meta("a.png")).unwrap();
        store.state_mut(handle).unwrap().ref_count = 3;
        store.load_mut(handle).unwrap().retry_count = 2;
        store.subscribe(handle, AssetCallback::new(|_| {}));

        assert!(store.free(handle));
        assert!(store.meta(handle).is_none());
        assert!(store.state(handle).is_none());

        let reused = store.alloc(meta("b.png")).unwrap();
        assert_eq!(reused.index(), handle.index());
        assert_eq!(store.meta(reused).unwrap().address, "b.png");
        let state = store.state(reused).unwrap();
        assert_eq!(state.ref_count, 0);
        assert_eq!(state.status, AssetStatus::empty());
        assert_eq!(store.load(reused).unwrap().retry_count, 0);
        assert!(store.callbacks(reused).unwrap().is_empty());
    }

    #[test]
    fn stale_handles_read_as_absent() {
        let mut store = RecordStore::new();
        let handle = store.alloc(meta("a.png")).unwrap();
        store.free(handle);
        let _ = store.alloc(meta("b.png")).unwrap();

        assert!(!store.is_valid(handle));
        assert!(store.state_mut(handle).is_none());
        assert!(!store.subscribe(handle, AssetCallback::new(|_| {})));
        assert!(!store.free(handle));
        assert!(store.meta(AssetHandle::EMPTY).is_none());
    }

    #[test]
    fn handles_lists_live_records() {
        let mut store = RecordStore::new();
        let a = store.alloc(meta("a.png")).unwrap();
        let b = store.alloc(meta("b.png")).unwrap();
        let c = store.alloc(meta("c.png")).unwrap();
        store.free(b);
        assert_eq!(store.handles(), vec![a, c]);
        assert_eq!(store.len(), 2);
    }
}
