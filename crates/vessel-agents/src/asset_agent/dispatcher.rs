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

//! Delivery of status transitions to record subscribers.

use vessel_core::callback::{AssetCallback, AssetNotification};
use vessel_core::handle::AssetHandle;
use vessel_core::status::LoadResultKind;
use vessel_data::RecordStore;

/// Stateless helper that reads subscribers out of the record store and invokes them.
pub struct CallbackDispatcher;

impl CallbackDispatcher {
    fn notification(
        store: &RecordStore,
        handle: AssetHandle,
        result: LoadResultKind,
    ) -> Option<AssetNotification> {
        let state = store.state(handle)?;
        Some(AssetNotification {
            handle,
            status: state.status,
            result,
            resource: state.resource.clone(),
        })
    }

    /// Invokes every subscriber of `handle`, inline slot first, with the
    /// record's current status. Returns how many callbacks ran.
    pub fn notify(store: &RecordStore, handle: AssetHandle, result: LoadResultKind) -> usize {
        let Some(notification) = Self::notification(store, handle, result) else {
            return 0;
        };
        let Some(callbacks) = store.callbacks(handle) else {
            return 0;
        };
        let mut invoked = 0;
        for callback in callbacks.iter() {
            callback.invoke(&notification);
            invoked += 1;
        }
        invoked
    }

    /// Subscribes `callback` and, if the record already resolved, invokes it
    /// once right away with the last outcome.
    pub fn subscribe(store: &mut RecordStore, handle: AssetHandle, callback: AssetCallback) -> bool {
        if !store.subscribe(handle, callback.clone()) {
            return false;
        }
        let resolved = store
            .state(handle)
            .filter(|state| state.status.is_resolved())
            .map(|state| state.last_result.unwrap_or(LoadResultKind::Unknown));
        if let Some(result) = resolved {
            if let Some(notification) = Self::notification(store, handle, result) {
                callback.invoke(&notification);
            }
        }
        true
    }
}
