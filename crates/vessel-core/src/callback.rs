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

//! Subscriber callbacks and the notification payload they receive.

use crate::asset::ResourceRef;
use crate::handle::AssetHandle;
use crate::status::{AssetStatus, LoadResultKind};
use std::fmt;
use std::sync::Arc;

/// What a subscriber learns when a record changes state.
#[derive(Debug, Clone)]
pub struct AssetNotification {
    /// The record that changed.
    pub handle: AssetHandle,
    /// Its status after the transition.
    pub status: AssetStatus,
    /// The outcome of the load that caused the transition.
    pub result: LoadResultKind,
    /// The bound resource, `None` on failure or cancellation.
    pub resource: Option<ResourceRef>,
}

/// A shared subscriber callback.
///
/// Callbacks compare by identity: two `AssetCallback`s are equal only if they
/// were cloned from the same original, which is what unsubscription matches on.
/// Callbacks run on the thread that drives the cache and must not call back into it.
#[derive(Clone)]
pub struct AssetCallback(Arc<dyn Fn(&AssetNotification) + Send + Sync>);

impl AssetCallback {
    /// Wraps a closure.
    pub fn new(f: impl Fn(&AssetNotification) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Invokes the callback.
    pub fn invoke(&self, notification: &AssetNotification) {
        (self.0)(notification)
    }
}

impl PartialEq for AssetCallback {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for AssetCallback {}

impl fmt::Debug for AssetCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetCallback({:p})", Arc::as_ptr(&self.0))
    }
}
