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

//! Source change notifications driving hot reload.

/// A change to the source of an address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetChange {
    /// The source was rewritten; the resource should be reloaded.
    Modified(String),
    /// The source disappeared.
    Deleted(String),
}

impl AssetChange {
    /// The address the change concerns.
    pub fn address(&self) -> &str {
        match self {
            AssetChange::Modified(address) | AssetChange::Deleted(address) => address,
        }
    }
}

/// Produces invalidation events. Polled once per tick.
pub trait ChangeNotifier: Send {
    /// Returns every change observed since the previous call.
    fn poll_changes(&mut self) -> Vec<AssetChange>;
}
