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

#![warn(missing_docs)]

//! Foundational types and contracts of the vessel asset cache.
//!
//! This crate is the "common language" of the workspace. It defines handles,
//! status flags, the error taxonomy, the manifest model and the traits that
//! transports, loaders and change notifiers implement, but it knows nothing
//! about how records are stored or scheduled.

pub mod address;
pub mod agent;
pub mod asset;
pub mod callback;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod fetch;
pub mod handle;
pub mod lane;
pub mod manifest;
pub mod status;
pub mod watch;

pub use address::AddressResolver;
pub use asset::{Asset, AssetKind, LoadedResource, ResourceId, ResourceRef};
pub use callback::{AssetCallback, AssetNotification};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, ReleasePolicy};
pub use error::{CacheError, CacheResult, FetchError};
pub use event::{CacheEvent, EventBus};
pub use fetch::{FetchCompletion, FetchTicket, FetchTransport};
pub use handle::AssetHandle;
pub use manifest::{Manifest, ManifestEntry, ManifestProvider};
pub use status::{AssetStatus, LoadResultKind};
pub use watch::{AssetChange, ChangeNotifier};
