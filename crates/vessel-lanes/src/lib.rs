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

//! Hot-path workers of the vessel asset cache.
//!
//! Lanes do the work the cache schedules: type loaders decode fetched bytes into
//! resources, the threaded transport moves bytes off the tick thread, and the
//! filesystem notifier reports edits below the streaming root.

pub mod asset_lane;

pub use asset_lane::*;
