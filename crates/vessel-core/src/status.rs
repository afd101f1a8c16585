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

//! Record status flags and load outcomes.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// The lifecycle state of a cache record.
    ///
    /// Flags combine while a record is between states, for example a record can
    /// be `LOADING | PENDING_UNLOAD` when its last reference is dropped while a
    /// fetch is still in flight. `LOADED` and `ERROR` are terminal until an
    /// explicit retry or unload.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AssetStatus: u8 {
        /// No data is resident and nothing is queued.
        const UNLOADED = 1 << 0;
        /// The handle does not resolve to a live record.
        const INVALID = 1 << 1;
        /// The record has no references and is waiting to be reclaimed.
        const PENDING_UNLOAD = 1 << 2;
        /// The record is queued for a fetch.
        const PENDING_LOAD = 1 << 3;
        /// A fetch is in flight.
        const LOADING = 1 << 4;
        /// The resource is decoded and bound.
        const LOADED = 1 << 5;
        /// The last load attempt failed terminally.
        const ERROR = 1 << 6;
    }
}

impl AssetStatus {
    /// Returns `true` when the record reached a terminal state (`LOADED` or `ERROR`).
    pub fn is_resolved(self) -> bool {
        self.intersects(AssetStatus::LOADED | AssetStatus::ERROR)
    }

    /// Returns `true` when a load is queued or in flight.
    pub fn is_in_progress(self) -> bool {
        self.intersects(AssetStatus::PENDING_LOAD | AssetStatus::LOADING)
    }
}

/// The outcome reported for a finished (or abandoned) load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadResultKind {
    /// The resource was fetched and decoded.
    Success,
    /// The transport could not reach the resource.
    NetworkError,
    /// The remote end answered with an error.
    ServerError,
    /// The payload arrived but could not be decoded.
    DecodeError,
    /// The fetch was abandoned because the record was unloaded.
    Cancelled,
    /// Any other failure.
    Unknown,
}

impl LoadResultKind {
    /// Returns `true` for [`LoadResultKind::Success`].
    pub fn is_success(self) -> bool {
        matches!(self, LoadResultKind::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_covers_terminal_states() {
        assert!(AssetStatus::LOADED.is_resolved());
        assert!(AssetStatus::ERROR.is_resolved());
        assert!(!AssetStatus::PENDING_LOAD.is_resolved());
        assert!(!AssetStatus::LOADING.is_resolved());
        assert!((AssetStatus::LOADED | AssetStatus::PENDING_UNLOAD).is_resolved());
    }

    #[test]
    fn in_progress_states() {
        assert!(AssetStatus::PENDING_LOAD.is_in_progress());
        assert!((AssetStatus::LOADING | AssetStatus::PENDING_UNLOAD).is_in_progress());
        assert!(!AssetStatus::LOADED.is_in_progress());
    }
}
