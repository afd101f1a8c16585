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

//! The common identity of hot-path workers (loaders, transports, watchers).

/// The role a lane plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneKind {
    /// Decodes fetched bytes into resources.
    Loader,
    /// Moves bytes.
    Transport,
    /// Reports source changes.
    Watcher,
}

/// Implemented by every lane so agents can name and classify them.
pub trait Lane {
    /// A short name for logs.
    fn strategy_name(&self) -> &'static str;

    /// The role of the lane.
    fn lane_kind(&self) -> LaneKind;
}
