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

//! Acts as the **[A]gent** for the asset subsystem.
//!
//! [`AssetCache`] is the public face of the cache: callers request assets by
//! address and receive generational handles, subscribe to status transitions,
//! and release what they no longer need. Each frame the cache:
//!
//! - consumes fetch completions queued by the transport,
//! - drains a bounded number of records from the unload queue,
//! - evicts at most one unreferenced record per kind that is over budget,
//! - dispatches a bounded number of new fetches to the type loader lanes.
//!
//! The heavy lifting (moving bytes and decoding them) is delegated to
//! `vessel-lanes`.

mod agent;
mod dispatcher;
mod eviction;
mod loader;
mod metrics;
mod scheduler;

pub use agent::AssetCache;
pub use dispatcher::CallbackDispatcher;
pub use eviction::{eviction_score, select_victim, EvictionCandidate, EvictionEngine, MemoryStat};
pub use scheduler::LoadScheduler;
