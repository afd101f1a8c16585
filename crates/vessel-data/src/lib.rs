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

//! Data layouts backing the vessel asset cache.
//!
//! - [`SlotAllocator`]: generational index allocation over a freelist.
//! - [`RecordStore`]: the structure-of-arrays record tables.
//! - [`AddressIndex`]: deduplication of requests by content address.

pub mod address_index;
pub mod pool;
pub mod record_store;
pub mod records;
pub mod slot;

pub use address_index::AddressIndex;
pub use pool::ListPool;
pub use record_store::RecordStore;
pub use records::{AssetCallbackInfo, AssetLoadInfo, AssetMetaInfo, AssetStateInfo};
pub use slot::{Slot, SlotAllocator};
