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

//! Asset kinds and the type-erased resource references handed out by the cache.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A marker trait for decoded resources the cache can hold.
///
/// - `Send` + `Sync`: resources are shared with consumers on other threads.
/// - `'static`: resources are stored for as long as the record lives.
pub trait Asset: Send + Sync + 'static {
    /// Memory footprint of the decoded resource, in bytes.
    fn byte_size(&self) -> u64;
}

/// The category an asset belongs to. Budgets and loaders are keyed by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Still images and textures.
    Image,
    /// Sound clips.
    Audio,
    /// Video clips.
    Video,
}

impl AssetKind {
    /// Every kind, in a stable order.
    pub const ALL: [AssetKind; 3] = [AssetKind::Image, AssetKind::Audio, AssetKind::Video];

    /// Stable lowercase name, used in metric labels and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Audio => "audio",
            AssetKind::Video => "video",
        }
    }

    /// Dense index in `0..ALL.len()`, for per-kind arrays.
    pub fn index(self) -> usize {
        match self {
            AssetKind::Image => 0,
            AssetKind::Audio => 1,
            AssetKind::Video => 2,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a bound resource, used for reverse lookup from a resource to its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Issues a fresh, process-unique identifier.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// A cheap, cloneable reference to a decoded resource.
#[derive(Clone)]
pub struct ResourceRef {
    id: ResourceId,
    kind: AssetKind,
    asset: Arc<dyn Any + Send + Sync>,
}

impl ResourceRef {
    /// Wraps a decoded asset, issuing it a new [`ResourceId`].
    pub fn new<A: Asset>(kind: AssetKind, asset: A) -> Self {
        Self {
            id: ResourceId::next(),
            kind,
            asset: Arc::new(asset),
        }
    }

    /// The identifier of this resource.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// The kind of the asset behind this reference.
    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    /// Returns the concrete asset if it is of type `A`.
    pub fn downcast<A: Asset>(&self) -> Option<Arc<A>> {
        self.asset.clone().downcast::<A>().ok()
    }

    /// Returns `true` when both references point at the same allocation.
    pub fn ptr_eq(&self, other: &ResourceRef) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRef")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

/// A resource produced by a type loader, together with its measured footprint.
#[derive(Debug, Clone)]
pub struct LoadedResource {
    /// Reference to the decoded asset.
    pub resource: ResourceRef,
    /// Footprint charged against the kind's memory budget.
    pub byte_size: u64,
}

impl LoadedResource {
    /// Wraps an asset and measures it through [`Asset::byte_size`].
    pub fn new<A: Asset>(kind: AssetKind, asset: A) -> Self {
        let byte_size = asset.byte_size();
        Self {
            resource: ResourceRef::new(kind, asset),
            byte_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blob(Vec<u8>);
    impl Asset for Blob {
        fn byte_size(&self) -> u64 {
            self.0.len() as u64
        }
    }

    struct Other;
    impl Asset for Other {
        fn byte_size(&self) -> u64 {
            0
        }
    }

    #[test]
    fn downcast_to_concrete_type() {
        let loaded = LoadedResource::new(AssetKind::Image, Blob(vec![0; 16]));
        assert_eq!(loaded.byte_size, 16);
        let blob = loaded.resource.downcast::<Blob>().expect("blob");
        assert_eq!(blob.0.len(), 16);
        assert!(loaded.resource.downcast::<Other>().is_none());
    }

    #[test]
    fn resource_ids_are_unique() {
        let a = ResourceRef::new(AssetKind::Audio, Other);
        let b = ResourceRef::new(AssetKind::Audio, Other);
        assert_ne!(a.id(), b.id());
        assert!(a.ptr_eq(&a.clone()));
    }

    #[test]
    fn kind_serializes_lowercase() {
        let json = serde_json::to_string(&AssetKind::Video).unwrap();
        assert_eq!(json, "\"video\"");
        assert_eq!(AssetKind::Audio.index(), 1);
    }
}
