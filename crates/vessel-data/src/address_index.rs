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

//! Deduplicating map from content address to handle.

use std::collections::HashMap;
use vessel_core::address::fnv1a_32;
use vessel_core::handle::AssetHandle;

#[derive(Debug, Clone)]
struct IndexEntry {
    address: Box<str>,
    handle: AssetHandle,
}

/// Maps the FNV-1a hash of an address to the handle of its record.
///
/// The full address is kept next to each hash and compared on lookup. When two
/// addresses share a hash, the later one is stored in an exact-string side
/// table, so a collision never makes two addresses share a record.
#[derive(Debug, Default)]
pub struct AddressIndex {
    by_hash: HashMap<u32, IndexEntry>,
    collisions: HashMap<String, AssetHandle>,
}

impl AddressIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle mapped to `address`, if any.
    pub fn lookup(&self, address: &str) -> Option<AssetHandle> {
        match self.by_hash.get(&fnv1a_32(address)) {
            Some(entry) if &*entry.address == address => Some(entry.handle),
            Some(_) => self.collisions.get(address).copied(),
            None => None,
        }
    }

    /// Returns the existing handle for `address` or maps a new one produced by
    /// `alloc`. The boolean is `true` when `alloc` ran and succeeded.
    ///
    /// `alloc` is never called for an address that is already mapped.
    pub fn resolve_or_insert_with(
        &mut self,
        address: &str,
        alloc: impl FnOnce() -> Option<AssetHandle>,
    ) -> Option<(AssetHandle, bool)> {
        if let Some(handle) = self.lookup(address) {
            return Some((handle, false));
        }
        let handle = alloc()?;
        self.insert(address, handle);
        Some((handle, true))
    }

    /// Maps `address` to `handle`, replacing any previous mapping of that address.
    pub fn insert(&mut self, address: &str, handle: AssetHandle) {
        let hash = fnv1a_32(address);
        match self.by_hash.get_mut(&hash) {
            Some(entry) if &*entry.address == address => entry.handle = handle,
            Some(entry) => {
                log::warn!(
                    "Address hash collision {:#010x}: '{}' and '{}'",
                    hash,
                    entry.address,
                    address
                );
                self.collisions.insert(address.to_string(), handle);
            }
            None => {
                self.by_hash.insert(
                    hash,
                    IndexEntry {
                        address: address.into(),
                        handle,
                    },
                );
            }
        }
    }

    /// Removes the mapping of `address` if it still points at `handle`.
    pub fn remove(&mut self, address: &str, handle: AssetHandle) -> bool {
        if self.collisions.get(address) == Some(&handle) {
            self.collisions.remove(address);
            return true;
        }
        let hash = fnv1a_32(address);
        let matches = self
            .by_hash
            .get(&hash)
            .is_some_and(|entry| &*entry.address == address && entry.handle == handle);
        if !matches {
            return false;
        }
        self.by_hash.remove(&hash);
        // Promote a colliding address into the freed primary slot.
        let promoted = self
            .collisions
            .keys()
            .find(|other| fnv1a_32(other) == hash)
            .cloned();
        if let Some(other) = promoted {
            if let Some(other_handle) = self.collisions.remove(&other) {
                self.by_hash.insert(
                    hash,
                    IndexEntry {
                        address: other.into(),
                        handle: other_handle,
                    },
                );
            }
        }
        true
    }

    /// Number of mapped addresses.
    pub fn len(&self) -> usize {
        self.by_hash.len() + self.collisions.len()
    }

    /// Returns `true` when nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every mapping.
    pub fn clear(&mut self) {
        self.by_hash.clear();
        self.collisions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known FNV-1a 32-bit collision pair.
    const COLLIDING_A: &str = "costarring";
    const COLLIDING_B: &str = "liquid";

    #[test]
    fn repeated_resolution_does_not_allocate() {
        let mut index = AddressIndex::new();
        let mut allocations = 0;
        let mut next = 1;
        let mut alloc = || {
            allocations += 1;
            next += 1;
            Some(AssetHandle::new(next, 1))
        };

        let (first, created) = index.resolve_or_insert_with("a.png", &mut alloc).unwrap();
        assert!(created);
        let (second, created) = index.resolve_or_insert_with("a.png", &mut alloc).unwrap();
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(allocations, 1);
    }

    #[test]
    fn failed_allocation_maps_nothing() {
        let mut index = AddressIndex::new();
        assert!(index.resolve_or_insert_with("a.png", || None).is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn remove_requires_matching_handle() {
        let mut index = AddressIndex::new();
        let handle = AssetHandle::new(3, 1);
        index.insert("a.png", handle);
        assert!(!index.remove("a.png", AssetHandle::new(3, 2)));
        assert!(index.remove("a.png", handle));
        assert_eq!(index.lookup("a.png"), None);
    }

    #[test]
    fn colliding_addresses_keep_separate_handles() {
        assert_eq!(fnv1a_32(COLLIDING_A), fnv1a_32(COLLIDING_B));

        let mut index = AddressIndex::new();
        let a = AssetHandle::new(1, 1);
        let b = AssetHandle::new(2, 1);
        index.insert(COLLIDING_A, a);
        index.insert(COLLIDING_B, b);
        assert_eq!(index.lookup(COLLIDING_A), Some(a));
        assert_eq!(index.lookup(COLLIDING_B), Some(b));
        assert_eq!(index.len(), 2);

        assert!(index.remove(COLLIDING_A, a));
        assert_eq!(index.lookup(COLLIDING_B), Some(b));
        assert_eq!(index.lookup(COLLIDING_A), None);
        assert_eq!(index.len(), 1);
    }
}
