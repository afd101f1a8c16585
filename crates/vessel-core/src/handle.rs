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

//! Generational handles identifying cache records.

use std::fmt;

/// Number of bits reserved for the slot index inside a packed handle.
pub const INDEX_BITS: u32 = 24;

/// Largest slot index a handle can address.
pub const MAX_INDEX: u32 = (1 << INDEX_BITS) - 1;

const INDEX_MASK: u32 = MAX_INDEX;

/// A generational index identifying one record of the asset cache.
///
/// The handle packs a 24-bit slot index and an 8-bit generation into a single
/// `u32`. When a slot is freed and later reused its generation changes, so any
/// handle still pointing at the old occupant compares invalid instead of
/// silently aliasing the new record.
///
/// The packed value `0` is reserved as the empty sentinel ([`AssetHandle::EMPTY`]).
/// Generations never take the value `0`, so a live handle is never empty.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AssetHandle(u32);

impl AssetHandle {
    /// The empty handle. Never valid.
    pub const EMPTY: AssetHandle = AssetHandle(0);

    /// Builds a handle from a slot index and a generation.
    ///
    /// The index is truncated to 24 bits.
    pub const fn new(index: u32, generation: u8) -> Self {
        Self(((generation as u32) << INDEX_BITS) | (index & INDEX_MASK))
    }

    /// Rebuilds a handle from its packed representation.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the packed representation.
    pub const fn to_raw(self) -> u32 {
        self.0
    }

    /// The slot index this handle points at.
    pub const fn index(self) -> u32 {
        self.0 & INDEX_MASK
    }

    /// The generation the slot had when this handle was issued.
    pub const fn generation(self) -> u8 {
        (self.0 >> INDEX_BITS) as u8
    }

    /// Returns `true` for the empty sentinel.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "AssetHandle(empty)")
        } else {
            write!(f, "AssetHandle({}v{})", self.index(), self.generation())
        }
    }
}

impl fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_index_and_generation() {
        let handle = AssetHandle::new(0x00AB_CDEF, 7);
        assert_eq!(handle.index(), 0x00AB_CDEF);
        assert_eq!(handle.generation(), 7);
        assert_eq!(handle.to_raw(), 0x07AB_CDEF);
        assert_eq!(AssetHandle::from_raw(handle.to_raw()), handle);
    }

    #[test]
    fn index_is_truncated_to_24_bits() {
        let handle = AssetHandle::new(0x1FF_FFFF, 1);
        assert_eq!(handle.index(), MAX_INDEX);
        assert_eq!(handle.generation(), 1);
    }

    #[test]
    fn empty_sentinel() {
        assert!(AssetHandle::EMPTY.is_empty());
        assert!(AssetHandle::default().is_empty());
        assert!(!AssetHandle::new(0, 1).is_empty());
    }
}
