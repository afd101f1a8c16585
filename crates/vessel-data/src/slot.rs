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

//! Generational slot allocation over a growable table.

use vessel_core::handle::{AssetHandle, MAX_INDEX};

/// Bookkeeping for one slot of the record tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Slot {
    /// Whether the slot currently holds a record.
    pub alive: bool,
    /// Generation of the current (or last) occupant. Never `0` once allocated.
    pub generation: u8,
    /// Next slot on the freelist, while this slot is dead.
    pub next_free: Option<u32>,
}

/// Hands out generational handles, recycling freed indices through an
/// intrusive freelist.
///
/// Every allocation bumps the slot's generation (skipping `0`), so handles to a
/// previous occupant stop validating as soon as the slot is freed and stay
/// invalid after it is reused.
#[derive(Debug, Clone, Default)]
pub struct SlotAllocator {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    live: usize,
}

fn next_generation(generation: u8) -> u8 {
    match generation.wrapping_add(1) {
        0 => 1,
        next => next,
    }
}

impl SlotAllocator {
    /// Creates an empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a slot, reusing the freelist head when there is one.
    ///
    /// Returns `None` once every addressable index is alive.
    pub fn alloc(&mut self) -> Option<AssetHandle> {
        let index = match self.free_head {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                self.free_head = slot.next_free.take();
                index
            }
            None => {
                let index = self.slots.len() as u32;
                if index > MAX_INDEX {
                    return None;
                }
                self.slots.push(Slot::default());
                index
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.alive = true;
        slot.generation = next_generation(slot.generation);
        self.live += 1;
        Some(AssetHandle::new(index, slot.generation))
    }

    /// Frees the slot behind `handle`. Returns `false` if the handle was
    /// already invalid.
    pub fn free(&mut self, handle: AssetHandle) -> bool {
        if !self.is_valid(handle) {
            return false;
        }
        let index = handle.index();
        let slot = &mut self.slots[index as usize];
        slot.alive = false;
        slot.next_free = self.free_head;
        self.free_head = Some(index);
        self.live -= 1;
        true
    }

    /// O(1) liveness and generation check.
    pub fn is_valid(&self, handle: AssetHandle) -> bool {
        if handle.is_empty() {
            return false;
        }
        self.slots
            .get(handle.index() as usize)
            .is_some_and(|slot| slot.alive && slot.generation == handle.generation())
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` when no slot is alive.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ever created (alive or dead).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Handles of every live slot, in index order.
    pub fn live_handles(&self) -> impl Iterator<Item = AssetHandle> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.alive)
            .map(|(index, slot)| AssetHandle::new(index as u32, slot.generation))
    }
}
