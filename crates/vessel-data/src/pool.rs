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

//! A pool of reusable vectors, so per-record lists do not churn the allocator.

/// Recycles `Vec<T>` allocations.
#[derive(Debug)]
pub struct ListPool<T> {
    free: Vec<Vec<T>>,
    max_pooled: usize,
}

impl<T> ListPool<T> {
    /// Creates a pool that keeps at most `max_pooled` spare lists.
    pub fn new(max_pooled: usize) -> Self {
        Self {
            free: Vec::new(),
            max_pooled,
        }
    }

    /// Takes an empty list, reusing a pooled allocation when available.
    pub fn acquire(&mut self) -> Vec<T> {
        self.free.pop().unwrap_or_default()
    }

    /// Returns a list to the pool. Its contents are dropped.
    pub fn release(&mut self, mut list: Vec<T>) {
        if self.free.len() < self.max_pooled {
            list.clear();
            self.free.push(list);
        }
    }

    /// Number of spare lists held.
    pub fn pooled(&self) -> usize {
        self.free.len()
    }
}

impl<T> Default for ListPool<T> {
    fn default() -> Self {
        Self::new(64)
    }
}
