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

//! The load queues and the in-flight table.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::time::Duration;
use vessel_core::fetch::FetchTicket;
use vessel_core::handle::AssetHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DelayedLoad {
    due: Duration,
    seq: u64,
    handle: AssetHandle,
}

// Reversed so the max-heap pops the earliest due time, then the oldest entry.
impl Ord for DelayedLoad {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for DelayedLoad {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Owns the immediate FIFO queue, the time-ordered delayed queue used for
/// retry backoff, and the map of fetches in flight.
///
/// The scheduler only orders handles. Whether a dequeued handle is still worth
/// dispatching is decided by the cache, which re-validates it.
#[derive(Debug, Default)]
pub struct LoadScheduler {
    immediate: VecDeque<AssetHandle>,
    delayed: BinaryHeap<DelayedLoad>,
    in_flight: HashMap<FetchTicket, AssetHandle>,
    next_seq: u64,
}

impl LoadScheduler {
    /// Creates empty queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handle to the immediate queue.
    pub fn enqueue(&mut self, handle: AssetHandle) {
        self.immediate.push_back(handle);
    }

    /// Schedules a handle to join the immediate queue once `due` is reached.
    pub fn enqueue_delayed(&mut self, handle: AssetHandle, due: Duration) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.delayed.push(DelayedLoad { due, seq, handle });
    }

    /// Moves every delayed entry whose due time is `<= now` to the back of the
    /// immediate queue, earliest first. Returns how many moved.
    pub fn promote_due(&mut self, now: Duration) -> usize {
        let mut promoted = 0;
        while self.delayed.peek().is_some_and(|entry| entry.due <= now) {
            if let Some(entry) = self.delayed.pop() {
                log::trace!("Promoting delayed load of {}", entry.handle);
                self.immediate.push_back(entry.handle);
                promoted += 1;
            }
        }
        promoted
    }

    /// Pops the front of the immediate queue.
    pub fn pop_immediate(&mut self) -> Option<AssetHandle> {
        self.immediate.pop_front()
    }

    /// Returns `true` if the handle sits in either queue.
    pub fn is_queued(&self, handle: AssetHandle) -> bool {
        self.immediate.contains(&handle) || self.delayed.iter().any(|entry| entry.handle == handle)
    }

    /// Drops every queued occurrence of a handle.
    pub fn forget(&mut self, handle: AssetHandle) {
        self.immediate.retain(|&queued| queued != handle);
        self.delayed.retain(|entry| entry.handle != handle);
    }

    /// Records a dispatched fetch.
    pub fn begin_flight(&mut self, ticket: FetchTicket, handle: AssetHandle) {
        self.in_flight.insert(ticket, handle);
    }

    /// Removes a fetch from the in-flight table, returning the handle it was for.
    pub fn finish_flight(&mut self, ticket: FetchTicket) -> Option<AssetHandle> {
        self.in_flight.remove(&ticket)
    }

    /// Fetches currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Entries waiting in the immediate queue.
    pub fn immediate_len(&self) -> usize {
        self.immediate.len()
    }

    /// Entries waiting for their backoff to elapse.
    pub fn delayed_len(&self) -> usize {
        self.delayed.len()
    }

    /// Entries in either queue.
    pub fn pending_count(&self) -> usize {
        self.immediate.len() + self.delayed.len()
    }

    /// Empties both queues and the in-flight table.
    pub fn clear(&mut self) {
        self.immediate.clear();
        self.delayed.clear();
        self.in_flight.clear();
    }
}
