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

//! Global cache events and the channel that carries them.

use crate::asset::AssetKind;
use crate::handle::AssetHandle;
use crate::status::LoadResultKind;
use std::sync::atomic::{AtomicU64, Ordering};

/// A cache-wide event, published for telemetry and tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A fetch was dispatched.
    LoadBegin {
        /// The record being loaded.
        handle: AssetHandle,
        /// Size declared by the manifest, `0` when unknown.
        declared_size: u64,
        /// `0` for the first attempt, then the retry number.
        retry_attempt: u32,
    },
    /// A fetch finished, failed or was cancelled.
    LoadResult {
        /// The record the fetch belonged to.
        handle: AssetHandle,
        /// Size declared by the manifest, `0` when unknown.
        declared_size: u64,
        /// The outcome.
        result: LoadResultKind,
    },
    /// A resident record was reclaimed by budget pressure.
    Evicted {
        /// The evicted record.
        handle: AssetHandle,
        /// Its kind.
        kind: AssetKind,
        /// Bytes released.
        byte_size: u64,
    },
}

/// Events kept by a bus created with [`EventBus::new`].
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Manages a generic, thread-safe event channel.
///
/// The bus is generic over the event type so that other crates can reuse it
/// for their own events. The channel is bounded: once `capacity` events wait
/// unread, publishing a new one drops the oldest, so a bus nobody drains holds
/// at most `capacity` events.
#[derive(Debug)]
pub struct EventBus<T: Clone + Send + Sync + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
    dropped: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> EventBus<T> {
    /// Creates a bus holding up to [`DEFAULT_EVENT_CAPACITY`] unread events.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Creates a bus holding up to `capacity` unread events (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, receiver) = flume::bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            dropped: AtomicU64::new(0),
        }
    }

    /// Sends an event without blocking, evicting the oldest unread event when
    /// the channel is full.
    pub fn publish(&self, event: T) {
        let mut event = event;
        loop {
            match self.sender.try_send(event) {
                Ok(()) => return,
                Err(flume::TrySendError::Full(rejected)) => {
                    if self.receiver.try_recv().is_ok() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    event = rejected;
                }
                Err(flume::TrySendError::Disconnected(_)) => {
                    log::error!("Failed to send event: receiver disconnected.");
                    return;
                }
            }
        }
    }

    /// Number of events evicted unread since the bus was created.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Maximum number of unread events.
    pub fn capacity(&self) -> usize {
        self.sender.capacity().unwrap_or(usize::MAX)
    }

    /// Returns a clone of the sending end.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns the receiving end. Clones compete for events.
    pub fn receiver(&self) -> &flume::Receiver<T> {
        &self.receiver
    }

    /// Drops every event nobody consumed yet and returns how many there were.
    pub fn clear(&self) -> usize {
        self.receiver.drain().count()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
