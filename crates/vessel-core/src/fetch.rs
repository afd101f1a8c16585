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

//! The contract between the cache and the transport that moves bytes.
//!
//! Transports run their work off the tick thread. They never touch cache state:
//! finished fetches are queued and handed over only when the cache polls at a
//! tick boundary.

use crate::error::FetchError;

/// Identifies one fetch issued by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchTicket {
    /// Wraps a raw transport-specific id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// A finished fetch, as observed by the cache.
#[derive(Debug)]
pub struct FetchCompletion {
    /// The ticket returned by [`FetchTransport::begin`].
    pub ticket: FetchTicket,
    /// The fetched bytes, or the transport failure.
    pub result: Result<Vec<u8>, FetchError>,
}

/// Moves bytes from a fetch address to the cache.
pub trait FetchTransport: Send {
    /// Starts fetching `url` and returns immediately.
    ///
    /// A transport that cannot take the fetch (for example because it was shut
    /// down) refuses it with an error instead of issuing a ticket that never
    /// completes.
    fn begin(&mut self, url: &str) -> Result<FetchTicket, FetchError>;

    /// Abandons a fetch. Its completion, if any, must not be reported.
    fn cancel(&mut self, ticket: FetchTicket);

    /// Moves every completion that is ready into `out`.
    fn poll_completions(&mut self, out: &mut Vec<FetchCompletion>);

    /// (Re)starts background work. Called by the cache on `init`, so a
    /// transport stopped by `shutdown` can serve a cache initialized again.
    fn start(&mut self) {}

    /// Stops background work. Outstanding fetches are dropped.
    fn shutdown(&mut self) {}
}
