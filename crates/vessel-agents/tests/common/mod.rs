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

//! Shared fixtures: a scripted transport, a byte-blob loader and a harness
//! wiring them into an `AssetCache` driven by a manual clock.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use vessel_agents::AssetCache;
use vessel_core::{
    Asset, AssetCallback, AssetChange, AssetKind, AssetNotification, CacheConfig, CacheEvent,
    ChangeNotifier, FetchCompletion, FetchError, FetchTicket, FetchTransport, LoadedResource,
    ManualClock, Manifest, ResourceRef,
};
use vessel_core::lane::{Lane, LaneKind};
use vessel_lanes::{FetchRequest, TypeLoaderLane};

fn matches(url: &str, address: &str) -> bool {
    url == address || url.ends_with(&format!("/{address}"))
}

#[derive(Default)]
struct ScriptState {
    running: bool,
    next_ticket: u64,
    begun: Vec<String>,
    outstanding: Vec<(FetchTicket, String)>,
    cancelled: Vec<FetchTicket>,
    ready: Vec<FetchCompletion>,
    responses: HashMap<String, VecDeque<Result<Vec<u8>, FetchError>>>,
}

/// A transport whose fetches complete only when the test says so, or
/// immediately from a per-address script.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers the next fetches of `address`, in order, with `results`.
    pub fn script(
        &self,
        address: &str,
        results: impl IntoIterator<Item = Result<Vec<u8>, FetchError>>,
    ) {
        let mut state = self.state.lock().unwrap();
        state
            .responses
            .entry(address.to_string())
            .or_default()
            .extend(results);
    }

    /// Completes the oldest outstanding fetch of `address`.
    pub fn complete(&self, address: &str, result: Result<Vec<u8>, FetchError>) -> bool {
        let mut state = self.state.lock().unwrap();
        let Some(position) = state
            .outstanding
            .iter()
            .position(|(_, url)| matches(url, address))
        else {
            return false;
        };
        let (ticket, _) = state.outstanding.remove(position);
        state.ready.push(FetchCompletion { ticket, result });
        true
    }

    /// Fetches begun for `address`.
    pub fn begun(&self, address: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.begun.iter().filter(|url| matches(url, address)).count()
    }

    pub fn total_begun(&self) -> usize {
        self.state.lock().unwrap().begun.len()
    }

    pub fn outstanding(&self) -> usize {
        self.state.lock().unwrap().outstanding.len()
    }

    pub fn cancelled(&self) -> usize {
        self.state.lock().unwrap().cancelled.len()
    }

    pub fn last_url(&self) -> Option<String> {
        self.state.lock().unwrap().begun.last().cloned()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    /// Stops accepting fetches without going through the cache.
    pub fn stop(&self) {
        self.state.lock().unwrap().running = false;
    }
}

impl FetchTransport for ScriptedTransport {
    fn begin(&mut self, url: &str) -> Result<FetchTicket, FetchError> {
        let mut state = self.state.lock().unwrap();
        if !state.running {
            return Err(FetchError::Unknown(format!("transport stopped, refusing '{url}'")));
        }
        state.next_ticket += 1;
        let ticket = FetchTicket::new(state.next_ticket);
        state.begun.push(url.to_string());

        let scripted = state
            .responses
            .iter_mut()
            .find(|(address, _)| matches(url, address))
            .and_then(|(_, queue)| queue.pop_front());
        match scripted {
            Some(result) => state.ready.push(FetchCompletion { ticket, result }),
            None => state.outstanding.push((ticket, url.to_string())),
        }
        Ok(ticket)
    }

    fn cancel(&mut self, ticket: FetchTicket) {
        let mut state = self.state.lock().unwrap();
        state.cancelled.push(ticket);
        state.outstanding.retain(|(t, _)| *t != ticket);
        state.ready.retain(|completion| completion.ticket != ticket);
    }

    fn poll_completions(&mut self, out: &mut Vec<FetchCompletion>) {
        out.append(&mut self.state.lock().unwrap().ready);
    }

    fn start(&mut self) {
        self.state.lock().unwrap().running = true;
    }

    fn shutdown(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.running = false;
        state.outstanding.clear();
        state.ready.clear();
    }
}

/// A resource that is just the fetched bytes.
#[derive(Debug)]
pub struct Blob {
    pub bytes: Vec<u8>,
}

impl Asset for Blob {
    fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Loads any payload as a [`Blob`]; payloads starting with `bad` fail to decode.
pub struct BlobLoaderLane {
    kind: AssetKind,
    released: Arc<AtomicUsize>,
}

impl TypeLoaderLane for BlobLoaderLane {
    fn kind(&self) -> AssetKind {
        self.kind
    }

    fn on_fetch_complete(
        &mut self,
        _request: &FetchRequest<'_>,
        bytes: Vec<u8>,
    ) -> Result<LoadedResource, FetchError> {
        if bytes.starts_with(b"bad") {
            return Err(FetchError::Decode("corrupt blob".into()));
        }
        Ok(LoadedResource::new(self.kind, Blob { bytes }))
    }

    fn release(&mut self, _resource: &ResourceRef) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl Lane for BlobLoaderLane {
    fn strategy_name(&self) -> &'static str {
        "BlobLoader"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Loader
    }
}

/// A change notifier fed by the test.
#[derive(Clone, Default)]
pub struct ScriptedNotifier {
    changes: Arc<Mutex<Vec<AssetChange>>>,
}

impl ScriptedNotifier {
    pub fn push(&self, change: AssetChange) {
        self.changes.lock().unwrap().push(change);
    }
}

impl ChangeNotifier for ScriptedNotifier {
    fn poll_changes(&mut self) -> Vec<AssetChange> {
        std::mem::take(&mut *self.changes.lock().unwrap())
    }
}

pub struct Harness {
    pub cache: AssetCache,
    pub transport: ScriptedTransport,
    pub clock: ManualClock,
    pub released: Arc<AtomicUsize>,
}

impl Harness {
    /// Ticks `n` times.
    pub fn ticks(&mut self, n: usize) {
        for _ in 0..n {
            self.cache.tick();
        }
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn drain_events(&self) -> Vec<CacheEvent> {
        self.cache.events().try_iter().collect()
    }
}

/// An initialized cache with blob loaders for images and audio.
pub fn harness(config: CacheConfig) -> Harness {
    harness_with_manifest(config, None)
}

pub fn harness_with_manifest(config: CacheConfig, manifest: Option<Manifest>) -> Harness {
    harness_with(config, |cache| match manifest {
        Some(manifest) => cache.with_manifest(Box::new(manifest)),
        None => cache,
    })
}

/// Like [`harness`], letting the test configure the cache before `init`.
pub fn harness_with(config: CacheConfig, configure: impl FnOnce(AssetCache) -> AssetCache) -> Harness {
    vessel_telemetry::init_test_logging();
    let transport = ScriptedTransport::new();
    let clock = ManualClock::new();
    let released = Arc::new(AtomicUsize::new(0));
    let mut cache = configure(AssetCache::new(
        config,
        Box::new(transport.clone()),
        Arc::new(clock.clone()),
    ));
    for kind in [AssetKind::Image, AssetKind::Audio] {
        cache.register_loader(Box::new(BlobLoaderLane {
            kind,
            released: released.clone(),
        }));
    }
    cache.init().unwrap();
    Harness {
        cache,
        transport,
        clock,
        released,
    }
}

pub fn payload(size: usize) -> Vec<u8> {
    vec![7; size]
}

/// A callback that records every notification it receives.
pub fn recorder() -> (AssetCallback, Arc<Mutex<Vec<AssetNotification>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback = AssetCallback::new(move |n: &AssetNotification| sink.lock().unwrap().push(n.clone()));
    (callback, seen)
}
