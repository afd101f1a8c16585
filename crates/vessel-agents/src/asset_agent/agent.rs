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

//! The `AssetCache` service: request/release API and the per-frame tick.

use super::dispatcher::CallbackDispatcher;
use super::eviction::{select_victim, EvictionCandidate, EvictionEngine, MemoryStat};
use super::loader::LoaderLaneRegistry;
use super::metrics::CacheMetrics;
use super::scheduler::LoadScheduler;
use std::collections::HashMap;
use std::sync::Arc;
use vessel_core::address::{fnv1a_32, AddressResolver};
use vessel_core::agent::{Agent, AgentStatus, StrategyId};
use vessel_core::asset::{Asset, AssetKind, ResourceId, ResourceRef};
use vessel_core::callback::AssetCallback;
use vessel_core::clock::{Clock, SystemClock};
use vessel_core::config::{CacheConfig, ReleasePolicy};
use vessel_core::error::{CacheError, CacheResult, FetchError};
use vessel_core::event::{CacheEvent, EventBus};
use vessel_core::fetch::{FetchCompletion, FetchTransport};
use vessel_core::handle::AssetHandle;
use vessel_core::manifest::{ManifestEntry, ManifestProvider};
use vessel_core::status::{AssetStatus, LoadResultKind};
use vessel_core::watch::{AssetChange, ChangeNotifier};
use vessel_data::{AddressIndex, AssetMetaInfo, RecordStore};
use vessel_lanes::{
    AudioLoaderLane, FetchRequest, FsChangeNotifier, ImageLoaderLane, ThreadedTransport,
    TransportConfig, TypeLoaderLane, VideoLoaderLane,
};
use vessel_telemetry::MetricsRegistry;

const HIGH_PERFORMANCE_MULTIPLIER: usize = 3;
const LOW_POWER_DIVISOR: usize = 4;

/// A reference-counted, budgeted cache of streamed assets.
///
/// All state transitions happen on the thread that calls [`AssetCache::tick`].
/// The transport works off-thread but its completions are only consumed at the
/// start of a tick, so no record is ever touched from two threads.
pub struct AssetCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    resolver: AddressResolver,
    transport: Box<dyn FetchTransport>,
    manifest: Option<Box<dyn ManifestProvider>>,
    change_notifier: Option<Box<dyn ChangeNotifier>>,
    loaders: LoaderLaneRegistry,
    store: RecordStore,
    index: AddressIndex,
    scheduler: LoadScheduler,
    eviction: EvictionEngine,
    resources: HashMap<ResourceId, AssetHandle>,
    events: EventBus<CacheEvent>,
    metrics_registry: MetricsRegistry,
    metrics: Option<CacheMetrics>,
    current_strategy: StrategyId,
    max_loads_per_frame: usize,
    max_unloads_per_frame: usize,
    initialized: bool,
    frame_count: u64,
    completions: Vec<FetchCompletion>,
}

/// Builds the immutable meta row of a new record.
fn describe(
    fetch_address: String,
    manifest: Option<&mut (dyn ManifestProvider + 'static)>,
    address: &str,
    kind: AssetKind,
) -> AssetMetaInfo {
    let (entry, settings) = match manifest {
        Some(manifest) => {
            let entry = manifest.resolve(address, kind);
            let settings = manifest.settings_for(&entry);
            (entry, settings)
        }
        None => (ManifestEntry::synthesized(kind), Default::default()),
    };
    AssetMetaInfo {
        address: address.to_string(),
        address_hash: fnv1a_32(address),
        fetch_address,
        kind,
        subkind: entry.subtype,
        declared_size: entry.size,
        settings,
    }
}

impl AssetCache {
    /// Creates a cache over the given transport and clock. No loaders are
    /// registered; see [`AssetCache::with_default_lanes`].
    pub fn new(
        config: CacheConfig,
        transport: Box<dyn FetchTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut eviction = EvictionEngine::new();
        for (&kind, &bytes) in &config.budgets {
            eviction.set_budget(kind, Some(bytes));
        }
        let metrics_registry = MetricsRegistry::new();
        let metrics = CacheMetrics::new(&metrics_registry)
            .map_err(|e| log::error!("Failed to register cache metrics: {}", e))
            .ok();
        let events = EventBus::with_capacity(config.event_capacity);

        Self {
            resolver: AddressResolver::new(config.streaming_root.clone()),
            max_loads_per_frame: config.max_loads_per_frame.max(1),
            max_unloads_per_frame: config.max_unloads_per_frame.max(1),
            config,
            clock,
            transport,
            manifest: None,
            change_notifier: None,
            loaders: LoaderLaneRegistry::new(),
            store: RecordStore::new(),
            index: AddressIndex::new(),
            scheduler: LoadScheduler::new(),
            eviction,
            resources: HashMap::new(),
            events,
            metrics_registry,
            metrics,
            current_strategy: StrategyId::Balanced,
            initialized: false,
            frame_count: 0,
            completions: Vec::new(),
        }
    }

    /// Creates a cache with the threaded transport, the system clock and the
    /// image, audio and video lanes.
    pub fn with_default_lanes(config: CacheConfig) -> Self {
        let transport = ThreadedTransport::new(TransportConfig {
            workers: config.transport_workers,
            ..Default::default()
        });
        let decoder_pool = config.video_decoder_pool;
        let mut cache = Self::new(config, Box::new(transport), Arc::new(SystemClock::new()));
        cache.register_loader(Box::new(ImageLoaderLane::new()));
        cache.register_loader(Box::new(AudioLoaderLane::new()));
        cache.register_loader(Box::new(VideoLoaderLane::new(decoder_pool)));
        cache
    }

    /// Attaches a manifest provider.
    pub fn with_manifest(mut self, manifest: Box<dyn ManifestProvider>) -> Self {
        self.manifest = Some(manifest);
        self
    }

    /// Records metrics into `registry` instead of the cache's private one.
    pub fn with_metrics(mut self, registry: MetricsRegistry) -> Self {
        match CacheMetrics::new(&registry) {
            Ok(metrics) => {
                self.metrics = Some(metrics);
                self.metrics_registry = registry;
            }
            Err(e) => log::error!("Failed to register cache metrics: {}", e),
        }
        self
    }

    /// Attaches a source of hot-reload events, polled once per tick.
    pub fn with_change_notifier(mut self, notifier: Box<dyn ChangeNotifier>) -> Self {
        self.change_notifier = Some(notifier);
        self
    }

    /// Watches the streaming root on disk and reloads assets when they change.
    pub fn enable_hot_reload(&mut self) -> CacheResult<()> {
        let notifier = FsChangeNotifier::new(self.resolver.clone())
            .map_err(|e| CacheError::Io(std::io::Error::other(e.to_string())))?;
        self.change_notifier = Some(Box::new(notifier));
        Ok(())
    }

    /// Registers the loader for a kind, replacing any previous one.
    pub fn register_loader(&mut self, lane: Box<dyn TypeLoaderLane>) {
        self.loaders.register(lane);
    }

    /// Starts the service and its transport. A cache that was shut down can be
    /// initialized again.
    pub fn init(&mut self) -> CacheResult<()> {
        if self.initialized {
            return Err(CacheError::AlreadyInitialized);
        }
        self.transport.start();
        self.initialized = true;
        log::info!(
            "Asset cache initialized (streaming root '{}').",
            self.resolver.streaming_root().display()
        );
        Ok(())
    }

    /// Unloads everything and stops the transport.
    pub fn shutdown(&mut self) -> CacheResult<()> {
        if !self.initialized {
            return Err(CacheError::NotInitialized);
        }
        self.unload_all();
        self.transport.shutdown();
        self.initialized = false;
        log::info!("Asset cache shut down.");
        Ok(())
    }

    /// Returns `true` between `init` and `shutdown`.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // --- Public API ---

    /// Resolves `address` to a handle, creating and queueing a record on first
    /// use, and takes one reference on it.
    ///
    /// If `callback` is given it is subscribed to the record. A record that
    /// already resolved calls it before this returns. Relative addresses that
    /// escape the streaming root fail with [`CacheError::InvalidAddress`].
    pub fn request(
        &mut self,
        address: &str,
        kind: AssetKind,
        callback: Option<AssetCallback>,
    ) -> CacheResult<AssetHandle> {
        if !self.initialized {
            return Err(CacheError::NotInitialized);
        }
        if !self.loaders.contains(kind) {
            return Err(CacheError::NoLoader(kind));
        }

        let fetch_address = self.resolver.resolve(address)?;
        let manifest = &mut self.manifest;
        let store = &mut self.store;
        let (handle, created) = self
            .index
            .resolve_or_insert_with(address, || {
                store.alloc(describe(fetch_address, manifest.as_deref_mut(), address, kind))
            })
            .ok_or(CacheError::SlotsExhausted)?;

        if let Some(meta) = self.store.meta(handle) {
            if meta.kind != kind {
                log::warn!(
                    "'{}' requested as {} but cached as {}",
                    address,
                    kind,
                    meta.kind
                );
            }
        }

        let now = self.clock.now();
        let state = self
            .store
            .state_mut(handle)
            .ok_or(CacheError::InvalidHandle)?;
        state.ref_count += 1;
        state.last_access = now;
        let rescued = state.status.contains(AssetStatus::PENDING_UNLOAD);
        state.status.remove(AssetStatus::PENDING_UNLOAD);
        if created {
            state.status = AssetStatus::PENDING_LOAD;
        }
        let needs_queue = state.status.contains(AssetStatus::PENDING_LOAD)
            && (created || rescued)
            && !self.scheduler.is_queued(handle);
        if needs_queue {
            self.scheduler.enqueue(handle);
        }
        log::debug!(
            "Requested '{}' as {} ({}created)",
            address,
            handle,
            if created { "" } else { "not " }
        );

        if let Some(callback) = callback {
            CallbackDispatcher::subscribe(&mut self.store, handle, callback);
        }
        Ok(handle)
    }

    /// Drops one reference and unsubscribes `callback` if given.
    ///
    /// Returns `false` for stale handles and for records that hold no reference.
    pub fn release(&mut self, handle: AssetHandle, callback: Option<&AssetCallback>) -> bool {
        if !self.store.is_valid(handle) {
            return false;
        }
        if let Some(callback) = callback {
            self.store.unsubscribe(handle, callback);
        }

        let now = self.clock.now();
        let policy = self.config.release_policy;
        let Some(state) = self.store.state_mut(handle) else {
            return false;
        };
        if state.ref_count == 0 {
            return false;
        }
        state.ref_count -= 1;
        state.last_access = now;
        if state.ref_count == 0 && policy == ReleasePolicy::Immediate {
            state.status.insert(AssetStatus::PENDING_UNLOAD);
            self.eviction.queue_unload(handle);
        }
        true
    }

    /// Status of a record. Stale handles report `INVALID`.
    pub fn status(&self, handle: AssetHandle) -> AssetStatus {
        self.store
            .state(handle)
            .map_or(AssetStatus::INVALID, |state| state.status)
    }

    /// The bound resource of a loaded record.
    pub fn resolve(&self, handle: AssetHandle) -> Option<ResourceRef> {
        self.store
            .state(handle)
            .filter(|state| state.status.contains(AssetStatus::LOADED))
            .and_then(|state| state.resource.clone())
    }

    /// The bound resource of a loaded record, as its concrete type.
    pub fn resolve_as<A: Asset>(&self, handle: AssetHandle) -> Option<Arc<A>> {
        self.resolve(handle)?.downcast::<A>()
    }

    /// Reverse lookup from a bound resource to the record holding it.
    pub fn handle_for_resource(&self, id: ResourceId) -> Option<AssetHandle> {
        self.resources
            .get(&id)
            .copied()
            .filter(|&handle| self.store.is_valid(handle))
    }

    /// Looks up the record of an address without taking a reference.
    pub fn handle_for_address(&self, address: &str) -> Option<AssetHandle> {
        self.index
            .lookup(address)
            .filter(|&handle| self.store.is_valid(handle))
    }

    /// Re-queues every record in `ERROR` with a fresh retry budget. Returns how many.
    pub fn retry_errored(&mut self) -> usize {
        let mut retried = 0;
        for handle in self.store.handles() {
            let Some(state) = self.store.state_mut(handle) else {
                continue;
            };
            if !state.status.contains(AssetStatus::ERROR) {
                continue;
            }
            state.status.remove(AssetStatus::ERROR);
            state.status.insert(AssetStatus::PENDING_LOAD);
            state.last_result = None;
            if let Some(load) = self.store.load_mut(handle) {
                load.retry_count = 0;
            }
            self.scheduler.enqueue(handle);
            retried += 1;
        }
        if retried > 0 {
            log::info!("Retrying {} errored assets", retried);
        }
        retried
    }

    /// Number of records in `ERROR`.
    pub fn error_count(&self) -> usize {
        self.count_where(|status| status.contains(AssetStatus::ERROR))
    }

    /// Flags every unreferenced record untouched for at least `min_age` for
    /// unloading. The unload queue is drained over the following ticks.
    /// Returns how many records were queued.
    pub fn unload_unused_async(&mut self, min_age: Option<std::time::Duration>) -> usize {
        let now = self.clock.now();
        let min_age = min_age.unwrap_or_default();
        let mut queued = 0;
        for handle in self.store.handles() {
            let Some(state) = self.store.state_mut(handle) else {
                continue;
            };
            if state.ref_count > 0 || state.status.contains(AssetStatus::PENDING_UNLOAD) {
                continue;
            }
            if now.saturating_sub(state.last_access) < min_age {
                continue;
            }
            state.status.insert(AssetStatus::PENDING_UNLOAD);
            self.eviction.queue_unload(handle);
            queued += 1;
        }
        log::debug!("Queued {} unused assets for unloading", queued);
        queued
    }

    /// Synchronously unloads every record and resets the cache, whatever the
    /// reference counts.
    pub fn unload_all(&mut self) {
        let handles = self.store.handles();
        let count = handles.len();
        for handle in handles {
            self.unload_record(handle);
        }
        self.index.clear();
        self.scheduler.clear();
        self.eviction.reset();
        self.resources.clear();
        if let Some(metrics) = &self.metrics {
            for kind in AssetKind::ALL {
                metrics.set_memory(kind, 0);
            }
        }
        log::info!("Unloaded all {} assets.", count);
    }

    /// Sets or clears the memory budget of a kind.
    pub fn set_budget(&mut self, kind: AssetKind, bytes: Option<u64>) {
        self.eviction.set_budget(kind, bytes);
    }

    /// The memory budget of a kind.
    pub fn budget(&self, kind: AssetKind) -> Option<u64> {
        self.eviction.budget(kind)
    }

    /// Current and peak memory usage of a kind.
    pub fn usage(&self, kind: AssetKind) -> MemoryStat {
        self.eviction.usage(kind)
    }

    /// The global event channel (load-begin, load-result, evicted).
    ///
    /// It holds at most `event_capacity` unread events; older ones are dropped.
    pub fn events(&self) -> &flume::Receiver<CacheEvent> {
        self.events.receiver()
    }

    /// Events dropped unread because the channel was full.
    pub fn dropped_events(&self) -> u64 {
        self.events.dropped_count()
    }

    /// The registry the cache records metrics into.
    pub fn metrics_registry(&self) -> &MetricsRegistry {
        &self.metrics_registry
    }

    /// Reference count of a record, `None` for stale handles.
    pub fn refcount(&self, handle: AssetHandle) -> Option<u32> {
        self.store.state(handle).map(|state| state.ref_count)
    }

    /// Records waiting in the load queues.
    pub fn pending_load_count(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// Fetches in flight.
    pub fn in_flight_count(&self) -> usize {
        self.scheduler.in_flight_count()
    }

    /// Live records.
    pub fn record_count(&self) -> usize {
        self.store.len()
    }

    /// The effective per-frame load cap.
    pub fn max_loads_per_frame(&self) -> usize {
        self.max_loads_per_frame
    }

    /// The effective per-frame unload cap.
    pub fn max_unloads_per_frame(&self) -> usize {
        self.max_unloads_per_frame
    }

    // --- Hot reload ---

    /// Drops the resource of `address` and loads it again under the same handle.
    pub fn on_modified(&mut self, address: &str) -> bool {
        let Some(handle) = self.handle_for_address(address) else {
            return false;
        };
        self.abandon_fetch(handle);
        self.release_resource(handle);
        if let Some(state) = self.store.state_mut(handle) {
            state.status.remove(AssetStatus::LOADED | AssetStatus::ERROR | AssetStatus::LOADING);
            state.status.insert(AssetStatus::PENDING_LOAD);
            state.last_result = None;
        }
        if let Some(load) = self.store.load_mut(handle) {
            load.retry_count = 0;
        }
        if !self.scheduler.is_queued(handle) {
            self.scheduler.enqueue(handle);
        }
        log::info!("Reloading '{}' ({})", address, handle);
        true
    }

    /// Drops the resource of `address` and marks its record `ERROR`.
    pub fn on_deleted(&mut self, address: &str) -> bool {
        let Some(handle) = self.handle_for_address(address) else {
            return false;
        };
        self.abandon_fetch(handle);
        self.release_resource(handle);
        self.scheduler.forget(handle);
        let declared_size = self.declared_size(handle);
        if let Some(state) = self.store.state_mut(handle) {
            state.status.remove(
                AssetStatus::LOADED | AssetStatus::LOADING | AssetStatus::PENDING_LOAD,
            );
            state.status.insert(AssetStatus::ERROR);
            state.last_result = Some(LoadResultKind::Unknown);
        }
        log::warn!("Source of '{}' was deleted", address);
        self.report_result(handle, declared_size, LoadResultKind::Unknown);
        true
    }

    // --- Tick ---

    /// Advances the cache by one frame.
    ///
    /// In order: consume finished fetches, drain the unload queue, evict one
    /// record per kind that is over budget, promote due retries, dispatch new
    /// fetches, then poll the change notifier.
    pub fn tick(&mut self) {
        if !self.initialized {
            return;
        }
        self.process_completions();
        self.drain_unload_queue();
        self.evict_over_budget();
        self.scheduler.promote_due(self.clock.now());
        self.dispatch_loads();
        self.poll_changes();
        self.frame_count += 1;
    }

    fn process_completions(&mut self) {
        let mut completions = std::mem::take(&mut self.completions);
        self.transport.poll_completions(&mut completions);
        for completion in completions.drain(..) {
            self.complete_fetch(completion);
        }
        self.completions = completions;
    }

    fn complete_fetch(&mut self, completion: FetchCompletion) {
        let Some(handle) = self.scheduler.finish_flight(completion.ticket) else {
            log::trace!("Discarding stale completion {:?}", completion.ticket);
            return;
        };
        let Some(load) = self.store.load_mut(handle) else {
            return;
        };
        if load.ticket != Some(completion.ticket) {
            return;
        }
        load.ticket = None;

        let unload = self.store.state(handle).is_some_and(|state| {
            state.ref_count == 0 && state.status.contains(AssetStatus::PENDING_UNLOAD)
        });
        if unload {
            log::debug!("Discarding load of {}: released while in flight", handle);
            self.unload_record(handle);
            return;
        }

        match completion.result {
            Ok(bytes) => self.finish_load(handle, bytes),
            Err(err) => self.fail_load(handle, err),
        }
    }

    fn finish_load(&mut self, handle: AssetHandle, bytes: Vec<u8>) {
        let Some(meta) = self.store.meta(handle) else {
            return;
        };
        let kind = meta.kind;
        let declared_size = meta.declared_size;
        let request = FetchRequest {
            handle,
            address: &meta.address,
            fetch_address: &meta.fetch_address,
            settings: &meta.settings,
            declared_size,
        };
        let decoded = self
            .loaders
            .decode(kind, &request, bytes, self.metrics.as_ref());

        let loaded = match decoded {
            Ok(loaded) => loaded,
            Err(err) => return self.fail_load(handle, err),
        };

        let resource_id = loaded.resource.id();
        if let Some(state) = self.store.state_mut(handle) {
            state.status.remove(AssetStatus::LOADING | AssetStatus::PENDING_LOAD);
            state.status.insert(AssetStatus::LOADED);
            state.byte_size = loaded.byte_size;
            state.resource = Some(loaded.resource);
            state.last_result = Some(LoadResultKind::Success);
        }
        if let Some(load) = self.store.load_mut(handle) {
            load.retry_count = 0;
        }
        self.resources.insert(resource_id, handle);
        let current = self.eviction.charge(kind, loaded.byte_size);
        if let Some(metrics) = &self.metrics {
            metrics.set_memory(kind, current);
        }
        log::debug!("Loaded {} ({} bytes)", handle, loaded.byte_size);
        self.report_result(handle, declared_size, LoadResultKind::Success);
    }

    fn fail_load(&mut self, handle: AssetHandle, err: FetchError) {
        let now = self.clock.now();
        let declared_size = self.declared_size(handle);
        let retry_count = self.store.load(handle).map_or(0, |load| load.retry_count);
        let result = err.kind();
        self.events.publish(CacheEvent::LoadResult {
            handle,
            declared_size,
            result,
        });

        if err.is_transport() && retry_count < self.config.retry_limit {
            let delay = self.config.retry_delay(retry_count);
            if let Some(load) = self.store.load_mut(handle) {
                load.retry_count += 1;
            }
            if let Some(state) = self.store.state_mut(handle) {
                state.status.remove(AssetStatus::LOADING);
                state.status.insert(AssetStatus::PENDING_LOAD);
            }
            self.scheduler.enqueue_delayed(handle, now + delay);
            if let Some(metrics) = &self.metrics {
                CacheMetrics::bump(&metrics.retries_scheduled);
            }
            log::warn!(
                "Fetch of {} failed ({}), retry {}/{} in {:?}",
                handle,
                err,
                retry_count + 1,
                self.config.retry_limit,
                delay
            );
            return;
        }

        if let Some(state) = self.store.state_mut(handle) {
            state.status.remove(AssetStatus::LOADING | AssetStatus::PENDING_LOAD);
            state.status.insert(AssetStatus::ERROR);
            state.last_result = Some(result);
        }
        if let Some(metrics) = &self.metrics {
            CacheMetrics::bump(&metrics.loads_failed);
        }
        let address = self.store.meta(handle).map(|meta| meta.address.as_str());
        log::error!(
            "Failed to load '{}': {}",
            address.unwrap_or_default(),
            err
        );
        CallbackDispatcher::notify(&self.store, handle, result);
    }

    fn drain_unload_queue(&mut self) {
        for handle in self.eviction.take_unloads(self.max_unloads_per_frame) {
            let eligible = self.store.state(handle).is_some_and(|state| {
                state.ref_count == 0 && state.status.contains(AssetStatus::PENDING_UNLOAD)
            });
            if eligible {
                self.unload_record(handle);
            }
        }
    }

    fn evict_over_budget(&mut self) {
        let now = self.clock.now();
        for kind in AssetKind::ALL {
            let Some(overage) = self.eviction.overage(kind) else {
                continue;
            };
            let store = &self.store;
            let candidates = store.handles().into_iter().filter_map(|handle| {
                let meta = store.meta(handle)?;
                let state = store.state(handle)?;
                let eligible = meta.kind == kind
                    && state.ref_count == 0
                    && state.status.contains(AssetStatus::LOADED);
                eligible.then(|| EvictionCandidate {
                    handle,
                    byte_size: state.byte_size,
                    age_secs: now.saturating_sub(state.last_access).as_secs_f64(),
                })
            });
            let Some(victim) = select_victim(overage, candidates) else {
                continue;
            };

            log::debug!(
                "Evicting {} ({} bytes) to cover {} bytes over the {} budget",
                victim.handle,
                victim.byte_size,
                overage,
                kind
            );
            self.unload_record(victim.handle);
            self.events.publish(CacheEvent::Evicted {
                handle: victim.handle,
                kind,
                byte_size: victim.byte_size,
            });
            if let Some(metrics) = &self.metrics {
                CacheMetrics::bump(&metrics.evictions);
            }
        }
    }

    fn dispatch_loads(&mut self) {
        let mut dispatched = 0;
        while dispatched < self.max_loads_per_frame
            && self.scheduler.in_flight_count() < self.config.max_in_flight
        {
            let Some(handle) = self.scheduler.pop_immediate() else {
                break;
            };
            let Some(state) = self.store.state(handle) else {
                continue;
            };
            let skip = AssetStatus::PENDING_UNLOAD
                | AssetStatus::LOADING
                | AssetStatus::LOADED
                | AssetStatus::ERROR;
            if state.status.intersects(skip) || !state.status.contains(AssetStatus::PENDING_LOAD)
            {
                continue;
            }

            let retry_attempt = self.store.load(handle).map_or(0, |load| load.retry_count);
            let Some(meta) = self.store.meta(handle) else {
                continue;
            };
            let declared_size = meta.declared_size;
            let begun = match self.loaders.get_mut(meta.kind) {
                Some(lane) => {
                    let request = FetchRequest {
                        handle,
                        address: &meta.address,
                        fetch_address: &meta.fetch_address,
                        settings: &meta.settings,
                        declared_size,
                    };
                    lane.begin_fetch(&request, self.transport.as_mut())
                }
                None => Err(FetchError::Unknown(format!(
                    "no loader registered for {}",
                    meta.kind
                ))),
            };

            match begun {
                Ok(ticket) => {
                    if let Some(load) = self.store.load_mut(handle) {
                        load.ticket = Some(ticket);
                    }
                    if let Some(state) = self.store.state_mut(handle) {
                        state.status.remove(AssetStatus::PENDING_LOAD);
                        state.status.insert(AssetStatus::LOADING);
                    }
                    self.scheduler.begin_flight(ticket, handle);
                    self.events.publish(CacheEvent::LoadBegin {
                        handle,
                        declared_size,
                        retry_attempt,
                    });
                    if let Some(metrics) = &self.metrics {
                        CacheMetrics::bump(&metrics.loads_started);
                    }
                    log::debug!("Dispatched {} (attempt {})", handle, retry_attempt + 1);
                    dispatched += 1;
                }
                Err(err) => self.fail_load(handle, err),
            }
        }
    }

    fn poll_changes(&mut self) {
        let Some(notifier) = self.change_notifier.as_mut() else {
            return;
        };
        for change in notifier.poll_changes() {
            match change {
                AssetChange::Modified(address) => {
                    self.on_modified(&address);
                }
                AssetChange::Deleted(address) => {
                    self.on_deleted(&address);
                }
            }
        }
    }

    // --- Record helpers ---

    fn declared_size(&self, handle: AssetHandle) -> u64 {
        self.store.meta(handle).map_or(0, |meta| meta.declared_size)
    }

    fn count_where(&self, predicate: impl Fn(AssetStatus) -> bool) -> usize {
        self.store
            .handles()
            .into_iter()
            .filter_map(|handle| self.store.state(handle))
            .filter(|state| predicate(state.status))
            .count()
    }

    fn report_result(&mut self, handle: AssetHandle, declared_size: u64, result: LoadResultKind) {
        self.events.publish(CacheEvent::LoadResult {
            handle,
            declared_size,
            result,
        });
        CallbackDispatcher::notify(&self.store, handle, result);
    }

    /// Cancels the in-flight fetch of a record, if any. Returns whether one was.
    fn abandon_fetch(&mut self, handle: AssetHandle) -> bool {
        let Some(ticket) = self.store.load_mut(handle).and_then(|load| load.ticket.take()) else {
            return false;
        };
        self.scheduler.finish_flight(ticket);
        let kind = self.store.meta(handle).map(|meta| meta.kind);
        match kind.and_then(|kind| self.loaders.get_mut(kind)) {
            Some(lane) => lane.cancel_fetch(ticket, self.transport.as_mut()),
            None => self.transport.cancel(ticket),
        }
        true
    }

    /// Releases the bound resource of a record through its lane.
    fn release_resource(&mut self, handle: AssetHandle) {
        let Some(kind) = self.store.meta(handle).map(|meta| meta.kind) else {
            return;
        };
        let Some(state) = self.store.state_mut(handle) else {
            return;
        };
        let Some(resource) = state.resource.take() else {
            return;
        };
        let byte_size = std::mem::take(&mut state.byte_size);
        self.resources.remove(&resource.id());
        self.loaders.release(kind, &resource);
        let current = self.eviction.discharge(kind, byte_size);
        if let Some(metrics) = &self.metrics {
            metrics.set_memory(kind, current);
        }
    }

    /// Destroys a record: cancels its load, notifies waiting subscribers with
    /// `Cancelled`, releases its resource and frees its slot.
    fn unload_record(&mut self, handle: AssetHandle) -> bool {
        let Some(address) = self.store.meta(handle).map(|meta| meta.address.clone()) else {
            return false;
        };
        self.abandon_fetch(handle);

        let unresolved = self
            .store
            .state(handle)
            .is_some_and(|state| state.status.is_in_progress());
        if unresolved {
            let declared_size = self.declared_size(handle);
            if let Some(state) = self.store.state_mut(handle) {
                state.status = AssetStatus::UNLOADED;
                state.last_result = Some(LoadResultKind::Cancelled);
            }
            self.report_result(handle, declared_size, LoadResultKind::Cancelled);
        }

        self.release_resource(handle);
        self.scheduler.forget(handle);
        self.index.remove(&address, handle);
        log::debug!("Unloaded '{}' ({})", address, handle);
        self.store.free(handle)
    }
}

impl Agent for AssetCache {
    fn name(&self) -> &'static str {
        "AssetCache"
    }

    fn apply_strategy(&mut self, strategy: StrategyId) {
        log::info!("AssetCache: Strategy update to {:?}", strategy);
        self.current_strategy = strategy;

        let scale = |base: usize| match strategy {
            StrategyId::LowPower => (base / LOW_POWER_DIVISOR).max(1),
            StrategyId::Balanced => base.max(1),
            StrategyId::HighPerformance => base.max(1) * HIGH_PERFORMANCE_MULTIPLIER,
            StrategyId::Custom(cap) => (cap as usize).clamp(1, 100),
        };
        self.max_loads_per_frame = scale(self.config.max_loads_per_frame);
        self.max_unloads_per_frame = scale(self.config.max_unloads_per_frame);
    }

    fn update(&mut self) {
        self.tick();
    }

    fn report_status(&self) -> AgentStatus {
        let errors = self.error_count();
        let pending = self.pending_load_count();
        let records = self.record_count().max(1);
        let error_ratio = errors as f32 / records as f32;
        let backlog = if pending == 0 {
            1.0
        } else if pending < 100 {
            0.8
        } else if pending < 500 {
            0.5
        } else {
            0.2
        };

        AgentStatus {
            agent: self.name(),
            health_score: backlog * (1.0 - error_ratio),
            current_strategy: self.current_strategy,
            is_stalled: pending > 0 && self.scheduler.in_flight_count() >= self.config.max_in_flight,
            message: format!(
                "records={} pending={} in_flight={} errors={} frame={}",
                self.record_count(),
                pending,
                self.in_flight_count(),
                errors,
                self.frame_count,
            ),
        }
    }
}

impl Drop for AssetCache {
    fn drop(&mut self) {
        if self.initialized {
            self.unload_all();
            self.transport.shutdown();
        }
    }
}
