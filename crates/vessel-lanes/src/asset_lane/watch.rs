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

//! Filesystem change notification for hot reload.

use crossbeam_channel::Receiver;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use vessel_core::address::AddressResolver;
use vessel_core::lane::{Lane, LaneKind};
use vessel_core::watch::{AssetChange, ChangeNotifier};

/// Watches the streaming root and reports edits as address-level changes.
pub struct FsChangeNotifier {
    _watcher: RecommendedWatcher,
    events: Receiver<notify::Result<Event>>,
    resolver: AddressResolver,
}

impl FsChangeNotifier {
    /// Starts watching the streaming root of `resolver` recursively.
    pub fn new(resolver: AddressResolver) -> notify::Result<Self> {
        let (tx, events) = crossbeam_channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(resolver.streaming_root(), RecursiveMode::Recursive)?;
        log::info!(
            "Watching '{}' for asset changes.",
            resolver.streaming_root().display()
        );
        Ok(Self {
            _watcher: watcher,
            events,
            resolver,
        })
    }

    fn classify(kind: &EventKind) -> Option<fn(String) -> AssetChange> {
        match kind {
            EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                Some(AssetChange::Deleted)
            }
            EventKind::Create(_) | EventKind::Modify(_) => Some(AssetChange::Modified),
            _ => None,
        }
    }

    fn push(&self, changes: &mut Vec<AssetChange>, path: &Path, make: fn(String) -> AssetChange) {
        let Some(address) = self.resolver.address_for_path(path) else {
            return;
        };
        // Editors emit bursts; keep only the latest change per address.
        changes.retain(|change| change.address() != address);
        changes.push(make(address));
    }
}

impl ChangeNotifier for FsChangeNotifier {
    fn poll_changes(&mut self) -> Vec<AssetChange> {
        let mut changes = Vec::new();
        for res in self.events.try_iter() {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    log::warn!("File watcher error: {}", err);
                    continue;
                }
            };
            let Some(make) = Self::classify(&event.kind) else {
                continue;
            };
            for path in &event.paths {
                self.push(&mut changes, path, make);
            }
        }
        changes
    }
}

impl Lane for FsChangeNotifier {
    fn strategy_name(&self) -> &'static str {
        "FsChangeNotifier"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Watcher
    }
}
