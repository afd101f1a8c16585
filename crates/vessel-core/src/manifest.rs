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

//! The optional asset manifest: declared types, sizes and per-kind settings.
//!
//! A manifest is a JSON document of the form
//!
//! ```json
//! {
//!   "defaults": { "image": { "mipmaps": true } },
//!   "assets": {
//!     "ui/logo.png": { "type": "image", "subtype": "sprite", "size": 65536,
//!                      "settings": { "image": { "max_size": 256 } } }
//!   }
//! }
//! ```
//!
//! Missing entries are not an error. The cache falls back to the defaults and
//! records a synthesized entry so later lookups see the same answer.

use crate::asset::AssetKind;
use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Settings applied by the image loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Largest allowed width or height; bigger images are downscaled keeping aspect.
    pub max_size: Option<u32>,
    /// Whether a mip chain is accounted for in the memory footprint.
    pub mipmaps: bool,
}

/// Settings applied by the audio loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Downmix every channel into one.
    pub force_mono: bool,
}

/// Settings applied by the video loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    /// Whether playback wraps around.
    pub looping: bool,
}

/// Per-kind settings, either global defaults or a per-asset override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Image settings.
    pub image: ImageSettings,
    /// Audio settings.
    pub audio: AudioSettings,
    /// Video settings.
    pub video: VideoSettings,
}

/// The declared description of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Declared kind.
    #[serde(rename = "type")]
    pub kind: AssetKind,
    /// Free-form subtype (e.g. "sprite", "music").
    #[serde(default)]
    pub subtype: String,
    /// Declared size in bytes, reported on load events. `0` when unknown.
    #[serde(default)]
    pub size: u64,
    /// Per-asset settings; `None` uses the manifest defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<AssetSettings>,
}

impl ManifestEntry {
    /// An entry carrying nothing but the kind.
    pub fn synthesized(kind: AssetKind) -> Self {
        Self {
            kind,
            subtype: String::new(),
            size: 0,
            settings: None,
        }
    }
}

/// Source of declared asset information.
pub trait ManifestProvider: Send {
    /// Looks up the entry for an address.
    fn lookup(&self, address: &str) -> Option<ManifestEntry>;

    /// Global per-kind defaults.
    fn defaults(&self) -> &AssetSettings;

    /// Stores an entry, replacing any previous one.
    fn record(&mut self, address: &str, entry: ManifestEntry);

    /// Returns the entry for `address`, synthesizing and recording one from
    /// the defaults when the manifest has none.
    fn resolve(&mut self, address: &str, kind: AssetKind) -> ManifestEntry {
        if let Some(entry) = self.lookup(address) {
            if entry.kind != kind {
                log::debug!(
                    "Manifest declares '{}' as {}, requested as {}",
                    address,
                    entry.kind,
                    kind
                );
            }
            return entry;
        }
        let entry = ManifestEntry::synthesized(kind);
        self.record(address, entry.clone());
        entry
    }

    /// The effective settings for an entry.
    fn settings_for(&self, entry: &ManifestEntry) -> AssetSettings {
        entry
            .settings
            .clone()
            .unwrap_or_else(|| self.defaults().clone())
    }
}

/// The in-memory manifest document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Settings used by entries without their own.
    pub defaults: AssetSettings,
    /// Entries keyed by declared address.
    pub assets: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// An empty manifest with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a manifest from JSON text.
    pub fn from_json_str(json: &str) -> CacheResult<Self> {
        serde_json::from_str(json).map_err(CacheError::Manifest)
    }

    /// Reads and parses a manifest file.
    pub fn load(path: impl AsRef<Path>) -> CacheResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Returns `true` when the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl ManifestProvider for Manifest {
    fn lookup(&self, address: &str) -> Option<ManifestEntry> {
        self.assets.get(address).cloned()
    }

    fn defaults(&self) -> &AssetSettings {
        &self.defaults
    }

    fn record(&mut self, address: &str, entry: ManifestEntry) {
        self.assets.insert(address.to_string(), entry);
    }
}
