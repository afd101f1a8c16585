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

//! Video loading backed by a bounded pool of reusable decoders.

use crate::asset_lane::loader::{FetchRequest, TypeLoaderLane};
use std::collections::HashMap;
use vessel_core::asset::{Asset, AssetKind, LoadedResource, ResourceId, ResourceRef};
use vessel_core::error::FetchError;
use vessel_core::lane::{Lane, LaneKind};

const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// The container format a clip was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoContainer {
    /// ISO base media (`.mp4`, `.mov`).
    Mp4,
    /// Matroska / WebM.
    Matroska,
}

/// A video clip bound to a decoder.
#[derive(Debug, Clone)]
pub struct VideoAsset {
    /// Container of the clip.
    pub container: VideoContainer,
    /// Whether playback wraps around.
    pub looping: bool,
    /// The encoded stream.
    pub data: Vec<u8>,
    /// Id of the decoder the clip is bound to.
    pub decoder_id: u32,
}

impl Asset for VideoAsset {
    fn byte_size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// A decoder instance. Pooled decoders are reused across clips, transient ones
/// are dropped on release.
#[derive(Debug)]
pub struct VideoDecoder {
    id: u32,
    pooled: bool,
}

impl VideoDecoder {
    /// Id of this decoder.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Whether the decoder goes back to the pool on release.
    pub fn is_pooled(&self) -> bool {
        self.pooled
    }

    /// Probes the container of `bytes`.
    pub fn open(&self, bytes: &[u8]) -> Result<VideoContainer, FetchError> {
        if bytes.len() >= 8 && &bytes[4..8] == b"ftyp" {
            return Ok(VideoContainer::Mp4);
        }
        if bytes.starts_with(&EBML_MAGIC) {
            return Ok(VideoContainer::Matroska);
        }
        Err(FetchError::Decode("unrecognised video container".to_string()))
    }
}

/// A bounded set of reusable decoders.
///
/// Running out is not an error: the pool logs a warning and hands out a
/// transient decoder that is dropped when released.
#[derive(Debug)]
pub struct DecoderPool {
    idle: Vec<VideoDecoder>,
    capacity: usize,
    created: usize,
    next_id: u32,
}

impl DecoderPool {
    /// Creates a pool that keeps at most `capacity` decoders.
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: Vec::with_capacity(capacity),
            capacity,
            created: 0,
            next_id: 1,
        }
    }

    /// Takes an idle decoder, creates one while under capacity, or falls back
    /// to a transient decoder.
    pub fn acquire(&mut self) -> VideoDecoder {
        if let Some(decoder) = self.idle.pop() {
            return decoder;
        }
        let pooled = self.created < self.capacity;
        if pooled {
            self.created += 1;
        } else {
            log::warn!(
                "Video decoder pool exhausted ({} in use), allocating a transient decoder",
                self.capacity
            );
        }
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        VideoDecoder { id, pooled }
    }

    /// Returns a decoder. Transient decoders are dropped.
    pub fn give_back(&mut self, decoder: VideoDecoder) {
        if decoder.pooled {
            self.idle.push(decoder);
        }
    }

    /// Decoders that can be handed out without falling back.
    pub fn available(&self) -> usize {
        self.idle.len() + (self.capacity - self.created)
    }

    /// Maximum number of pooled decoders.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// The video type loader. Each loaded clip leases a decoder until released.
#[derive(Debug)]
pub struct VideoLoaderLane {
    pool: DecoderPool,
    leases: HashMap<ResourceId, VideoDecoder>,
}

impl VideoLoaderLane {
    /// Creates a lane with `pool_size` reusable decoders.
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool: DecoderPool::new(pool_size),
            leases: HashMap::new(),
        }
    }

    /// The decoder pool.
    pub fn pool(&self) -> &DecoderPool {
        &self.pool
    }

    /// Number of clips currently holding a decoder.
    pub fn active_decoders(&self) -> usize {
        self.leases.len()
    }
}

impl TypeLoaderLane for VideoLoaderLane {
    fn kind(&self) -> AssetKind {
        AssetKind::Video
    }

    fn on_fetch_complete(
        &mut self,
        request: &FetchRequest<'_>,
        bytes: Vec<u8>,
    ) -> Result<LoadedResource, FetchError> {
        let decoder = self.pool.acquire();
        let container = match decoder.open(&bytes) {
            Ok(container) => container,
            Err(err) => {
                self.pool.give_back(decoder);
                return Err(err);
            }
        };

        let loaded = LoadedResource::new(
            AssetKind::Video,
            VideoAsset {
                container,
                looping: request.settings.video.looping,
                data: bytes,
                decoder_id: decoder.id(),
            },
        );
        self.leases.insert(loaded.resource.id(), decoder);
        Ok(loaded)
    }

    fn release(&mut self, resource: &ResourceRef) {
        if let Some(decoder) = self.leases.remove(&resource.id()) {
            self.pool.give_back(decoder);
        }
    }
}

impl Lane for VideoLoaderLane {
    fn strategy_name(&self) -> &'static str {
        "VideoLoader"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Loader
    }
}
