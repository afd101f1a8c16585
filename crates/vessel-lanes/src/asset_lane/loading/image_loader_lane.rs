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

//! Image loading: decode, optional downscale and mip accounting.

use crate::asset_lane::loader::{decode_error, FetchRequest, TypeLoaderLane};
use anyhow::{Context, Result};
use vessel_core::asset::{Asset, AssetKind, LoadedResource};
use vessel_core::error::FetchError;
use vessel_core::lane::{Lane, LaneKind};
use vessel_core::manifest::ImageSettings;

/// A decoded RGBA8 image.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Tightly packed RGBA8 pixels of the base level.
    pub pixels: Vec<u8>,
    /// Number of mip levels the image is accounted for, `1` without mipmaps.
    pub mip_level_count: u32,
}

impl Asset for ImageAsset {
    fn byte_size(&self) -> u64 {
        let base = self.pixels.len() as u64;
        if self.mip_level_count > 1 {
            base * 4 / 3
        } else {
            base
        }
    }
}

/// Number of levels in a full mip chain for the given extent.
fn mip_levels(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// A lane dedicated to decoding image files on the CPU.
#[derive(Debug, Default)]
pub struct ImageLoaderLane;

impl ImageLoaderLane {
    /// Creates a new instance of `ImageLoaderLane`.
    pub fn new() -> Self {
        Self
    }

    fn decode(bytes: &[u8], settings: &ImageSettings) -> Result<ImageAsset> {
        let mut img = image::load_from_memory(bytes).context("Failed to decode image from memory")?;

        if let Some(max) = settings.max_size.filter(|&max| max > 0) {
            if img.width() > max || img.height() > max {
                img = img.resize(max, max, image::imageops::FilterType::Triangle);
            }
        }

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mip_level_count = if settings.mipmaps {
            mip_levels(width, height)
        } else {
            1
        };

        Ok(ImageAsset {
            width,
            height,
            pixels: rgba.into_raw(),
            mip_level_count,
        })
    }
}

impl TypeLoaderLane for ImageLoaderLane {
    fn kind(&self) -> AssetKind {
        AssetKind::Image
    }

    fn on_fetch_complete(
        &mut self,
        request: &FetchRequest<'_>,
        bytes: Vec<u8>,
    ) -> Result<LoadedResource, FetchError> {
        let asset = Self::decode(&bytes, &request.settings.image).map_err(decode_error)?;
        log::trace!(
            "Decoded '{}' to {}x{} ({} mips)",
            request.address,
            asset.width,
            asset.height,
            asset.mip_level_count
        );
        Ok(LoadedResource::new(AssetKind::Image, asset))
    }
}

impl Lane for ImageLoaderLane {
    fn strategy_name(&self) -> &'static str {
        "ImageLoader"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use vessel_core::handle::AssetHandle;
    use vessel_core::manifest::AssetSettings;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn load(bytes: Vec<u8>, settings: &AssetSettings) -> Result<LoadedResource, FetchError> {
        let request = FetchRequest {
            handle: AssetHandle::new(1, 1),
            address: "ui/test.png",
            fetch_address: "file:///assets/ui/test.png",
            settings,
            declared_size: 0,
        };
        ImageLoaderLane::new().on_fetch_complete(&request, bytes)
    }

    #[test]
    fn decodes_png_to_rgba() {
        let loaded = load(png(8, 4), &AssetSettings::default()).unwrap();
        let image = loaded.resource.downcast::<ImageAsset>().unwrap();
        assert_eq!((image.width, image.height), (8, 4));
        assert_eq!(loaded.byte_size, 8 * 4 * 4);
        assert_eq!(image.mip_level_count, 1);
    }

    #[test]
    fn max_size_downscales_keeping_aspect() {
        let mut settings = AssetSettings::default();
        settings.image.max_size = Some(16);
        let loaded = load(png(64, 32), &settings).unwrap();
        let image = loaded.resource.downcast::<ImageAsset>().unwrap();
        assert_eq!((image.width, image.height), (16, 8));
    }

    #[test]
    fn mipmaps_grow_the_footprint() {
        let mut settings = AssetSettings::default();
        settings.image.mipmaps = true;
        let loaded = load(png(16, 16), &settings).unwrap();
        let image = loaded.resource.downcast::<ImageAsset>().unwrap();
        assert_eq!(image.mip_level_count, 5);
        assert_eq!(loaded.byte_size, 16 * 16 * 4 * 4 / 3);
    }

    #[test]
    fn invalid_bytes_are_a_decode_error() {
        let err = load(vec![0, 1, 2, 3], &AssetSettings::default()).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
