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

//! The cache wired to the real lanes: the threaded transport reading files
//! below a temporary streaming root, and the stock loaders.

mod common;

use anyhow::Result;
use common::ScriptedTransport;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use vessel_agents::AssetCache;
use vessel_core::{
    AssetHandle, AssetKind, AssetStatus, CacheConfig, LoadResultKind, ManualClock, Manifest,
};
use vessel_lanes::{ImageAsset, ImageLoaderLane};

fn write_png(path: &Path, width: u32, height: u32) -> Result<()> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([0, 128, 255, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Ticks until the record resolves or five seconds pass.
fn tick_until_resolved(cache: &mut AssetCache, handle: AssetHandle) -> AssetStatus {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        cache.tick();
        let status = cache.status(handle);
        if status.is_resolved() || Instant::now() > deadline {
            return status;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn loads_an_image_from_the_streaming_root() -> Result<()> {
    vessel_telemetry::init_test_logging();
    let root = tempfile::tempdir()?;
    std::fs::create_dir(root.path().join("textures"))?;
    write_png(&root.path().join("textures/hero.png"), 8, 4)?;

    let config = CacheConfig {
        streaming_root: root.path().to_path_buf(),
        ..CacheConfig::default()
    };
    let mut cache = AssetCache::with_default_lanes(config);
    cache.init()?;

    let handle = cache.request("textures/hero.png", AssetKind::Image, None)?;
    let status = tick_until_resolved(&mut cache, handle);
    assert!(status.contains(AssetStatus::LOADED), "status {status:?}");

    let image = cache.resolve_as::<ImageAsset>(handle).expect("image asset");
    assert_eq!((image.width, image.height), (8, 4));
    assert_eq!(image.pixels.len(), 8 * 4 * 4);
    assert_eq!(cache.usage(AssetKind::Image).current, 8 * 4 * 4);

    let resource = cache.resolve(handle).expect("resource");
    assert_eq!(cache.handle_for_resource(resource.id()), Some(handle));

    cache.shutdown()?;
    assert_eq!(cache.status(handle), AssetStatus::INVALID);
    Ok(())
}

#[test]
fn reinitialized_cache_restarts_the_transport() -> Result<()> {
    vessel_telemetry::init_test_logging();
    let root = tempfile::tempdir()?;
    write_png(&root.path().join("a.png"), 2, 2)?;
    let config = CacheConfig {
        streaming_root: root.path().to_path_buf(),
        ..CacheConfig::default()
    };
    let mut cache = AssetCache::with_default_lanes(config);
    cache.init()?;
    cache.shutdown()?;
    cache.init()?;

    let handle = cache.request("a.png", AssetKind::Image, None)?;
    let status = tick_until_resolved(&mut cache, handle);
    assert!(status.contains(AssetStatus::LOADED), "status {status:?}");
    assert_eq!(cache.in_flight_count(), 0);
    cache.shutdown()?;
    Ok(())
}

#[test]
fn missing_file_fails_with_a_network_error() -> Result<()> {
    vessel_telemetry::init_test_logging();
    let root = tempfile::tempdir()?;
    let config = CacheConfig {
        streaming_root: root.path().to_path_buf(),
        retry_limit: 0,
        ..CacheConfig::default()
    };
    let mut cache = AssetCache::with_default_lanes(config);
    cache.init()?;

    let (callback, seen) = common::recorder();
    let handle = cache.request("nowhere.wav", AssetKind::Audio, Some(callback))?;
    let status = tick_until_resolved(&mut cache, handle);

    assert!(status.contains(AssetStatus::ERROR), "status {status:?}");
    assert_eq!(seen.lock().unwrap()[0].result, LoadResultKind::NetworkError);
    cache.shutdown()?;
    Ok(())
}

#[test]
fn manifest_settings_reach_the_image_loader() -> Result<()> {
    vessel_telemetry::init_test_logging();
    let manifest = Manifest::from_json_str(
        r#"{
            "assets": {
                "ui/icon.png": {
                    "type": "image",
                    "size": 2048,
                    "settings": { "image": { "max_size": 16, "mipmaps": true } }
                }
            }
        }"#,
    )?;
    let transport = ScriptedTransport::new();
    let mut cache = AssetCache::new(
        CacheConfig::default(),
        Box::new(transport.clone()),
        Arc::new(ManualClock::new()),
    )
    .with_manifest(Box::new(manifest));
    cache.register_loader(Box::new(ImageLoaderLane::new()));
    cache.init()?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("icon.png");
    write_png(&path, 64, 32)?;
    transport.script("ui/icon.png", [Ok(std::fs::read(&path)?)]);
    let plain = dir.path().join("plain.png");
    write_png(&plain, 64, 32)?;
    transport.script("ui/plain.png", [Ok(std::fs::read(&plain)?)]);

    let icon = cache.request("ui/icon.png", AssetKind::Image, None)?;
    let other = cache.request("ui/plain.png", AssetKind::Image, None)?;
    cache.tick();
    cache.tick();

    let image = cache.resolve_as::<ImageAsset>(icon).expect("icon");
    assert_eq!((image.width, image.height), (16, 8));
    assert_eq!(image.mip_level_count, 5);
    let image = cache.resolve_as::<ImageAsset>(other).expect("plain");
    assert_eq!((image.width, image.height), (64, 32));
    assert_eq!(image.mip_level_count, 1);
    Ok(())
}
