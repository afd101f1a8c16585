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

//! Implements a type loader for `.wav` audio files.

use crate::asset_lane::loader::{decode_error, FetchRequest, TypeLoaderLane};
use anyhow::{anyhow, Result};
use std::io::Cursor;
use vessel_core::asset::{Asset, AssetKind, LoadedResource};
use vessel_core::error::FetchError;
use vessel_core::lane::{Lane, LaneKind};

/// Decoded PCM samples, interleaved, normalized to `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct AudioAsset {
    /// Interleaved samples.
    pub samples: Vec<f32>,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Frames per second.
    pub sample_rate: u32,
}

impl Asset for AudioAsset {
    fn byte_size(&self) -> u64 {
        (self.samples.len() * std::mem::size_of::<f32>()) as u64
    }
}

/// Averages every frame of `samples` into a single channel.
fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// A `TypeLoaderLane` that decodes audio data from the WAV format.
#[derive(Debug, Default)]
pub struct AudioLoaderLane;

impl AudioLoaderLane {
    /// Creates a new instance of `AudioLoaderLane`.
    pub fn new() -> Self {
        Self
    }

    fn decode(bytes: &[u8]) -> Result<AudioAsset> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();

        let samples: Result<Vec<f32>, _> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect(),
            hound::SampleFormat::Int => {
                let max_value = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|s| s as f32 / max_value))
                    .collect()
            }
        };
        let samples = samples.map_err(|e| anyhow!("Failed to parse WAV samples: {}", e))?;

        Ok(AudioAsset {
            samples,
            channels: spec.channels,
            sample_rate: spec.sample_rate,
        })
    }
}

impl TypeLoaderLane for AudioLoaderLane {
    fn kind(&self) -> AssetKind {
        AssetKind::Audio
    }

    fn on_fetch_complete(
        &mut self,
        request: &FetchRequest<'_>,
        bytes: Vec<u8>,
    ) -> Result<LoadedResource, FetchError> {
        let mut asset = Self::decode(&bytes).map_err(decode_error)?;
        if request.settings.audio.force_mono && asset.channels > 1 {
            asset.samples = downmix(&asset.samples, asset.channels);
            asset.channels = 1;
        }
        Ok(LoadedResource::new(AssetKind::Audio, asset))
    }
}

impl Lane for AudioLoaderLane {
    fn strategy_name(&self) -> &'static str {
        "WavLoader"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vessel_core::handle::AssetHandle;
    use vessel_core::manifest::AssetSettings;

    fn wav(channels: u16, frames: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut bytes = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
            for &sample in frames {
                writer.write_sample(sample).unwrap();
            }
            writer.finalize().unwrap();
        }
        bytes
    }

    fn load(bytes: Vec<u8>, settings: &AssetSettings) -> Result<LoadedResource, FetchError> {
        let request = FetchRequest {
            handle: AssetHandle::new(1, 1),
            address: "sfx/click.wav",
            fetch_address: "file:///assets/sfx/click.wav",
            settings,
            declared_size: 0,
        };
        AudioLoaderLane::new().on_fetch_complete(&request, bytes)
    }

    #[test]
    fn decodes_wav_samples() {
        let loaded = load(wav(1, &[0, 16384, -16384, 0]), &AssetSettings::default()).unwrap();
        let audio = loaded.resource.downcast::<AudioAsset>().unwrap();
        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.samples.len(), 4);
        assert!((audio.samples[1] - 0.5).abs() < 1e-4);
        assert_eq!(loaded.byte_size, 16);
    }

    #[test]
    fn force_mono_downmixes_frames() {
        let mut settings = AssetSettings::default();
        settings.audio.force_mono = true;
        let loaded = load(wav(2, &[16384, 0, -16384, -16384]), &settings).unwrap();
        let audio = loaded.resource.downcast::<AudioAsset>().unwrap();
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.samples.len(), 2);
        assert!((audio.samples[0] - 0.25).abs() < 1e-4);
        assert!((audio.samples[1] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn invalid_bytes_are_a_decode_error() {
        let err = load(vec![0, 1, 2, 3, 4], &AssetSettings::default()).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
