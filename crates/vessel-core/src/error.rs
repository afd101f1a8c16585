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

//! Error types shared across the cache.

use crate::asset::AssetKind;
use crate::status::LoadResultKind;
use thiserror::Error;

/// A failure while fetching or decoding a single asset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The transport could not reach the resource (connection refused, missing file...).
    #[error("network error: {0}")]
    Network(String),
    /// The remote end answered with an error status.
    #[error("server error {status}: {message}")]
    Server {
        /// Status code reported by the server.
        status: u16,
        /// Reason text reported by the server.
        message: String,
    },
    /// The payload could not be decoded into a resource.
    #[error("decode error: {0}")]
    Decode(String),
    /// The fetch was cancelled before it completed.
    #[error("fetch cancelled")]
    Cancelled,
    /// Anything else.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl FetchError {
    /// Maps the error onto the reported load outcome.
    pub fn kind(&self) -> LoadResultKind {
        match self {
            FetchError::Network(_) => LoadResultKind::NetworkError,
            FetchError::Server { .. } => LoadResultKind::ServerError,
            FetchError::Decode(_) => LoadResultKind::DecodeError,
            FetchError::Cancelled => LoadResultKind::Cancelled,
            FetchError::Unknown(_) => LoadResultKind::Unknown,
        }
    }

    /// Returns `true` for transport failures, which are eligible for a delayed retry.
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Network(_) | FetchError::Server { .. })
    }
}

/// Errors raised by the cache service itself.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Every addressable slot is occupied.
    #[error("no free slot left in the record store")]
    SlotsExhausted,
    /// The handle is empty, stale or was never issued.
    #[error("invalid or stale asset handle")]
    InvalidHandle,
    /// No type loader is registered for the requested kind.
    #[error("no loader registered for asset kind '{0}'")]
    NoLoader(AssetKind),
    /// The manifest document could not be parsed.
    #[error("invalid manifest: {0}")]
    Manifest(#[source] serde_json::Error),
    /// The configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[source] serde_json::Error),
    /// A file could not be read.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// A relative address is empty or escapes the streaming root.
    #[error("invalid asset address '{0}'")]
    InvalidAddress(String),
    /// `init` was called twice.
    #[error("the cache is already initialized")]
    AlreadyInitialized,
    /// The cache was used before `init` or after `shutdown`.
    #[error("the cache is not initialized")]
    NotInitialized,
}

/// A specialized `Result` type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
