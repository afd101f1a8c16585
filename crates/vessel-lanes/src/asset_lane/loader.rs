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

use vessel_core::asset::{AssetKind, LoadedResource, ResourceRef};
use vessel_core::error::FetchError;
use vessel_core::fetch::{FetchTicket, FetchTransport};
use vessel_core::handle::AssetHandle;
use vessel_core::lane::Lane;
use vessel_core::manifest::AssetSettings;

/// Everything a type loader may need to know about the record it works on.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    /// The record being loaded.
    pub handle: AssetHandle,
    /// The address the record was requested with.
    pub address: &'a str,
    /// The address handed to the transport.
    pub fetch_address: &'a str,
    /// Settings resolved from the manifest.
    pub settings: &'a AssetSettings,
    /// Size declared by the manifest, `0` when unknown.
    pub declared_size: u64,
}

/// A per-kind strategy for loading one category of assets.
///
/// This is the only code that touches a concrete resource type. The cache calls
/// `begin_fetch` when it dispatches a record, `on_fetch_complete` at the tick
/// boundary where the bytes arrive, and `release` before it frees a record that
/// holds a resource produced by this lane.
pub trait TypeLoaderLane: Lane + Send {
    /// The kind this lane loads.
    fn kind(&self) -> AssetKind;

    /// Starts the fetch for `request`.
    ///
    /// The default forwards the fetch address to the transport.
    fn begin_fetch(
        &mut self,
        request: &FetchRequest<'_>,
        transport: &mut dyn FetchTransport,
    ) -> Result<FetchTicket, FetchError> {
        transport.begin(request.fetch_address)
    }

    /// Abandons an in-flight fetch.
    fn cancel_fetch(&mut self, ticket: FetchTicket, transport: &mut dyn FetchTransport) {
        transport.cancel(ticket);
    }

    /// Decodes the fetched bytes and applies the declared settings.
    fn on_fetch_complete(
        &mut self,
        request: &FetchRequest<'_>,
        bytes: Vec<u8>,
    ) -> Result<LoadedResource, FetchError>;

    /// Gives back whatever the lane holds for `resource`.
    fn release(&mut self, _resource: &ResourceRef) {}
}

/// Converts a decoder failure into the error reported to subscribers.
pub(crate) fn decode_error(err: anyhow::Error) -> FetchError {
    FetchError::Decode(format!("{err:#}"))
}
