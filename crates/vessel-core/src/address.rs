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

//! Content addresses: hashing and resolution to fetchable URLs.

use crate::error::{CacheError, CacheResult};
use std::path::{Path, PathBuf};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

const FILE_SCHEME: &str = "file://";

/// 32-bit FNV-1a hash of an address string.
pub fn fnv1a_32(address: &str) -> u32 {
    address.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ byte as u32).wrapping_mul(FNV_PRIME)
    })
}

/// Returns `true` when the address carries a scheme separator and is therefore
/// passed to the transport unchanged.
pub fn is_remote(address: &str) -> bool {
    address.contains("://")
}

/// Turns declared addresses into fetch addresses.
///
/// Absolute addresses (anything with a scheme) pass through untouched. Relative
/// addresses are resolved against the local streaming root and converted to a
/// `file://` URL in the platform's path convention.
#[derive(Debug, Clone)]
pub struct AddressResolver {
    streaming_root: PathBuf,
}

impl AddressResolver {
    /// Creates a resolver rooted at `streaming_root`. Relative roots are made
    /// absolute against the current directory.
    pub fn new(streaming_root: impl Into<PathBuf>) -> Self {
        let root = streaming_root.into();
        let streaming_root = std::path::absolute(&root).unwrap_or(root);
        Self { streaming_root }
    }

    /// The absolute streaming root.
    pub fn streaming_root(&self) -> &Path {
        &self.streaming_root
    }

    /// Resolves a declared address to the address handed to the transport.
    ///
    /// Relative addresses are normalized first. One that is empty or climbs
    /// above the streaming root with `..` is rejected.
    pub fn resolve(&self, address: &str) -> CacheResult<String> {
        if is_remote(address) {
            return Ok(address.to_string());
        }
        let relative = normalize_relative(address)
            .ok_or_else(|| CacheError::InvalidAddress(address.to_string()))?;
        Ok(file_url(&self.streaming_root.join(relative)))
    }

    /// Maps a file below the streaming root back to its declared address.
    ///
    /// Returns `None` for paths outside the root.
    pub fn address_for_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.streaming_root).ok()?;
        let address = relative.to_string_lossy().replace('\\', "/");
        (!address.is_empty()).then_some(address)
    }
}

/// Lexically normalizes a relative address into a path below the root.
///
/// Both separators are accepted, leading separators and `.` are ignored and
/// `..` pops the previous component. Returns `None` when nothing is left or a
/// `..` has nothing to pop.
fn normalize_relative(address: &str) -> Option<PathBuf> {
    let mut parts: Vec<&str> = Vec::new();
    for part in address.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            // Drive prefixes would replace the root when joined.
            part if cfg!(windows) && part.contains(':') => return None,
            part => parts.push(part),
        }
    }
    (!parts.is_empty()).then(|| parts.iter().collect())
}

/// Converts a local path to a `file://` URL.
pub fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    if path.starts_with('/') {
        format!("{FILE_SCHEME}{path}")
    } else {
        // Drive-letter paths (`C:/...`) need the extra slash.
        format!("{FILE_SCHEME}/{path}")
    }
}

/// Converts a `file://` URL back to a local path. Returns `None` for other schemes.
pub fn path_from_file_url(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix(FILE_SCHEME)?;
    if cfg!(windows) {
        let bytes = rest.as_bytes();
        if bytes.len() >= 3 && bytes[0] == b'/' && bytes[2] == b':' {
            return Some(PathBuf::from(&rest[1..]));
        }
    }
    Some(PathBuf::from(rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_reference_values() {
        assert_eq!(fnv1a_32(""), 0x811c_9dc5);
        assert_eq!(fnv1a_32("a"), 0xe40c_292c);
        assert_eq!(fnv1a_32("foobar"), 0xbf9c_f968);
    }

    #[test]
    fn remote_addresses_pass_through() {
        let resolver = AddressResolver::new("/srv/assets");
        let url = "https://cdn.example.com/a.png";
        assert_eq!(resolver.resolve(url).unwrap(), url);
        assert_eq!(
            resolver.resolve("https://cdn.example.com/../a.png").unwrap(),
            "https://cdn.example.com/../a.png"
        );
    }

    #[cfg(unix)]
    #[test]
    fn local_addresses_become_file_urls() {
        let resolver = AddressResolver::new("/srv/assets");
        assert_eq!(resolver.resolve("ui/a.png").unwrap(), "file:///srv/assets/ui/a.png");
        assert_eq!(resolver.resolve("/ui/a.png").unwrap(), "file:///srv/assets/ui/a.png");
        assert_eq!(
            path_from_file_url("file:///srv/assets/ui/a.png"),
            Some(PathBuf::from("/srv/assets/ui/a.png"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn dot_segments_are_normalized_below_the_root() {
        let resolver = AddressResolver::new("/srv/assets");
        assert_eq!(
            resolver.resolve("ui/./icons/../a.png").unwrap(),
            "file:///srv/assets/ui/a.png"
        );
        assert_eq!(
            resolver.resolve("ui\\..\\b.png").unwrap(),
            "file:///srv/assets/b.png"
        );
    }

    #[test]
    fn addresses_escaping_the_root_are_rejected() {
        let resolver = AddressResolver::new("/srv/assets");
        for address in ["../../etc/passwd", "ui/../../secret", "..\\a.png", "", "/", "./."] {
            assert!(
                matches!(resolver.resolve(address), Err(CacheError::InvalidAddress(_))),
                "{address:?} should be rejected"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn paths_map_back_to_addresses() {
        let resolver = AddressResolver::new("/srv/assets");
        assert_eq!(
            resolver.address_for_path(Path::new("/srv/assets/ui/a.png")),
            Some("ui/a.png".to_string())
        );
        assert_eq!(resolver.address_for_path(Path::new("/tmp/a.png")), None);
    }

    #[test]
    fn non_file_urls_have_no_path() {
        assert!(path_from_file_url("http://example.com/a.png").is_none());
    }
}
