// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Recognition of generated bundle entry points and chunks.
//!
//! The server bundle is emitted as `main.server.mjs` plus any number of
//! `chunk-<id>.mjs` files. They only exist in memory, so relative imports
//! made from them cannot be resolved against their own URL.

use regex::Regex;
use std::sync::LazyLock;

/// File stem of the server bundle entry point.
pub const BUNDLE_ENTRY_POINT: &str = "main.server";

/// File name prefix of lazily loaded bundle chunks.
pub const CHUNK_PREFIX: &str = "chunk-";

/// Extension shared by the entry point and chunks.
pub const BUNDLE_EXTENSION: &str = ".mjs";

static BUNDLE_ARTIFACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"file:///(?:{}|{}\w+){}",
        regex::escape(BUNDLE_ENTRY_POINT),
        regex::escape(CHUNK_PREFIX),
        regex::escape(BUNDLE_EXTENSION),
    );
    Regex::new(&pattern).unwrap()
});

/// Whether an importer URL belongs to the generated bundle.
pub fn is_bundle_entry_point_or_chunk(parent_url: Option<&str>) -> bool {
    parent_url.is_some_and(|url| BUNDLE_ARTIFACT_RE.is_match(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_bundle(url: &str) -> bool {
        is_bundle_entry_point_or_chunk(Some(url))
    }

    #[test]
    fn test_entry_point() {
        assert!(is_bundle("file:///main.server.mjs"));
    }

    #[test]
    fn test_chunk() {
        assert!(is_bundle("file:///chunk-XYZ123.mjs"));
        assert!(is_bundle("file:///chunk-A1_b2.mjs"));
    }

    #[test]
    fn test_non_bundle_urls() {
        assert!(!is_bundle("file:///main.mjs"));
        assert!(!is_bundle("file:///chunk-.mjs"));
        assert!(!is_bundle("file:///chunk-abc.js"));
        assert!(!is_bundle("https://main.server.mjs"));
        assert!(!is_bundle("file:///work/app/src/a.mjs"));
        assert!(!is_bundle_entry_point_or_chunk(None));
    }
}
