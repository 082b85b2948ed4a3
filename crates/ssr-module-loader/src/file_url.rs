// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `file:` URL helpers

use crate::error::{LoaderError, Result};
use std::path::{Path, PathBuf};
use url::Url;

/// Prefix shared by every `file:` URL the runtime hands to the hooks.
pub const FILE_PROTOCOL: &str = "file://";

/// File name of the synthetic module that marks the workspace root.
pub const WORKSPACE_ROOT_FILE: &str = "index.mjs";

/// Check whether a specifier or URL uses the file protocol.
pub fn is_file_protocol(url: &str) -> bool {
    url.starts_with(FILE_PROTOCOL)
}

/// Convert a `file:` URL into a filesystem path.
pub fn file_url_to_path(url: &str) -> Result<PathBuf> {
    let parsed = Url::parse(url).map_err(|e| LoaderError::invalid_url(url, e))?;
    if parsed.scheme() != "file" {
        return Err(LoaderError::UnsupportedUrl(url.to_string()));
    }
    parsed
        .to_file_path()
        .map_err(|_| LoaderError::invalid_url(url, "not a local file path"))
}

/// Convert an absolute filesystem path into a `file:` URL.
pub fn path_to_file_url(path: &Path) -> Result<Url> {
    Url::from_file_path(path).map_err(|_| LoaderError::InvalidPath(path.to_path_buf()))
}

/// Build the URL an output file is served under: the relative path anchored
/// at the root of the `file:` scheme.
pub fn output_file_url(relative: &str) -> Result<Url> {
    let base = Url::parse("file:///").map_err(|e| LoaderError::invalid_url("file:///", e))?;
    base.join(relative)
        .map_err(|e| LoaderError::invalid_url(relative, e))
}

/// The key an absolute path has in the output file set.
pub fn output_file_key(path: &Path) -> String {
    let path = path.to_string_lossy();
    path.strip_prefix(['/', '\\'])
        .unwrap_or(&*path)
        .to_string()
}

/// URL of the synthetic module standing in for the workspace root.
pub fn workspace_root_marker(workspace_root: &Path) -> Result<Url> {
    path_to_file_url(&workspace_root.join(WORKSPACE_ROOT_FILE))
}
