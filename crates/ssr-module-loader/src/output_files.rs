// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Immutable in-memory build output

use std::collections::HashMap;
use std::sync::Arc;

/// Bundled build output, keyed by relative path without a leading slash.
///
/// Cloning is cheap; all clones share the same files.
#[derive(Debug, Clone, Default)]
pub struct OutputFileSet {
    files: Arc<HashMap<String, String>>,
}

impl OutputFileSet {
    /// Create a file set from relative path -> content pairs
    pub fn new(files: HashMap<String, String>) -> Self {
        Self {
            files: Arc::new(files),
        }
    }

    /// Get the content of a file
    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Check if a file is part of the output
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Get all relative paths, sorted
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.files.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// Get the number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the output is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl From<HashMap<String, String>> for OutputFileSet {
    fn from(files: HashMap<String, String>) -> Self {
        Self::new(files)
    }
}

impl FromIterator<(String, String)> for OutputFileSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
