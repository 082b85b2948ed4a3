// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loader configuration.
//!
//! The host hands the loader its configuration exactly once, as the worker
//! data of the thread the hooks run on. It is never re-read afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// One-time configuration delivered by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerData {
    /// Bundled build output, keyed by relative path (no leading slash)
    #[serde(default)]
    pub output_files: HashMap<String, String>,

    /// Absolute path of the workspace root
    pub workspace_root: PathBuf,
}

impl WorkerData {
    /// Create worker data from its parts.
    pub fn new(output_files: HashMap<String, String>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            output_files,
            workspace_root: workspace_root.into(),
        }
    }

    /// Parse worker data from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse worker data from a reader.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Load worker data from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

/// Options for the JavaScript transformer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformerOptions {
    /// Emit source map references
    pub sourcemap: bool,

    /// Maximum number of files transformed at the same time
    pub max_threads: usize,
}

impl Default for TransformerOptions {
    fn default() -> Self {
        Self {
            sourcemap: true,
            max_threads: 1,
        }
    }
}
