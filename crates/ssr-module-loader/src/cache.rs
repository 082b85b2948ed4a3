// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Cache of transformed source files

use crate::error::{LoaderError, Result};
use dashmap::DashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Why a cell was left empty.
enum Miss {
    /// The transformer does not handle this file
    Unhandled,
    /// The transformation failed
    Failed(LoaderError),
}

/// Thread-safe cache mapping absolute paths to transformed sources.
///
/// Entries are never evicted. Each path owns a once-cell, so concurrent
/// requests for the same uncached path share one transformation.
#[derive(Debug, Default)]
pub struct TransformedFileCache {
    entries: DashMap<PathBuf, Arc<OnceCell<String>>>,
}

impl TransformedFileCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Get a transformed source by absolute path
    pub fn get(&self, path: &Path) -> Option<String> {
        self.entries
            .get(path)
            .and_then(|entry| entry.value().get().cloned())
    }

    /// Check if a transformed source is cached
    pub fn contains(&self, path: &Path) -> bool {
        self.entries
            .get(path)
            .is_some_and(|entry| entry.value().initialized())
    }

    /// Return the cached source for `path`, running `transform` if it is
    /// missing.
    ///
    /// `transform` returns `Ok(None)` for files it does not handle; nothing
    /// is cached in that case. A failed transformation leaves the entry
    /// empty so a later request starts over.
    pub async fn get_or_transform<F, Fut>(&self, path: &Path, transform: F) -> Result<Option<String>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<String>>>,
    {
        let cell = Arc::clone(self.entries.entry(path.to_path_buf()).or_default().value());

        if let Some(source) = cell.get() {
            tracing::trace!(path = %path.display(), "transformed file cache hit");
            return Ok(Some(source.clone()));
        }

        let outcome = cell
            .get_or_try_init(|| async {
                match transform().await {
                    Ok(Some(source)) => Ok(source),
                    Ok(None) => Err(Miss::Unhandled),
                    Err(e) => Err(Miss::Failed(e)),
                }
            })
            .await;

        match outcome {
            Ok(source) => Ok(Some(source.clone())),
            Err(Miss::Unhandled) => Ok(None),
            Err(Miss::Failed(e)) => Err(e),
        }
    }

    /// Get all cached paths, sorted
    pub fn keys(&self) -> Vec<PathBuf> {
        let mut keys: Vec<PathBuf> = self
            .entries
            .iter()
            .filter(|entry| entry.value().initialized())
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Get the number of cached sources
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
