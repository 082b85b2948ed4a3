// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! In-memory module loader.
//!
//! Serves the server bundle from memory instead of the filesystem:
//!
//! - `resolve` maps specifiers naming an output file to `file:///<path>`
//! - `load` serves output files verbatim, and transforms (once) and caches
//!   every other `file:` module
//! - imports made from bundle entry points and chunks are re-anchored at the
//!   workspace root, since their own URLs do not exist on disk

use crate::bundle::is_bundle_entry_point_or_chunk;
use crate::cache::TransformedFileCache;
use crate::config::WorkerData;
use crate::error::Result;
use crate::file_url::{file_url_to_path, is_file_protocol, output_file_key, output_file_url, workspace_root_marker};
use crate::hooks::{
    LoadContext, LoadResult, ModuleFormat, ModuleHooks, NextLoad, NextResolve, ResolveContext, ResolveResult,
};
use crate::output_files::OutputFileSet;
use crate::transformer::Transformer;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// Loader hooks backed by an in-memory build output.
pub struct InMemoryLoader {
    /// Bundled output files
    output_files: OutputFileSet,
    /// Sources transformed on demand
    transformed: TransformedFileCache,
    /// Transformation engine
    transformer: Arc<dyn Transformer>,
    /// Parent URL substituted for bundle entry points and chunks
    workspace_root_marker: Url,
}

impl InMemoryLoader {
    /// Create a loader from the host's worker data
    pub fn new(worker_data: WorkerData, transformer: Arc<dyn Transformer>) -> Result<Self> {
        let workspace_root_marker = workspace_root_marker(&worker_data.workspace_root)?;

        tracing::debug!(
            output_files = worker_data.output_files.len(),
            workspace_root = %worker_data.workspace_root.display(),
            "in-memory loader initialized"
        );

        Ok(Self {
            output_files: OutputFileSet::new(worker_data.output_files),
            transformed: TransformedFileCache::new(),
            transformer,
            workspace_root_marker,
        })
    }

    /// Get the bundled output files
    pub fn output_files(&self) -> &OutputFileSet {
        &self.output_files
    }

    /// Get the cache of transformed files
    pub fn transformed_files(&self) -> &TransformedFileCache {
        &self.transformed
    }

    /// Get the workspace root marker URL
    pub fn workspace_root_marker(&self) -> &Url {
        &self.workspace_root_marker
    }

    async fn transform(&self, path: &Path) -> Result<Option<String>> {
        let Some(bytes) = self.transformer.transform_file(path).await? else {
            return Ok(None);
        };
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }
}

#[async_trait]
impl ModuleHooks for InMemoryLoader {
    async fn resolve(
        &self,
        specifier: &str,
        context: ResolveContext,
        next: &dyn NextResolve,
    ) -> Result<ResolveResult> {
        if !is_file_protocol(specifier) {
            let normalized = specifier.strip_prefix("./").unwrap_or(specifier);
            if self.output_files.contains(normalized) {
                let url = output_file_url(normalized)?;
                tracing::debug!(specifier, url = %url, "resolved to output file");
                return Ok(ResolveResult {
                    format: Some(ModuleFormat::Module),
                    url: url.into(),
                    short_circuit: true,
                });
            }
        }

        let context = if is_bundle_entry_point_or_chunk(context.parent_url.as_deref()) {
            tracing::trace!(
                specifier,
                parent = ?context.parent_url,
                "re-anchoring bundle import at workspace root"
            );
            ResolveContext {
                parent_url: Some(self.workspace_root_marker.to_string()),
                ..context
            }
        } else {
            context
        };

        next.resolve(specifier, context).await
    }

    async fn load(&self, url: &str, context: LoadContext, next: &dyn NextLoad) -> Result<LoadResult> {
        if is_file_protocol(url) {
            let path = file_url_to_path(url)?;

            let source = match self.output_files.get(&output_file_key(&path)) {
                Some(source) => Some(source.to_string()),
                None => {
                    self.transformed
                        .get_or_transform(&path, || self.transform(&path))
                        .await?
                }
            };

            if let Some(source) = source {
                return Ok(LoadResult {
                    format: context.format,
                    source: Some(source),
                    short_circuit: true,
                });
            }

            tracing::debug!(url, "no in-memory or transformed source, delegating");
        }

        next.load(url, context).await
    }
}
