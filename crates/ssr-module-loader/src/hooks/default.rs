// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Terminal hooks: resolution and loading straight from disk

use super::{LoadContext, LoadResult, ModuleFormat, NextLoad, NextResolve, ResolveContext, ResolveResult};
use crate::error::{LoaderError, Result};
use crate::file_url::{file_url_to_path, is_file_protocol};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

const BUILTIN_PREFIX: &str = "node:";

/// Runtime default resolution and loading.
///
/// Relative and absolute specifiers are resolved against the importer's URL
/// (or the working directory for entry points) and must exist on disk.
/// Package specifiers are not resolved here.
#[derive(Debug, Clone)]
pub struct DefaultHooks {
    cwd: PathBuf,
}

impl DefaultHooks {
    /// Create default hooks resolving entry points against `cwd`
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Create default hooks for the process working directory
    pub fn from_current_dir() -> Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    fn base_url(&self, context: &ResolveContext) -> Result<Url> {
        match &context.parent_url {
            Some(parent) => Url::parse(parent).map_err(|e| LoaderError::invalid_url(parent.as_str(), e)),
            None => Url::from_directory_path(&self.cwd).map_err(|_| LoaderError::InvalidPath(self.cwd.clone())),
        }
    }

    async fn resolve_file_url(&self, specifier: &str, url: Url) -> Result<ResolveResult> {
        let path = url
            .to_file_path()
            .map_err(|_| LoaderError::invalid_url(url.as_str(), "not a local file path"))?;

        if !tokio::fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false) {
            return Err(LoaderError::module_not_found(specifier));
        }

        Ok(ResolveResult {
            format: detect_format(&path).await?,
            url: url.to_string(),
            short_circuit: false,
        })
    }
}

#[async_trait]
impl NextResolve for DefaultHooks {
    async fn resolve(&self, specifier: &str, context: ResolveContext) -> Result<ResolveResult> {
        if specifier.starts_with(BUILTIN_PREFIX) {
            return Ok(ResolveResult {
                format: Some(ModuleFormat::Builtin),
                url: specifier.to_string(),
                short_circuit: false,
            });
        }

        if is_file_protocol(specifier) {
            let url = Url::parse(specifier).map_err(|e| LoaderError::invalid_url(specifier, e))?;
            return self.resolve_file_url(specifier, url).await;
        }

        if is_relative_or_absolute(specifier) {
            let base = self.base_url(&context)?;
            if base.scheme() != "file" {
                return Err(LoaderError::ModuleResolution {
                    module: specifier.to_string(),
                    reason: format!("cannot resolve relative to '{}'", base),
                });
            }
            let url = base
                .join(specifier)
                .map_err(|e| LoaderError::invalid_url(specifier, e))?;
            return self.resolve_file_url(specifier, url).await;
        }

        if Url::parse(specifier).is_ok() {
            return Err(LoaderError::UnsupportedUrl(specifier.to_string()));
        }

        Err(LoaderError::module_not_found(specifier))
    }
}

#[async_trait]
impl NextLoad for DefaultHooks {
    async fn load(&self, url: &str, context: LoadContext) -> Result<LoadResult> {
        if url.starts_with(BUILTIN_PREFIX) {
            return Ok(LoadResult {
                format: Some(ModuleFormat::Builtin),
                source: None,
                short_circuit: false,
            });
        }

        if !is_file_protocol(url) {
            return Err(LoaderError::UnsupportedUrl(url.to_string()));
        }

        let path = file_url_to_path(url)?;
        let source = tokio::fs::read_to_string(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LoaderError::module_not_found(url),
            _ => LoaderError::Fs(e),
        })?;

        let format = match context.format {
            Some(format) => Some(format),
            None => detect_format(&path).await?,
        };

        Ok(LoadResult {
            format,
            source: Some(source),
            short_circuit: false,
        })
    }
}

fn is_relative_or_absolute(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/')
}

/// Detect the format of a file, consulting the nearest `package.json` for
/// `.js` files.
async fn detect_format(path: &Path) -> Result<Option<ModuleFormat>> {
    if let Some(format) = ModuleFormat::from_path(path) {
        return Ok(Some(format));
    }

    if path.extension().and_then(|e| e.to_str()) != Some("js") {
        return Ok(None);
    }

    Ok(Some(find_package_type(path).await?.unwrap_or(ModuleFormat::Commonjs)))
}

/// Minimal package.json structure for type detection
#[derive(Debug, Deserialize)]
struct PackageJson {
    #[serde(rename = "type")]
    type_field: Option<String>,
}

async fn find_package_type(path: &Path) -> Result<Option<ModuleFormat>> {
    let mut current = path.parent();

    while let Some(dir) = current {
        let pkg_path = dir.join("package.json");
        if let Ok(content) = tokio::fs::read_to_string(&pkg_path).await {
            let pkg: PackageJson = serde_json::from_str(&content)?;
            return Ok(Some(match pkg.type_field.as_deref() {
                Some("module") => ModuleFormat::Module,
                _ => ModuleFormat::Commonjs,
            }));
        }
        current = dir.parent();
    }

    Ok(None)
}
