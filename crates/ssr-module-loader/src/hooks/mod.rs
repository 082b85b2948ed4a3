// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module customization hooks.
//!
//! A module runtime asks a chain of hooks to `resolve` every import
//! specifier and to `load` every resolved URL. Each hook either answers the
//! request or forwards it, unchanged in shape, to the next hook. The last
//! hook in the chain is the runtime default ([`DefaultHooks`]).
//!
//! A result with `short_circuit` set is final: hooks further up the chain
//! must not resolve or load it again.

mod default;

pub use default::DefaultHooks;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Format of a loaded module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    /// ECMAScript module
    Module,
    /// CommonJS module
    Commonjs,
    /// JSON module
    Json,
    /// Runtime built-in (`node:` scheme)
    Builtin,
    /// WebAssembly module
    Wasm,
}

impl ModuleFormat {
    /// Detect module format from an unambiguous file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("mjs") => Some(ModuleFormat::Module),
            Some("cjs") => Some(ModuleFormat::Commonjs),
            Some("json") => Some(ModuleFormat::Json),
            Some("wasm") => Some(ModuleFormat::Wasm),
            _ => None,
        }
    }

    /// Name used by the runtime for this format
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleFormat::Module => "module",
            ModuleFormat::Commonjs => "commonjs",
            ModuleFormat::Json => "json",
            ModuleFormat::Builtin => "builtin",
            ModuleFormat::Wasm => "wasm",
        }
    }
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModuleFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "module" => Ok(ModuleFormat::Module),
            "commonjs" => Ok(ModuleFormat::Commonjs),
            "json" => Ok(ModuleFormat::Json),
            "builtin" => Ok(ModuleFormat::Builtin),
            "wasm" => Ok(ModuleFormat::Wasm),
            other => Err(format!("unknown module format '{}'", other)),
        }
    }
}

/// Context passed to `resolve`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveContext {
    /// URL of the importing module, absent for entry points
    pub parent_url: Option<String>,
    /// Export conditions in effect for this import
    pub conditions: Vec<String>,
}

impl ResolveContext {
    /// Context for an import made from `parent_url`
    pub fn with_parent(parent_url: impl Into<String>) -> Self {
        Self {
            parent_url: Some(parent_url.into()),
            ..Self::default()
        }
    }
}

/// Result of `resolve`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveResult {
    /// Format hint for the loader
    pub format: Option<ModuleFormat>,
    /// Resolved absolute URL
    pub url: String,
    /// Whether the result is final
    pub short_circuit: bool,
}

/// Context passed to `load`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadContext {
    /// Format hint from resolution
    pub format: Option<ModuleFormat>,
    /// Export conditions in effect for this load
    pub conditions: Vec<String>,
}

impl LoadContext {
    /// Context carrying a format hint
    pub fn with_format(format: Option<ModuleFormat>) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }
}

/// Result of `load`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    /// Module format
    pub format: Option<ModuleFormat>,
    /// Module source, absent for built-ins
    pub source: Option<String>,
    /// Whether the result is final
    pub short_circuit: bool,
}

/// Continuation for `resolve`
#[async_trait]
pub trait NextResolve: Send + Sync {
    /// Resolve `specifier` in `context`
    async fn resolve(&self, specifier: &str, context: ResolveContext) -> Result<ResolveResult>;
}

/// Continuation for `load`
#[async_trait]
pub trait NextLoad: Send + Sync {
    /// Load the module at `url`
    async fn load(&self, url: &str, context: LoadContext) -> Result<LoadResult>;
}

/// A resolve/load hook pair that may forward to the next hook.
#[async_trait]
pub trait ModuleHooks: Send + Sync {
    /// Resolve `specifier`, or forward to `next`
    async fn resolve(
        &self,
        specifier: &str,
        context: ResolveContext,
        next: &dyn NextResolve,
    ) -> Result<ResolveResult>;

    /// Load `url`, or forward to `next`
    async fn load(&self, url: &str, context: LoadContext, next: &dyn NextLoad) -> Result<LoadResult>;
}

/// A hook installed in front of the rest of the chain.
pub struct Chain<H, N> {
    hooks: H,
    next: N,
}

impl<H, N> Chain<H, N> {
    /// Install `hooks` in front of `next`
    pub fn new(hooks: H, next: N) -> Self {
        Self { hooks, next }
    }

    /// Get the installed hooks
    pub fn hooks(&self) -> &H {
        &self.hooks
    }
}

#[async_trait]
impl<H, N> NextResolve for Chain<H, N>
where
    H: ModuleHooks,
    N: NextResolve,
{
    async fn resolve(&self, specifier: &str, context: ResolveContext) -> Result<ResolveResult> {
        self.hooks.resolve(specifier, context, &self.next).await
    }
}

#[async_trait]
impl<H, N> NextLoad for Chain<H, N>
where
    H: ModuleHooks,
    N: NextLoad,
{
    async fn load(&self, url: &str, context: LoadContext) -> Result<LoadResult> {
        self.hooks.load(url, context, &self.next).await
    }
}
