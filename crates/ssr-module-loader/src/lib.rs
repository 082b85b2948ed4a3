// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # ssr-module-loader
//!
//! ESM loader hooks that serve a server-side rendering bundle from memory.
//!
//! During server-side rendering the application bundle (`main.server.mjs`
//! and its `chunk-*.mjs` files) only exists as build output held in memory.
//! This crate provides the `resolve`/`load` hook pair that lets a module
//! runtime import it anyway:
//!
//! - Specifiers naming an output file resolve to `file:///<path>` and load
//!   verbatim from memory
//! - Any other `file:` module is read from disk, transformed once and cached
//! - Imports made from bundle files are re-anchored at the workspace root
//! - Everything else is forwarded to the next hook in the chain
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ssr_module_loader::{
//!     install_signal_handlers, DefaultHooks, JavaScriptTransformer, LoaderWorker, ResolveContext,
//!     Shutdown, TransformerOptions, WorkerData,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let worker_data = WorkerData::from_file("worker-data.json".as_ref())?;
//!     let shutdown = Shutdown::new(Arc::new(JavaScriptTransformer::new(TransformerOptions::default())));
//!     let _listeners = install_signal_handlers(&shutdown);
//!
//!     let loader = LoaderWorker::spawn(worker_data, shutdown, DefaultHooks::from_current_dir()?).await?;
//!     let resolved = loader.resolve("./main.server.mjs", ResolveContext::default()).await?;
//!     println!("{}", resolved.url);
//!     loader.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bundle;
pub mod cache;
pub mod config;
pub mod error;
pub mod file_url;
pub mod hooks;
pub mod loader;
pub mod output_files;
pub mod shutdown;
pub mod transformer;
pub mod worker;

// Re-exports
pub use bundle::is_bundle_entry_point_or_chunk;
pub use cache::TransformedFileCache;
pub use config::{TransformerOptions, WorkerData};
pub use error::{LoaderError, Result};
pub use hooks::{
    Chain, DefaultHooks, LoadContext, LoadResult, ModuleFormat, ModuleHooks, NextLoad, NextResolve, ResolveContext,
    ResolveResult,
};
pub use loader::InMemoryLoader;
pub use output_files::OutputFileSet;
pub use shutdown::{Shutdown, ShutdownListeners, ShutdownTrigger, install_signal_handlers};
pub use transformer::{Identity, JavaScriptTransformer, SourceTransform, SourceUrlComment, Transformer};
pub use worker::{LoaderHandle, LoaderStats, LoaderWorker};

/// Version of the loader
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
