// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Dedicated loader thread.
//!
//! The hooks run on their own thread with a single-threaded runtime, apart
//! from the host. The host delivers [`WorkerData`] once at start-up; after
//! that the only traffic is resolve/load requests, each answered on its own
//! reply channel.

use crate::config::WorkerData;
use crate::error::{LoaderError, Result};
use crate::hooks::{Chain, DefaultHooks, LoadContext, LoadResult, NextLoad, NextResolve, ResolveContext, ResolveResult};
use crate::loader::InMemoryLoader;
use crate::shutdown::{Shutdown, ShutdownTrigger};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Capacity of the request queue
const REQUEST_QUEUE_SIZE: usize = 256;

/// Snapshot of the loader's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderStats {
    /// Relative paths of the bundled output files, sorted
    pub output_files: Vec<String>,
    /// Absolute paths of the files transformed so far, sorted
    pub transformed_files: Vec<PathBuf>,
    /// Parent URL used for bundle imports
    pub workspace_root_marker: String,
}

/// Message types for the loader thread
enum Request {
    Resolve {
        specifier: String,
        context: ResolveContext,
        reply: oneshot::Sender<Result<ResolveResult>>,
    },
    Load {
        url: String,
        context: LoadContext,
        reply: oneshot::Sender<Result<LoadResult>>,
    },
    Stats {
        reply: oneshot::Sender<LoaderStats>,
    },
    Shutdown {
        reply: oneshot::Sender<bool>,
    },
}

/// Spawns the loader thread.
pub struct LoaderWorker;

impl LoaderWorker {
    /// Start the loader thread.
    ///
    /// `worker_data` is handed over once; `shutdown` owns the transformer the
    /// loader uses; `next` terminates the hook chain.
    pub async fn spawn(worker_data: WorkerData, shutdown: Arc<Shutdown>, next: DefaultHooks) -> Result<LoaderHandle> {
        let (init_tx, init_rx) = oneshot::channel::<WorkerData>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_SIZE);

        std::thread::Builder::new()
            .name("ssr-module-loader".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.into()));
                        return;
                    }
                };
                runtime.block_on(serve(init_rx, ready_tx, rx, shutdown, next));
            })?;

        init_tx.send(worker_data).map_err(|_| LoaderError::WorkerGone)?;
        ready_rx.await.map_err(|_| LoaderError::WorkerGone)??;

        Ok(LoaderHandle { tx })
    }
}

async fn serve(
    init: oneshot::Receiver<WorkerData>,
    ready: oneshot::Sender<Result<()>>,
    mut rx: mpsc::Receiver<Request>,
    shutdown: Arc<Shutdown>,
    next: DefaultHooks,
) {
    let Ok(worker_data) = init.await else {
        return;
    };

    let chain = match InMemoryLoader::new(worker_data, shutdown.transformer()) {
        Ok(loader) => Arc::new(Chain::new(loader, next)),
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    while let Some(request) = rx.recv().await {
        match request {
            Request::Resolve { specifier, context, reply } => {
                let chain = Arc::clone(&chain);
                tokio::spawn(async move {
                    let _ = reply.send(chain.resolve(&specifier, context).await);
                });
            }
            Request::Load { url, context, reply } => {
                let chain = Arc::clone(&chain);
                tokio::spawn(async move {
                    let _ = reply.send(chain.load(&url, context).await);
                });
            }
            Request::Stats { reply } => {
                let loader = chain.hooks();
                let _ = reply.send(LoaderStats {
                    output_files: loader.output_files().paths().into_iter().map(str::to_string).collect(),
                    transformed_files: loader.transformed_files().keys(),
                    workspace_root_marker: loader.workspace_root_marker().to_string(),
                });
            }
            Request::Shutdown { reply } => {
                let released = shutdown.run(ShutdownTrigger::Exit).await;
                let _ = reply.send(released);
                return;
            }
        }
    }

    tracing::debug!("all loader handles dropped, stopping worker");
    shutdown.run(ShutdownTrigger::Exit).await;
}

/// Host-side handle to the loader thread.
#[derive(Clone)]
pub struct LoaderHandle {
    tx: mpsc::Sender<Request>,
}

impl LoaderHandle {
    /// Resolve a specifier through the loader chain
    pub async fn resolve(&self, specifier: &str, context: ResolveContext) -> Result<ResolveResult> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Resolve {
            specifier: specifier.to_string(),
            context,
            reply,
        })
        .await?;
        rx.await.map_err(|_| LoaderError::WorkerGone)?
    }

    /// Load a URL through the loader chain
    pub async fn load(&self, url: &str, context: LoadContext) -> Result<LoadResult> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Load {
            url: url.to_string(),
            context,
            reply,
        })
        .await?;
        rx.await.map_err(|_| LoaderError::WorkerGone)?
    }

    /// Get a snapshot of the loader's state
    pub async fn stats(&self) -> Result<LoaderStats> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Stats { reply }).await?;
        rx.await.map_err(|_| LoaderError::WorkerGone)
    }

    /// Stop the worker and release the transformer.
    ///
    /// Returns `true` if this call released it.
    pub async fn shutdown(&self) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Shutdown { reply }).await?;
        rx.await.map_err(|_| LoaderError::WorkerGone)
    }

    async fn send(&self, request: Request) -> Result<()> {
        self.tx.send(request).await.map_err(|_| LoaderError::WorkerGone)
    }
}
