// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! ssr-loader CLI - run the in-memory module loader against a build output
//!
//! Loads worker data (`outputFiles` + `workspaceRoot`) from a JSON file,
//! starts the loader thread and answers a single resolve or load request.

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use ssr_module_loader::{
    DefaultHooks, JavaScriptTransformer, LoadContext, LoaderHandle, LoaderWorker, ModuleFormat, ResolveContext,
    Shutdown, ShutdownTrigger, TransformerOptions, VERSION, WorkerData, install_signal_handlers,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "ssr-loader",
    about = "Resolve and load server-side rendering modules from an in-memory build output",
    version = VERSION,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    /// Worker data JSON file with `outputFiles` and `workspaceRoot`
    #[arg(short = 'w', long = "worker-data")]
    worker_data: PathBuf,

    /// Directory entry points are resolved against (defaults to the current directory)
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Do not append source URL comments to transformed files
    #[arg(long)]
    no_sourcemap: bool,

    /// Maximum number of files transformed at once
    #[arg(long, default_value_t = 1)]
    max_threads: usize,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve an import specifier
    Resolve {
        /// Specifier to resolve
        specifier: String,

        /// URL of the importing module
        #[arg(long)]
        parent: Option<String>,
    },

    /// Load a resolved URL and print its source
    Load {
        /// URL to load
        url: String,

        /// Format hint passed to the loader
        #[arg(long)]
        format: Option<ModuleFormat>,
    },

    /// Show the loaded output and workspace root marker
    Stats,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("ssr_module_loader=debug,ssr_loader=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("ssr_module_loader=warn")
            .init();
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Exit code for a run cut short by Ctrl-C (128 + SIGINT)
const INTERRUPTED: u8 = 130;

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let worker_data = WorkerData::from_file(&cli.worker_data)?;
    let next = match cli.cwd {
        Some(cwd) => DefaultHooks::new(cwd),
        None => DefaultHooks::from_current_dir()?,
    };

    let options = TransformerOptions {
        sourcemap: !cli.no_sourcemap,
        max_threads: cli.max_threads,
        ..TransformerOptions::default()
    };
    let shutdown = Shutdown::new(Arc::new(JavaScriptTransformer::new(options)));
    let _listeners = install_signal_handlers(&shutdown);

    let loader = LoaderWorker::spawn(worker_data, Arc::clone(&shutdown), next).await?;
    let result = tokio::select! {
        result = execute(&loader, cli.command) => result.map(|()| ExitCode::SUCCESS),
        () = shutdown.released() => {
            let trigger = shutdown.fired().unwrap_or(ShutdownTrigger::Exit);
            eprintln!("{}", format!("Stopped by {}", trigger).dimmed());
            Ok(ExitCode::from(INTERRUPTED))
        }
    };

    loader.shutdown().await?;
    tracing::debug!(trigger = ?shutdown.fired().unwrap_or(ShutdownTrigger::Exit), "loader stopped");
    result
}

async fn execute(loader: &LoaderHandle, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Resolve { specifier, parent } => {
            let context = ResolveContext {
                parent_url: parent,
                ..ResolveContext::default()
            };
            let resolved = loader.resolve(&specifier, context).await?;
            let format = resolved.format.map(|f| f.to_string()).unwrap_or_else(|| "-".to_string());
            println!("{} {}", resolved.url.cyan(), format.dimmed());
            if resolved.short_circuit {
                println!("{}", "(served from memory)".green());
            }
        }
        Command::Load { url, format } => {
            let loaded = loader.load(&url, LoadContext::with_format(format)).await?;
            match loaded.source {
                Some(source) => print!("{}", source),
                None => println!("{}", "(no source)".dimmed()),
            }
        }
        Command::Stats => {
            let stats = loader.stats().await?;
            println!("{} {}", "output files:".bold(), stats.output_files.len().yellow());
            for path in &stats.output_files {
                println!("  {}", path);
            }
            println!("{} {}", "transformed files:".bold(), stats.transformed_files.len().yellow());
            for path in &stats.transformed_files {
                println!("  {}", path.display());
            }
            println!("{} {}", "workspace root marker:".bold(), stats.workspace_root_marker.cyan());
        }
    }
    Ok(())
}
