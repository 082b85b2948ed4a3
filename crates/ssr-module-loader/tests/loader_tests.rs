// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Resolve/load behaviour of the in-memory loader

use async_trait::async_trait;
use parking_lot::Mutex;
use ssr_module_loader::{
    InMemoryLoader, LoadContext, LoadResult, LoaderError, ModuleFormat, ModuleHooks, NextLoad, NextResolve,
    ResolveContext, ResolveResult, Result, Transformer, WorkerData,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Transformer that records every file it is asked to transform.
#[derive(Default)]
struct RecordingTransformer {
    calls: Mutex<Vec<PathBuf>>,
    fail: bool,
}

impl RecordingTransformer {
    fn calls_for(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|p| p.as_path() == Path::new(path)).count()
    }
}

#[async_trait]
impl Transformer for RecordingTransformer {
    async fn transform_file(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        self.calls.lock().push(path.to_path_buf());
        if self.fail {
            return Err(LoaderError::transform(path, "unexpected token"));
        }
        if path.ends_with("missing.mjs") {
            return Ok(None);
        }
        Ok(Some(format!("// transformed {}", path.display()).into_bytes()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Terminal hook that records what it was asked.
#[derive(Default)]
struct RecordingNext {
    resolves: Mutex<Vec<(String, ResolveContext)>>,
    loads: Mutex<Vec<(String, LoadContext)>>,
}

#[async_trait]
impl NextResolve for RecordingNext {
    async fn resolve(&self, specifier: &str, context: ResolveContext) -> Result<ResolveResult> {
        self.resolves.lock().push((specifier.to_string(), context));
        Ok(ResolveResult {
            format: None,
            url: format!("next:{}", specifier),
            short_circuit: false,
        })
    }
}

#[async_trait]
impl NextLoad for RecordingNext {
    async fn load(&self, url: &str, context: LoadContext) -> Result<LoadResult> {
        self.loads.lock().push((url.to_string(), context));
        Ok(LoadResult {
            format: None,
            source: Some("from next".to_string()),
            short_circuit: false,
        })
    }
}

fn worker_data() -> WorkerData {
    let mut files = HashMap::new();
    files.insert("main.server.mjs".to_string(), "export default 'main';".to_string());
    files.insert("chunk-ABC123.mjs".to_string(), "export const chunk = 1;".to_string());
    files.insert("server/routes.mjs".to_string(), "export const routes = [];".to_string());
    WorkerData::new(files, "/work/app")
}

fn loader(transformer: Arc<RecordingTransformer>) -> InMemoryLoader {
    InMemoryLoader::new(worker_data(), transformer).unwrap()
}

#[tokio::test]
async fn test_resolve_output_file() {
    let loader = loader(Arc::default());
    let next = RecordingNext::default();

    for specifier in ["main.server.mjs", "./main.server.mjs"] {
        let resolved = loader
            .resolve(specifier, ResolveContext::default(), &next)
            .await
            .unwrap();

        assert_eq!(resolved.url, "file:///main.server.mjs");
        assert_eq!(resolved.format, Some(ModuleFormat::Module));
        assert!(resolved.short_circuit);
    }

    let nested = loader
        .resolve("./server/routes.mjs", ResolveContext::default(), &next)
        .await
        .unwrap();
    assert_eq!(nested.url, "file:///server/routes.mjs");

    assert!(next.resolves.lock().is_empty());
}

#[tokio::test]
async fn test_resolve_file_url_is_never_an_output_file() {
    let loader = loader(Arc::default());
    let next = RecordingNext::default();

    let resolved = loader
        .resolve("file:///main.server.mjs", ResolveContext::default(), &next)
        .await
        .unwrap();

    assert_eq!(resolved.url, "next:file:///main.server.mjs");
    assert_eq!(next.resolves.lock().len(), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_resolve_from_bundle_rewrites_parent() {
    let loader = loader(Arc::default());
    let next = RecordingNext::default();

    for parent in ["file:///main.server.mjs", "file:///chunk-XYZ.mjs"] {
        let context = ResolveContext {
            parent_url: Some(parent.to_string()),
            conditions: vec!["node".to_string(), "import".to_string()],
        };
        loader.resolve("@angular/core", context, &next).await.unwrap();
    }

    let resolves = next.resolves.lock();
    assert_eq!(resolves.len(), 2);
    for (specifier, context) in resolves.iter() {
        assert_eq!(specifier, "@angular/core");
        assert_eq!(context.parent_url.as_deref(), Some("file:///work/app/index.mjs"));
        assert_eq!(context.conditions, vec!["node".to_string(), "import".to_string()]);
    }
}

#[tokio::test]
async fn test_resolve_from_other_parent_passes_context_unchanged() {
    let loader = loader(Arc::default());
    let next = RecordingNext::default();

    let contexts = [
        ResolveContext::default(),
        ResolveContext::with_parent("file:///work/app/src/app.mjs"),
        ResolveContext::with_parent("file:///main.mjs"),
    ];

    for context in contexts.clone() {
        loader.resolve("./dep.mjs", context, &next).await.unwrap();
    }

    let seen: Vec<ResolveContext> = next.resolves.lock().iter().map(|(_, c)| c.clone()).collect();
    assert_eq!(seen, contexts.to_vec());
}

#[cfg(unix)]
#[tokio::test]
async fn test_load_output_file_verbatim() {
    let transformer = Arc::new(RecordingTransformer::default());
    let loader = loader(transformer.clone());
    let next = RecordingNext::default();

    let loaded = loader
        .load(
            "file:///chunk-ABC123.mjs",
            LoadContext::with_format(Some(ModuleFormat::Module)),
            &next,
        )
        .await
        .unwrap();

    assert_eq!(loaded.source.as_deref(), Some("export const chunk = 1;"));
    assert_eq!(loaded.format, Some(ModuleFormat::Module));
    assert!(loaded.short_circuit);
    assert!(transformer.calls.lock().is_empty());
    assert!(next.loads.lock().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_load_transforms_once() {
    let transformer = Arc::new(RecordingTransformer::default());
    let loader = loader(transformer.clone());
    let next = RecordingNext::default();

    let first = loader
        .load("file:///work/app/src/app.mjs", LoadContext::default(), &next)
        .await
        .unwrap();
    let second = loader
        .load("file:///work/app/src/app.mjs", LoadContext::default(), &next)
        .await
        .unwrap();

    assert_eq!(first.source.as_deref(), Some("// transformed /work/app/src/app.mjs"));
    assert_eq!(first, second);
    assert_eq!(first.format, None);
    assert_eq!(transformer.calls_for("/work/app/src/app.mjs"), 1);
    assert!(loader.transformed_files().contains(Path::new("/work/app/src/app.mjs")));
    assert!(next.loads.lock().is_empty());
}

#[tokio::test]
async fn test_load_non_file_url_is_delegated() {
    let transformer = Arc::new(RecordingTransformer::default());
    let loader = loader(transformer.clone());
    let next = RecordingNext::default();

    for url in ["node:fs", "data:text/javascript,export{}", "https://example.com/main.server.mjs"] {
        let loaded = loader.load(url, LoadContext::default(), &next).await.unwrap();
        assert_eq!(loaded.source.as_deref(), Some("from next"));
    }

    assert_eq!(next.loads.lock().len(), 3);
    assert!(transformer.calls.lock().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_load_unhandled_file_is_delegated() {
    let transformer = Arc::new(RecordingTransformer::default());
    let loader = loader(transformer.clone());
    let next = RecordingNext::default();

    let context = LoadContext::with_format(Some(ModuleFormat::Commonjs));
    let loaded = loader
        .load("file:///work/app/missing.mjs", context.clone(), &next)
        .await
        .unwrap();

    assert_eq!(loaded.source.as_deref(), Some("from next"));
    let loads = next.loads.lock();
    assert_eq!(loads.len(), 1);
    assert_eq!(loads[0], ("file:///work/app/missing.mjs".to_string(), context));
}

#[cfg(unix)]
#[tokio::test]
async fn test_transform_failure_fails_load() {
    let transformer = Arc::new(RecordingTransformer {
        fail: true,
        ..RecordingTransformer::default()
    });
    let loader = loader(transformer.clone());
    let next = RecordingNext::default();

    let err = loader
        .load("file:///work/app/src/broken.mjs", LoadContext::default(), &next)
        .await
        .unwrap_err();

    assert!(matches!(err, LoaderError::Transform { .. }));
    assert!(next.loads.lock().is_empty());
    assert!(loader.transformed_files().is_empty());
}
