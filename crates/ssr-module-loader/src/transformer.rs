// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Source transformation for files outside the bundled output.
//!
//! Files the bundle does not contain (workspace sources, packages) are read
//! from disk and run through a [`SourceTransform`] before being handed to the
//! runtime. The transform itself is pluggable; the transformer only owns the
//! worker pool and its lifecycle.

use crate::config::TransformerOptions;
use crate::error::{LoaderError, Result};
use crate::file_url::path_to_file_url;
use crate::shutdown::contain_panic;
use async_trait::async_trait;
use regex::bytes::Regex;
use std::any::Any;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Semaphore;

/// Handle to a transformation engine.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Transform a file, returning the transformed bytes.
    ///
    /// Returns `Ok(None)` when the file is not handled by this transformer.
    async fn transform_file(&self, path: &Path) -> Result<Option<Vec<u8>>>;

    /// Release the engine's resources.
    async fn close(&self) -> Result<()>;
}

/// A synchronous source-to-source transformation.
pub trait SourceTransform: Send + Sync + 'static {
    /// Transform the raw contents of `path`.
    fn transform(&self, path: &Path, source: Vec<u8>, options: &TransformerOptions) -> Result<Vec<u8>>;
}

/// Returns sources unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

impl SourceTransform for Identity {
    fn transform(&self, _path: &Path, source: Vec<u8>, _options: &TransformerOptions) -> Result<Vec<u8>> {
        Ok(source)
    }
}

/// Appends a `//# sourceURL=` comment so stack traces point at the original
/// file. Sources that already carry a source map reference are left alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceUrlComment;

static SOURCE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"//# source(?:Mapping)?URL=").unwrap()
});

impl SourceTransform for SourceUrlComment {
    fn transform(&self, path: &Path, mut source: Vec<u8>, options: &TransformerOptions) -> Result<Vec<u8>> {
        if !options.sourcemap || SOURCE_REFERENCE.is_match(&source) {
            return Ok(source);
        }

        let url = path_to_file_url(path)?;
        if !source.ends_with(b"\n") && !source.is_empty() {
            source.push(b'\n');
        }
        source.extend_from_slice(format!("//# sourceURL={}\n", url).as_bytes());
        Ok(source)
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str));
    match message {
        Some(message) => format!("transform panicked: {}", message),
        None => "transform panicked".to_string(),
    }
}

/// Transformer backed by a bounded pool of blocking workers.
pub struct JavaScriptTransformer {
    options: TransformerOptions,
    transform: Arc<dyn SourceTransform>,
    permits: Arc<Semaphore>,
    closed: AtomicBool,
}

impl JavaScriptTransformer {
    /// Create a transformer using [`SourceUrlComment`]
    pub fn new(options: TransformerOptions) -> Self {
        Self::with_transform(options, SourceUrlComment)
    }

    /// Create a transformer with a custom source transform
    pub fn with_transform(options: TransformerOptions, transform: impl SourceTransform) -> Self {
        let permits = Arc::new(Semaphore::new(options.max_threads.max(1)));
        Self {
            options,
            transform: Arc::new(transform),
            permits,
            closed: AtomicBool::new(false),
        }
    }

    /// Get the transformer options
    pub fn options(&self) -> &TransformerOptions {
        &self.options
    }

    /// Check if the transformer has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transformer for JavaScriptTransformer {
    async fn transform_file(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        if self.is_closed() {
            return Err(LoaderError::TransformerClosed);
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| LoaderError::TransformerClosed)?;

        let source = match tokio::fs::read(path).await {
            Ok(source) => source,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), bytes = source.len(), "transforming file");

        let transform = Arc::clone(&self.transform);
        let options = self.options.clone();
        let owned_path = path.to_path_buf();
        let output =
            tokio::task::spawn_blocking(move || contain_panic(|| transform.transform(&owned_path, source, &options)))
                .await
                .map_err(|e| LoaderError::transform(path, e))?
                .map_err(|payload| LoaderError::transform(path, panic_reason(&*payload)))??;

        Ok(Some(output))
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.permits.close();
            tracing::debug!("transformer closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Uppercase;

    impl SourceTransform for Uppercase {
        fn transform(&self, _path: &Path, source: Vec<u8>, _options: &TransformerOptions) -> Result<Vec<u8>> {
            Ok(source.to_ascii_uppercase())
        }
    }

    struct Failing;

    impl SourceTransform for Failing {
        fn transform(&self, path: &Path, _source: Vec<u8>, _options: &TransformerOptions) -> Result<Vec<u8>> {
            Err(LoaderError::transform(path, "unexpected token"))
        }
    }

    struct Panicking;

    impl SourceTransform for Panicking {
        fn transform(&self, _path: &Path, _source: Vec<u8>, _options: &TransformerOptions) -> Result<Vec<u8>> {
            panic!("parser state corrupted")
        }
    }

    #[tokio::test]
    async fn test_transform_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mjs");
        std::fs::write(&path, "export const a = 1;").unwrap();

        let transformer = JavaScriptTransformer::with_transform(TransformerOptions::default(), Uppercase);
        let output = transformer.transform_file(&path).await.unwrap().unwrap();

        assert_eq!(output, b"EXPORT CONST A = 1;");
    }

    #[tokio::test]
    async fn test_missing_file_is_unhandled() {
        let transformer = JavaScriptTransformer::new(TransformerOptions::default());
        let output = transformer
            .transform_file(&PathBuf::from("/definitely/not/here.mjs"))
            .await
            .unwrap();

        assert!(output.is_none());
    }

    #[tokio::test]
    async fn test_transform_error_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.mjs");
        std::fs::write(&path, "export const = ;").unwrap();

        let transformer = JavaScriptTransformer::with_transform(TransformerOptions::default(), Failing);
        let err = transformer.transform_file(&path).await.unwrap_err();

        assert!(matches!(err, LoaderError::Transform { .. }));
    }

    #[tokio::test]
    async fn test_transform_panic_becomes_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.mjs");
        std::fs::write(&path, "export {};").unwrap();

        let transformer = JavaScriptTransformer::with_transform(TransformerOptions::default(), Panicking);
        let err = transformer.transform_file(&path).await.unwrap_err();

        match err {
            LoaderError::Transform { reason, .. } => {
                assert_eq!(reason, "transform panicked: parser state corrupted")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!transformer.is_closed());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let transformer = JavaScriptTransformer::new(TransformerOptions::default());
        transformer.close().await.unwrap();
        transformer.close().await.unwrap();

        assert!(transformer.is_closed());
        assert!(matches!(
            transformer.transform_file(Path::new("/a.mjs")).await,
            Err(LoaderError::TransformerClosed)
        ));
    }

    #[test]
    fn test_source_url_comment() {
        let options = TransformerOptions::default();
        let path = std::env::temp_dir().join("a.mjs");
        let output = SourceUrlComment
            .transform(&path, b"export {};".to_vec(), &options)
            .unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.starts_with("export {};\n//# sourceURL=file://"));
        assert!(output.ends_with("a.mjs\n"));
    }

    #[test]
    fn test_source_url_comment_respects_existing_map() {
        let options = TransformerOptions::default();
        let source = b"export {};\n//# sourceMappingURL=a.mjs.map\n".to_vec();
        let output = SourceUrlComment
            .transform(Path::new("/a.mjs"), source.clone(), &options)
            .unwrap();

        assert_eq!(output, source);
    }

    #[test]
    fn test_source_url_comment_respects_existing_url() {
        let options = TransformerOptions::default();
        let source = b"export {};\n//# sourceURL=webpack://app/a.mjs\n".to_vec();
        let output = SourceUrlComment
            .transform(Path::new("/a.mjs"), source.clone(), &options)
            .unwrap();

        assert_eq!(output, source);
    }

    #[test]
    fn test_source_url_comment_disabled() {
        let options = TransformerOptions {
            sourcemap: false,
            ..TransformerOptions::default()
        };
        let output = SourceUrlComment
            .transform(Path::new("/a.mjs"), b"x".to_vec(), &options)
            .unwrap();

        assert_eq!(output, b"x");
    }
}
