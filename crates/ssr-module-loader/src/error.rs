// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module loader

use std::path::PathBuf;
use thiserror::Error;

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Errors that can occur while resolving or loading modules
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Module not found
    #[error("Cannot find module '{0}'")]
    ModuleNotFound(String),

    /// Module resolution error
    #[error("Error resolving module '{module}': {reason}")]
    ModuleResolution {
        /// Module specifier
        module: String,
        /// Reason for failure
        reason: String,
    },

    /// URL could not be parsed or joined
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Reason for failure
        reason: String,
    },

    /// URL scheme this loader cannot serve
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedUrl(String),

    /// Path error
    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),

    /// Transformation of a source file failed
    #[error("Failed to transform '{path}': {reason}")]
    Transform {
        /// File that was being transformed
        path: PathBuf,
        /// Reason for failure
        reason: String,
    },

    /// The transformer was used after it was closed
    #[error("Transformer has been closed")]
    TransformerClosed,

    /// File system error
    #[error("File system error: {0}")]
    Fs(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The loader worker thread is no longer running
    #[error("Loader worker is not running")]
    WorkerGone,
}

impl LoaderError {
    /// Create a module not found error
    pub fn module_not_found(module: impl Into<String>) -> Self {
        Self::ModuleNotFound(module.into())
    }

    /// Create a transformation error
    pub fn transform(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Transform {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid URL error
    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
