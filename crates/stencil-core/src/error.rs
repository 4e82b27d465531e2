//! Fatal error types.
//!
//! Per-path failures are never errors here; they are carried as data in scan
//! and copy results. These types cover what aborts a whole invocation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors loading or parsing a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest file is not valid JSON or lacks a `paths` array.
    #[error("Failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An entry is not a usable relative path.
    #[error("Invalid manifest entry {entry:?}: {reason}")]
    InvalidPath { entry: String, reason: &'static str },
}

impl ManifestError {
    pub(crate) fn invalid(entry: &str, reason: &'static str) -> Self {
        Self::InvalidPath {
            entry: entry.to_string(),
            reason,
        }
    }
}

/// Errors that abort a pipeline run before any per-path work starts.
#[derive(Debug, Error)]
pub enum CloneError {
    /// The source root is missing or is not a directory.
    #[error("Source root is not a directory: {path}")]
    SourceNotDirectory { path: PathBuf },

    /// The target root exists but is not a directory.
    #[error("Target root is not a directory: {path}")]
    TargetNotDirectory { path: PathBuf },

    /// The target root could not be inspected.
    #[error("Cannot inspect target root {path}: {source}")]
    TargetUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source and target resolve to the same directory.
    #[error("Source and target are the same directory: {path}")]
    SameRoot { path: PathBuf },

    /// Rayon could not build the worker pool.
    #[error("Failed to start {workers} workers: {message}")]
    WorkerPool { workers: usize, message: String },
}
