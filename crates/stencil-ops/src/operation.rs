//! Per-path copy failure records.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use stencil_core::{IoFailure, ManifestPath};

/// A failure copying one manifest path. Never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyError {
    /// The manifest path that failed.
    pub path: ManifestPath,
    /// Resolved source path.
    pub source_path: PathBuf,
    /// Resolved target path.
    pub target_path: PathBuf,
    /// What went wrong.
    #[serde(flatten)]
    pub failure: IoFailure,
}

impl CopyError {
    /// Create a new copy error.
    pub fn new(
        path: &ManifestPath,
        source_path: &Path,
        target_path: &Path,
        failure: IoFailure,
    ) -> Self {
        Self {
            path: path.clone(),
            source_path: source_path.to_path_buf(),
            target_path: target_path.to_path_buf(),
            failure,
        }
    }

    /// Wrap an I/O error. An `AlreadyExists` error here means something
    /// occupied the target between scan and write.
    pub fn from_io(
        path: &ManifestPath,
        source_path: &Path,
        target_path: &Path,
        err: &io::Error,
    ) -> Self {
        let mut failure = IoFailure::from(err);
        if err.kind() == io::ErrorKind::AlreadyExists {
            failure.message = format!("target appeared after scan: {}", failure.message);
        }
        Self::new(path, source_path, target_path, failure)
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.failure.message
    }

    /// Short error code.
    pub fn code(&self) -> String {
        self.failure.code()
    }

    /// Check if the target was occupied when the write happened.
    pub fn is_late_conflict(&self) -> bool {
        self.failure.kind == "AlreadyExists"
    }
}

impl std::fmt::Display for CopyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.failure)
    }
}
