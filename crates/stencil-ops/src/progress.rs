//! Progress reporting and outcome types for the copy phase.

use serde::Serialize;
use stencil_core::ManifestPath;

use crate::CopyError;

/// Progress information for an ongoing copy.
#[derive(Debug, Clone)]
pub struct CopyProgress {
    /// Manifest paths processed, successful or not.
    pub entries_completed: usize,
    /// Manifest paths in this batch.
    pub entries_total: usize,
    /// Bytes of regular-file content written so far.
    pub bytes_copied: u64,
    /// The path most recently processed.
    pub current_file: Option<ManifestPath>,
    /// Errors recorded so far.
    pub errors: usize,
}

impl CopyProgress {
    /// Create a new progress tracker for a batch.
    pub fn new(entries_total: usize) -> Self {
        Self {
            entries_completed: 0,
            entries_total,
            bytes_copied: 0,
            current_file: None,
            errors: 0,
        }
    }

    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.entries_total > 0 {
            (self.entries_completed as f64 / self.entries_total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Check if any path has failed so far.
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// Result of a completed copy batch.
///
/// Each path counts toward exactly one of `files_written`, `symlinks_copied`,
/// or `errors`, except directories, which count toward neither counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopyOutcome {
    /// Regular files written.
    pub files_written: usize,
    /// Symlinks recreated.
    pub symlinks_copied: usize,
    /// Directory entries that did not exist before their own entry ran.
    pub directories_created: usize,
    /// Bytes of regular-file content written.
    pub bytes_copied: u64,
    /// Per-path failures.
    pub errors: Vec<CopyError>,
}

impl CopyOutcome {
    /// Check if every path was materialised.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of per-path failures.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Files plus symlinks.
    pub fn entries_written(&self) -> usize {
        self.files_written + self.symlinks_copied
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Copied {} files, {} symlinks",
            self.files_written, self.symlinks_copied
        );
        if self.directories_created > 0 {
            summary.push_str(&format!(", created {} directories", self.directories_created));
        }
        if !self.errors.is_empty() {
            summary.push_str(&format!(", {} failed", self.errors.len()));
        }
        summary
    }
}
