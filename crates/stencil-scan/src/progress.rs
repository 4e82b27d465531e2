//! Scan progress reporting.

use std::time::Duration;

use serde::Serialize;
use stencil_core::ManifestPath;

/// Progress information during a scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanProgress {
    /// Manifest paths classified so far.
    pub paths_scanned: u64,
    /// Manifest paths in this scan.
    pub paths_total: u64,
    /// Conflicts found so far (lookup errors included).
    pub conflicts_found: u64,
    /// Path most recently classified.
    pub current_path: Option<ManifestPath>,
    /// Time elapsed since the scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new(paths_total: u64) -> Self {
        Self {
            paths_scanned: 0,
            paths_total,
            conflicts_found: 0,
            current_path: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.paths_total > 0 {
            (self.paths_scanned as f64 / self.paths_total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Check if every path has been classified.
    pub fn is_complete(&self) -> bool {
        self.paths_scanned >= self.paths_total
    }
}
