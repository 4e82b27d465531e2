//! Scan outcome types.

use std::path::PathBuf;

use serde::Serialize;
use stencil_core::{EntryDescriptor, IoFailure, ManifestPath};

/// Why a conflicting path is unsafe to copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ConflictDetail {
    /// Something already occupies the target path.
    Existing {
        /// What the target holds.
        discovered: EntryDescriptor,
        /// What the source would put there.
        expected: EntryDescriptor,
    },
    /// The target lookup failed with something other than "not found".
    LookupFailed { failure: IoFailure },
    /// A target ancestor is a symlink, so writes would leave the target root.
    SymlinkAncestor { ancestor: ManifestPath },
    /// A different manifest path folds to the same name on this target.
    CaseCollision { claimed_by: ManifestPath },
}

/// Why a manifest path was neither clean nor conflicting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The template does not ship this path.
    SourceMissing,
    /// The source lookup failed with something other than "not found".
    SourceLookupFailed,
}

/// Classification of a single manifest path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Nothing at the target; safe to copy.
    Clean,
    /// The target path is occupied or could not be proven free.
    Conflict(ConflictDetail),
    /// Stale manifest entry; not actionable.
    Skipped(SkipReason),
}

impl ScanOutcome {
    /// Check if this outcome blocks the copy phase.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// A conflicting path with enough context to report what differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictRecord {
    /// Manifest path.
    pub path: ManifestPath,
    /// Resolved target path.
    pub target_path: PathBuf,
    /// Resolved source path.
    pub source_path: PathBuf,
    /// What was found.
    pub detail: ConflictDetail,
}

impl ConflictRecord {
    /// Check if this conflict came from a failed lookup rather than an occupant.
    pub fn is_lookup_error(&self) -> bool {
        matches!(self.detail, ConflictDetail::LookupFailed { .. })
    }
}

/// A manifest path left out of both the clean and conflict sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPath {
    /// Manifest path.
    pub path: ManifestPath,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Counts over one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Manifest entries scanned.
    pub total: usize,
    /// Entries in `conflicts`.
    pub conflicts: usize,
    /// Entries in `clean`.
    pub clean: usize,
    /// Entries in `skipped`.
    pub skipped: usize,
}

/// Result of scanning a manifest against a target.
///
/// Every manifest entry lands in exactly one of `clean`, `conflicts`, or
/// `skipped`, each kept in manifest order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    /// The scanned manifest, in order.
    pub manifest: Vec<ManifestPath>,
    /// Paths that block the copy phase.
    pub conflicts: Vec<ConflictRecord>,
    /// Paths safe to copy.
    pub clean: Vec<ManifestPath>,
    /// Stale entries.
    pub skipped: Vec<SkippedPath>,
    /// Counts.
    pub summary: ScanSummary,
    /// Whether the case-fold collision check ran.
    pub case_fold_checked: bool,
}

impl ScanResult {
    /// Assemble a result from per-path outcomes given in manifest order.
    pub fn from_outcomes(
        outcomes: Vec<(ManifestPath, ScanOutcome)>,
        source_root: &std::path::Path,
        target_root: &std::path::Path,
        case_fold_checked: bool,
    ) -> Self {
        let mut manifest = Vec::with_capacity(outcomes.len());
        let mut conflicts = Vec::new();
        let mut clean = Vec::new();
        let mut skipped = Vec::new();

        for (path, outcome) in outcomes {
            match outcome {
                ScanOutcome::Clean => clean.push(path.clone()),
                ScanOutcome::Conflict(detail) => conflicts.push(ConflictRecord {
                    target_path: path.resolve(target_root),
                    source_path: path.resolve(source_root),
                    path: path.clone(),
                    detail,
                }),
                ScanOutcome::Skipped(reason) => skipped.push(SkippedPath {
                    path: path.clone(),
                    reason,
                }),
            }
            manifest.push(path);
        }

        let summary = ScanSummary {
            total: manifest.len(),
            conflicts: conflicts.len(),
            clean: clean.len(),
            skipped: skipped.len(),
        };

        Self {
            manifest,
            conflicts,
            clean,
            skipped,
            summary,
            case_fold_checked,
        }
    }

    /// Check if any path blocks the copy phase.
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Check if the copy phase may run.
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Number of conflicts caused by failed lookups.
    pub fn lookup_error_count(&self) -> usize {
        self.conflicts.iter().filter(|c| c.is_lookup_error()).count()
    }
}
