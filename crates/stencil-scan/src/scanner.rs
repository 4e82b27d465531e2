//! Conflict scanner: classify manifest paths against the live target.

use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use stencil_core::{CloneConfig, CloneError, Lookup, Manifest, ManifestPath, lookup};

use crate::casefold::{CaseFoldIndex, resolve_policy};
use crate::progress::ScanProgress;
use crate::result::{ConflictDetail, ScanOutcome, ScanResult, SkipReason};

/// Read-only scanner that partitions a manifest into clean, conflicting,
/// and skipped paths.
pub struct ConflictScanner {
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl ConflictScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self { progress_tx }
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Scan every manifest path against the configured roots.
    ///
    /// Per-path failures are recorded in the result. The only error is a
    /// failure to start the worker pool.
    pub fn scan(&self, config: &CloneConfig, manifest: &Manifest) -> Result<ScanResult, CloneError> {
        let source_root = config.source_root.as_path();
        let target_root = config.target_root.as_path();
        let tracker = Mutex::new(Tracker::new(manifest.len() as u64));

        let classify_one = |path: &ManifestPath| {
            let outcome = classify(path, source_root, target_root);
            self.record(&tracker, path, &outcome);
            (path.clone(), outcome)
        };

        let workers = config.effective_workers();
        let mut outcomes: Vec<(ManifestPath, ScanOutcome)> = if workers > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| CloneError::WorkerPool {
                    workers,
                    message: e.to_string(),
                })?;
            pool.install(|| manifest.paths().par_iter().map(classify_one).collect())
        } else {
            manifest.iter().map(classify_one).collect()
        };

        let case_fold_checked = resolve_policy(config.case_fold, target_root);
        if case_fold_checked {
            apply_case_fold(&mut outcomes);
        }

        let result =
            ScanResult::from_outcomes(outcomes, source_root, target_root, case_fold_checked);
        info!(
            total = result.summary.total,
            clean = result.summary.clean,
            conflicts = result.summary.conflicts,
            skipped = result.summary.skipped,
            "scan complete"
        );
        Ok(result)
    }

    fn record(&self, tracker: &Mutex<Tracker>, path: &ManifestPath, outcome: &ScanOutcome) {
        let Ok(mut tracker) = tracker.lock() else {
            return;
        };
        tracker.progress.paths_scanned += 1;
        if outcome.is_conflict() {
            tracker.progress.conflicts_found += 1;
        }
        tracker.progress.current_path = Some(path.clone());
        tracker.progress.elapsed = tracker.start.elapsed();

        // No subscribers is fine.
        let _ = self.progress_tx.send(tracker.progress.clone());
    }
}

impl Default for ConflictScanner {
    fn default() -> Self {
        Self::new()
    }
}

struct Tracker {
    start: Instant,
    progress: ScanProgress,
}

impl Tracker {
    fn new(paths_total: u64) -> Self {
        Self {
            start: Instant::now(),
            progress: ScanProgress::new(paths_total),
        }
    }
}

/// Classify a single manifest path. Performs only non-following lookups.
pub fn classify(path: &ManifestPath, source_root: &Path, target_root: &Path) -> ScanOutcome {
    let target = path.resolve(target_root);

    match lookup(&target) {
        Lookup::NotFound => match lookup(&path.resolve(source_root)) {
            Lookup::Found(_) => match path.symlinked_ancestor(target_root) {
                Some(ancestor) => {
                    warn!(path = %path, ancestor = %ancestor, "target ancestor is a symlink");
                    ScanOutcome::Conflict(ConflictDetail::SymlinkAncestor { ancestor })
                }
                None => {
                    debug!(path = %path, "clean");
                    ScanOutcome::Clean
                }
            },
            Lookup::NotFound => {
                debug!(path = %path, "skipped: not in template");
                ScanOutcome::Skipped(SkipReason::SourceMissing)
            }
            Lookup::Failed(failure) => {
                debug!(path = %path, %failure, "skipped: source lookup failed");
                ScanOutcome::Skipped(SkipReason::SourceLookupFailed)
            }
        },
        Lookup::Found(discovered) => match lookup(&path.resolve(source_root)) {
            Lookup::Found(expected) => {
                debug!(
                    path = %path,
                    discovered = %discovered.kind,
                    expected = %expected.kind,
                    "conflict"
                );
                ScanOutcome::Conflict(ConflictDetail::Existing {
                    discovered,
                    expected,
                })
            }
            Lookup::NotFound => ScanOutcome::Skipped(SkipReason::SourceMissing),
            Lookup::Failed(_) => ScanOutcome::Skipped(SkipReason::SourceLookupFailed),
        },
        Lookup::Failed(failure) => {
            warn!(path = %path, %failure, "target lookup failed; treating as conflict");
            ScanOutcome::Conflict(ConflictDetail::LookupFailed { failure })
        }
    }
}

/// Turn clean paths whose folded name was claimed by an earlier, different
/// path into case collisions. Outcomes must be in manifest order.
fn apply_case_fold(outcomes: &mut [(ManifestPath, ScanOutcome)]) {
    let mut index = CaseFoldIndex::new();

    for (path, outcome) in outcomes.iter_mut() {
        if matches!(outcome, ScanOutcome::Skipped(_)) {
            continue;
        }
        if let Some(claimed_by) = index.claim(path) {
            if matches!(outcome, ScanOutcome::Clean) {
                warn!(path = %path, claimed_by = %claimed_by, "case-fold collision");
                *outcome = ScanOutcome::Conflict(ConflictDetail::CaseCollision { claimed_by });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn path(raw: &str) -> ManifestPath {
        ManifestPath::parse(raw).unwrap()
    }

    #[test]
    fn test_classify_clean() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::write(source.path().join("a.txt"), "a").unwrap();

        let outcome = classify(&path("a.txt"), source.path(), target.path());
        assert_eq!(outcome, ScanOutcome::Clean);
    }

    #[test]
    fn test_classify_stale_entry_is_skipped() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();

        let outcome = classify(&path("gone.txt"), source.path(), target.path());
        assert_eq!(outcome, ScanOutcome::Skipped(SkipReason::SourceMissing));
    }

    #[test]
    fn test_classify_target_only_is_skipped() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::write(target.path().join("local.txt"), "mine").unwrap();

        let outcome = classify(&path("local.txt"), source.path(), target.path());
        assert_eq!(outcome, ScanOutcome::Skipped(SkipReason::SourceMissing));
    }

    #[test]
    fn test_apply_case_fold_only_flags_clean_later_paths() {
        let mut outcomes = vec![
            (path("README.md"), ScanOutcome::Clean),
            (path("readme.md"), ScanOutcome::Clean),
            (path("Readme.md"), ScanOutcome::Skipped(SkipReason::SourceMissing)),
            (path("README.md"), ScanOutcome::Clean),
        ];
        apply_case_fold(&mut outcomes);

        assert_eq!(outcomes[0].1, ScanOutcome::Clean);
        assert_eq!(
            outcomes[1].1,
            ScanOutcome::Conflict(ConflictDetail::CaseCollision {
                claimed_by: path("README.md")
            })
        );
        assert_eq!(outcomes[2].1, ScanOutcome::Skipped(SkipReason::SourceMissing));
        assert_eq!(outcomes[3].1, ScanOutcome::Clean);
    }
}
