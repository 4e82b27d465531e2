//! Copy engine: materialise clean manifest paths from source to target.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use stencil_core::{CloneConfig, CloneError, EntryKind, IoFailure, Lookup, ManifestPath, lookup};

use crate::progress::{CopyOutcome, CopyProgress};
use crate::{CopyError, PROGRESS_CHANNEL_SIZE};

/// Options for a copy batch.
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Refuse to write over anything that appeared at the target after the scan.
    pub verify_before_write: bool,
    /// Worker threads (0 or 1 = sequential).
    pub workers: usize,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            verify_before_write: true,
            workers: 1,
        }
    }
}

impl CopyOptions {
    /// Take the copy-related settings from a run configuration.
    pub fn from_config(config: &CloneConfig) -> Self {
        Self {
            verify_before_write: config.verify_before_write,
            workers: config.effective_workers(),
        }
    }
}

/// What a single successful entry produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Copied {
    File { bytes: u64 },
    Symlink,
    Directory { created: bool },
}

/// Copies manifest paths from a source root to a target root.
///
/// The engine does not re-scan for conflicts: callers must pass only the
/// clean set of a scan that found no conflicts. With `verify_before_write`
/// off, existing regular files at the target are overwritten.
pub struct CopyEngine {
    progress_tx: broadcast::Sender<CopyProgress>,
}

impl CopyEngine {
    /// Create a new copy engine.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(PROGRESS_CHANNEL_SIZE);
        Self { progress_tx }
    }

    /// Subscribe to copy progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<CopyProgress> {
        self.progress_tx.subscribe()
    }

    /// Copy every path, recording per-path failures instead of stopping.
    ///
    /// A path listed more than once is copied once, at its first position.
    /// The only error is a failure to start the worker pool.
    pub fn copy(
        &self,
        source_root: &Path,
        target_root: &Path,
        paths: &[ManifestPath],
        options: &CopyOptions,
    ) -> Result<CopyOutcome, CloneError> {
        let mut seen = HashSet::with_capacity(paths.len());
        let paths: Vec<&ManifestPath> = paths.iter().filter(|path| seen.insert(*path)).collect();
        let progress = Mutex::new(CopyProgress::new(paths.len()));

        let copy_one = |path: &ManifestPath| {
            let result = copy_entry(path, source_root, target_root, options.verify_before_write);
            self.record(&progress, path, &result);
            result
        };

        let workers = options.workers.max(1);
        let results: Vec<Result<Copied, CopyError>> = if workers > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| CloneError::WorkerPool {
                    workers,
                    message: e.to_string(),
                })?;
            pool.install(|| paths.par_iter().copied().map(copy_one).collect())
        } else {
            paths.iter().copied().map(copy_one).collect()
        };

        let mut outcome = CopyOutcome::default();
        for result in results {
            match result {
                Ok(Copied::File { bytes }) => {
                    outcome.files_written += 1;
                    outcome.bytes_copied += bytes;
                }
                Ok(Copied::Symlink) => outcome.symlinks_copied += 1,
                Ok(Copied::Directory { created }) => {
                    if created {
                        outcome.directories_created += 1;
                    }
                }
                Err(err) => outcome.errors.push(err),
            }
        }

        info!(
            files = outcome.files_written,
            symlinks = outcome.symlinks_copied,
            bytes = outcome.bytes_copied,
            errors = outcome.errors.len(),
            "copy complete"
        );
        Ok(outcome)
    }

    fn record(
        &self,
        progress: &Mutex<CopyProgress>,
        path: &ManifestPath,
        result: &Result<Copied, CopyError>,
    ) {
        let Ok(mut progress) = progress.lock() else {
            return;
        };
        progress.entries_completed += 1;
        match result {
            Ok(Copied::File { bytes }) => progress.bytes_copied += bytes,
            Ok(_) => {}
            Err(_) => progress.errors += 1,
        }
        progress.current_file = Some(path.clone());

        // No subscribers is fine.
        let _ = self.progress_tx.send(progress.clone());
    }
}

impl Default for CopyEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Materialise one manifest path.
fn copy_entry(
    path: &ManifestPath,
    source_root: &Path,
    target_root: &Path,
    verify_before_write: bool,
) -> Result<Copied, CopyError> {
    let source = path.resolve(source_root);
    let target = path.resolve(target_root);
    let fail = |err: io::Error| {
        let record = CopyError::from_io(path, &source, &target, &err);
        warn!(path = %path, error = %record.failure, "copy failed");
        record
    };

    // Following a symlinked ancestor would write outside the target root.
    if verify_before_write {
        if let Some(ancestor) = path.symlinked_ancestor(target_root) {
            return Err(fail(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{ancestor} is a symlink"),
            )));
        }
    }

    // Concurrent creation of a shared parent is not an error.
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(fail)?;
    }

    let metadata = fs::symlink_metadata(&source).map_err(fail)?;

    match EntryKind::from_file_type(metadata.file_type()) {
        EntryKind::Symlink => {
            let link = fs::read_link(&source).map_err(fail)?;
            // Link text is copied verbatim, never re-resolved against the target root.
            create_symlink(&link, &source, &target).map_err(fail)?;
            debug!(path = %path, link = %link.display(), "symlink copied");
            Ok(Copied::Symlink)
        }
        EntryKind::File => {
            let written = if verify_before_write {
                copy_to_new_file(&source, &target)
            } else {
                fs::copy(&source, &target)
            };
            let bytes = written.map_err(fail)?;
            fs::set_permissions(&target, metadata.permissions()).map_err(fail)?;
            debug!(path = %path, bytes, "file copied");
            Ok(Copied::File { bytes })
        }
        EntryKind::Directory => match lookup(&target) {
            Lookup::Found(existing) if existing.kind.is_dir() => {
                Ok(Copied::Directory { created: false })
            }
            Lookup::Found(existing) => Err(fail(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} occupies directory path", existing.kind),
            ))),
            Lookup::NotFound => {
                fs::create_dir_all(&target).map_err(fail)?;
                debug!(path = %path, "directory created");
                Ok(Copied::Directory { created: true })
            }
            Lookup::Failed(failure) => Err(CopyError::new(path, &source, &target, failure)),
        },
        EntryKind::Other => Err(CopyError::new(
            path,
            &source,
            &target,
            IoFailure::new("Unsupported", "unsupported entry type"),
        )),
    }
}

/// Copy file content into a target that must not exist yet.
fn copy_to_new_file(source: &Path, target: &Path) -> io::Result<u64> {
    let mut reader = File::open(source)?;
    let mut writer = OpenOptions::new().write(true).create_new(true).open(target)?;
    io::copy(&mut reader, &mut writer)
}

#[cfg(unix)]
fn create_symlink(link: &Path, _source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(link, target)
}

#[cfg(windows)]
fn create_symlink(link: &Path, source: &Path, target: &Path) -> io::Result<()> {
    // Windows needs to know the kind of the link's referent.
    let points_at_dir = fs::metadata(source).map(|m| m.is_dir()).unwrap_or(false);
    if points_at_dir {
        std::os::windows::fs::symlink_dir(link, target)
    } else {
        std::os::windows::fs::symlink_file(link, target)
    }
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_link: &Path, _source: &Path, _target: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ))
}
