//! Scan-then-copy orchestration.
//!
//! ```text
//! Idle -> Scanning -> ConflictsFound                  (terminal, both modes)
//!                  -> Clean                           (terminal in preview)
//!                  -> Clean -> Copying -> Done        (commit)
//!                                      -> PartiallyDone
//! ```

use std::fs;
use std::io;

use serde::Serialize;
use strum::Display;
use tokio::sync::broadcast;
use tracing::{debug, info};

use stencil_core::{CloneConfig, CloneError, Manifest, Mode};
use stencil_scan::{ConflictScanner, ScanProgress, ScanResult};

use crate::copy::{CopyEngine, CopyOptions};
use crate::progress::{CopyOutcome, CopyProgress};

/// Where a pipeline run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Scanning,
    ConflictsFound,
    Clean,
    Copying,
    Done,
    PartiallyDone,
}

impl PipelineState {
    /// Check if `next` is a legal successor of this state.
    pub fn can_advance_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, Scanning)
                | (Scanning, ConflictsFound)
                | (Scanning, Clean)
                | (Clean, Copying)
                | (Copying, Done)
                | (Copying, PartiallyDone)
        )
    }

    /// Check if a run in `mode` stops in this state.
    pub fn is_terminal(self, mode: Mode) -> bool {
        match self {
            Self::ConflictsFound | Self::Done | Self::PartiallyDone => true,
            Self::Clean => mode == Mode::Preview,
            Self::Idle | Self::Scanning | Self::Copying => false,
        }
    }
}

/// How a pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// At least one path conflicts; nothing was written.
    ConflictsFound,
    /// Preview found no conflicts; nothing was written.
    Clean,
    /// Every clean path was copied.
    Committed,
    /// The copy phase ran but some paths failed.
    PartiallyCommitted,
}

impl PipelineStatus {
    /// Check if the run should be reported as a success.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Clean | Self::Committed)
    }
}

/// Everything a single pipeline run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Mode the run used.
    pub mode: Mode,
    /// How the run ended.
    pub status: PipelineStatus,
    /// Scan phase result.
    pub scan: ScanResult,
    /// Copy phase result, present only if the copy phase ran.
    pub copy: Option<CopyOutcome>,
}

/// Runs the scanner and, when safe and allowed, the copy engine.
pub struct Pipeline {
    config: CloneConfig,
    scanner: ConflictScanner,
    engine: CopyEngine,
    state: PipelineState,
}

impl Pipeline {
    /// Create a pipeline for a configuration.
    pub fn new(config: CloneConfig) -> Self {
        Self {
            config,
            scanner: ConflictScanner::new(),
            engine: CopyEngine::new(),
            state: PipelineState::Idle,
        }
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &CloneConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Subscribe to scan progress.
    pub fn subscribe_scan(&self) -> broadcast::Receiver<ScanProgress> {
        self.scanner.subscribe()
    }

    /// Subscribe to copy progress.
    pub fn subscribe_copy(&self) -> broadcast::Receiver<CopyProgress> {
        self.engine.subscribe()
    }

    /// Scan the manifest, then copy the clean set if the scan found no
    /// conflicts and the mode is commit.
    ///
    /// Any conflict, including a failed lookup, stops the run before a single
    /// write. Errors are reserved for unusable roots and worker-pool startup.
    pub fn run(&mut self, manifest: &Manifest) -> Result<PipelineReport, CloneError> {
        self.state = PipelineState::Idle;
        self.check_roots()?;

        self.transition(PipelineState::Scanning);
        let scan = self.scanner.scan(&self.config, manifest)?;

        if scan.has_conflicts() {
            self.transition(PipelineState::ConflictsFound);
            info!(conflicts = scan.conflicts.len(), "conflicts found; nothing written");
            return Ok(self.report(PipelineStatus::ConflictsFound, scan, None));
        }

        self.transition(PipelineState::Clean);
        if !self.config.is_commit() {
            return Ok(self.report(PipelineStatus::Clean, scan, None));
        }

        self.transition(PipelineState::Copying);
        let copy = self.engine.copy(
            &self.config.source_root,
            &self.config.target_root,
            &scan.clean,
            &CopyOptions::from_config(&self.config),
        )?;

        let status = if copy.is_success() {
            self.transition(PipelineState::Done);
            PipelineStatus::Committed
        } else {
            self.transition(PipelineState::PartiallyDone);
            PipelineStatus::PartiallyCommitted
        };
        Ok(self.report(status, scan, Some(copy)))
    }

    fn check_roots(&self) -> Result<(), CloneError> {
        let source = &self.config.source_root;
        match fs::metadata(source) {
            Ok(metadata) if metadata.is_dir() => {}
            _ => return Err(CloneError::SourceNotDirectory { path: source.clone() }),
        }

        // A missing target is fine: every path is clean and commit creates it.
        let target = &self.config.target_root;
        match fs::metadata(target) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Err(CloneError::TargetNotDirectory { path: target.clone() }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                return Err(CloneError::TargetUnreadable {
                    path: target.clone(),
                    source: err,
                });
            }
        }

        // A scaffold scanned against itself reports every shipped path as occupied.
        if let (Ok(source), Ok(target)) = (fs::canonicalize(source), fs::canonicalize(target)) {
            if source == target {
                return Err(CloneError::SameRoot { path: target });
            }
        }
        Ok(())
    }

    fn transition(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "pipeline transition");
        self.state = next;
    }

    fn report(
        &self,
        status: PipelineStatus,
        scan: ScanResult,
        copy: Option<CopyOutcome>,
    ) -> PipelineReport {
        PipelineReport {
            mode: self.config.mode,
            status,
            scan,
            copy,
        }
    }
}
