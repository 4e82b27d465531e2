//! Run configuration.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Whether a run may write to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Scan and report only; the target is never touched.
    #[default]
    Preview,
    /// Scan, then copy if and only if the scan found no conflicts.
    Commit,
}

/// When to check for manifest paths that collide under case folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CaseFoldPolicy {
    /// Probe the target filesystem and check only if it is case-insensitive.
    #[default]
    Auto,
    /// Always check.
    Always,
    /// Never check.
    Never,
}

/// Configuration for one scan-then-copy run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct CloneConfig {
    /// Root of the template the manifest describes.
    pub source_root: PathBuf,

    /// Root of the repository to materialise the scaffold into.
    pub target_root: PathBuf,

    /// Preview or commit.
    #[builder(default)]
    #[serde(default)]
    pub mode: Mode,

    /// Case-fold collision policy.
    #[builder(default)]
    #[serde(default)]
    pub case_fold: CaseFoldPolicy,

    /// Worker threads for scanning and copying (0 or 1 = sequential).
    #[builder(default = "1")]
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Re-check each target immediately before writing it.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub verify_before_write: bool,
}

fn default_workers() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl CloneConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.source_root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Source root cannot be empty".to_string());
            }
            None => return Err("Source root is required".to_string()),
            _ => {}
        }
        match self.target_root {
            Some(ref root) if root.as_os_str().is_empty() => {
                Err("Target root cannot be empty".to_string())
            }
            None => Err("Target root is required".to_string()),
            _ => Ok(()),
        }
    }
}

impl CloneConfig {
    /// Create a new config builder.
    pub fn builder() -> CloneConfigBuilder {
        CloneConfigBuilder::default()
    }

    /// Create a preview config with default settings.
    pub fn new(source_root: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            target_root: target_root.into(),
            mode: Mode::Preview,
            case_fold: CaseFoldPolicy::Auto,
            workers: 1,
            verify_before_write: true,
        }
    }

    /// Switch to commit mode.
    pub fn committing(mut self) -> Self {
        self.mode = Mode::Commit;
        self
    }

    /// Check whether this run is allowed to write.
    pub fn is_commit(&self) -> bool {
        self.mode == Mode::Commit
    }

    /// Worker count with 0 treated as 1.
    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }
}
