//! Conflict scanner for stencil.
//!
//! Compares a manifest of relative paths against the live state of a target
//! directory and partitions the paths into clean, conflicting, and skipped.
//! The scanner only reads; it never follows symlinks and never hashes content.
//!
//! # Classification
//!
//! - **Clean**: nothing exists at the target and the template ships the path.
//! - **Conflict**: something exists at the target, or the target lookup failed
//!   for a reason other than "not found", or (on case-insensitive targets) a
//!   different manifest path folds to the same name.
//! - **Skipped**: the template does not ship the path.
//!
//! # Example
//!
//! ```rust,no_run
//! use stencil_core::{CloneConfig, Manifest};
//! use stencil_scan::ConflictScanner;
//!
//! let config = CloneConfig::new("/path/to/template", "/path/to/repo");
//! let manifest = Manifest::from_paths(["AGENTS.md", "docs/guide.md"]).unwrap();
//!
//! let scanner = ConflictScanner::new();
//! let result = scanner.scan(&config, &manifest).unwrap();
//!
//! for conflict in &result.conflicts {
//!     println!("{} is occupied", conflict.path);
//! }
//! ```

mod casefold;
mod progress;
mod result;
mod scanner;

pub use casefold::{CaseFoldIndex, detect_case_insensitive, resolve_policy};
pub use progress::ScanProgress;
pub use result::{
    ConflictDetail, ConflictRecord, ScanOutcome, ScanResult, ScanSummary, SkipReason, SkippedPath,
};
pub use scanner::{ConflictScanner, classify};

// Re-export core types for convenience
pub use stencil_core::{
    CaseFoldPolicy, CloneConfig, EntryDescriptor, EntryKind, IoFailure, Manifest, ManifestPath,
};
