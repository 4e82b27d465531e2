//! Copy engine and scan-then-copy pipeline for stencil.
//!
//! The copy engine materialises files, directories and symlinks, preserving
//! link text and permission bits, and records per-path failures without
//! aborting the batch. The pipeline runs the scanner first and only lets the
//! copy engine near the target when the scan found no conflicts and the run
//! is in commit mode.

mod copy;
mod operation;
mod pipeline;
mod progress;

pub use copy::{CopyEngine, CopyOptions};
pub use operation::CopyError;
pub use pipeline::{Pipeline, PipelineReport, PipelineState, PipelineStatus};
pub use progress::{CopyOutcome, CopyProgress};

/// Default channel buffer size for copy progress updates.
pub const PROGRESS_CHANNEL_SIZE: usize = 100;
