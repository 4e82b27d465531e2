//! Human and machine-readable rendering of pipeline results.

use std::fmt::{self, Write as _};
use std::path::Path;

use clap::ValueEnum;
use color_eyre::eyre::Result;
use stencil_ops::{CopyOutcome, PipelineReport, PipelineStatus};
use stencil_scan::{ConflictDetail, ConflictRecord, ScanResult};

const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Render a finished run in the requested format.
pub fn render(report: &PipelineReport, format: OutputFormat, target: &Path) -> Result<String> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
        OutputFormat::Text => match (&report.status, &report.copy) {
            (PipelineStatus::Committed | PipelineStatus::PartiallyCommitted, Some(copy)) => {
                copy_text(copy, target)?
            }
            _ => scan_text(&report.scan)?,
        },
    };
    Ok(rendered)
}

/// Text report of a scan.
pub fn scan_text(scan: &ScanResult) -> Result<String, fmt::Error> {
    let rule = "─".repeat(RULE_WIDTH);
    let mut out = format!(
        " stencil scan report\n{rule}\n\n\
         \x20Total paths in manifest: {}\n\
         \x20Clean (safe to copy):    {}\n\
         \x20Conflicts detected:      {}\n",
        scan.summary.total, scan.summary.clean, scan.summary.conflicts
    );
    if scan.summary.skipped > 0 {
        writeln!(out, " Skipped (not shipped):   {}", scan.summary.skipped)?;
    }
    writeln!(out)?;

    if scan.has_conflicts() {
        writeln!(out, " CONFLICTS\n{rule}")?;
        for conflict in &scan.conflicts {
            writeln!(out)?;
            write_conflict(&mut out, conflict)?;
        }
    } else {
        writeln!(out, " No conflicts detected.\n\n Clean paths:")?;
        for path in &scan.clean {
            writeln!(out, "   {path}")?;
        }
    }

    write!(out, "\n{rule}")?;
    Ok(out)
}

fn write_conflict(out: &mut String, conflict: &ConflictRecord) -> fmt::Result {
    writeln!(out, " Path: {}", conflict.path)?;
    writeln!(out, "   Target:     {}", conflict.target_path.display())?;

    match &conflict.detail {
        ConflictDetail::Existing {
            discovered,
            expected,
        } => {
            writeln!(out, "   Discovered: {} ({} bytes)", discovered.kind, discovered.size)?;
            writeln!(out, "   Expected:   {} ({} bytes)", expected.kind, expected.size)?;
        }
        ConflictDetail::LookupFailed { failure } => {
            writeln!(out, "   Error:      {} ({})", failure.message, failure.code())?;
        }
        ConflictDetail::SymlinkAncestor { ancestor } => {
            writeln!(out, "   Symlink:    {ancestor} (writes would leave the target)")?;
        }
        ConflictDetail::CaseCollision { claimed_by } => {
            writeln!(
                out,
                "   Collides:   {claimed_by} (same name on a case-insensitive target)"
            )?;
        }
    }

    writeln!(out, "   Resolution: resolve manually in the target project, then retry.")
}

/// Text summary of a copy phase.
pub fn copy_text(copy: &CopyOutcome, target: &Path) -> Result<String, fmt::Error> {
    let mut out = format!(
        " {} to {} ({})",
        copy.summary(),
        target.display(),
        humansize::format_size(copy.bytes_copied, humansize::BINARY)
    );

    if !copy.errors.is_empty() {
        write!(out, "\n\n FAILED PATHS\n{}\n", "─".repeat(RULE_WIDTH))?;
        for error in &copy.errors {
            writeln!(out, " Path: {}", error.path)?;
            writeln!(out, "   Target: {}", error.target_path.display())?;
            writeln!(out, "   Error:  {} ({})", error.message(), error.code())?;
        }
    }

    Ok(out)
}
