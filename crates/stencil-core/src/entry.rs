//! Filesystem entry descriptors, gathered without following symlinks.

use std::fs::{self, FileType, Metadata};
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::Display;

/// Type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link (never dereferenced).
    Symlink,
    /// Sockets, FIFOs, devices.
    Other,
}

impl EntryKind {
    /// Classify a file type as returned by `symlink_metadata`.
    pub fn from_file_type(file_type: FileType) -> Self {
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlink)
    }
}

/// What a non-following lookup found at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDescriptor {
    /// Entry type.
    pub kind: EntryKind,
    /// Size in bytes as reported by the filesystem (link text length for symlinks).
    pub size: u64,
    /// Permission bits.
    pub mode: u32,
}

impl EntryDescriptor {
    /// Create a new descriptor.
    pub fn new(kind: EntryKind, size: u64, mode: u32) -> Self {
        Self { kind, size, mode }
    }

    /// Build a descriptor from `symlink_metadata` output.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            kind: EntryKind::from_file_type(metadata.file_type()),
            size: metadata.len(),
            mode: permission_bits(metadata),
        }
    }

    /// Descriptors are compared on kind and size only; content is never read.
    pub fn differs_from(&self, other: &EntryDescriptor) -> bool {
        self.kind != other.kind || self.size != other.size
    }

    /// Whether any execute bit is set.
    pub fn is_executable(&self) -> bool {
        self.mode & 0o111 != 0
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

/// An `io::Error` captured as plain data so it can be reported and serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoFailure {
    /// Error kind name, e.g. `PermissionDenied`.
    pub kind: String,
    /// Raw OS error number, when the failure came from the OS.
    pub os_code: Option<i32>,
    /// Human-readable message.
    pub message: String,
}

impl IoFailure {
    /// Create a failure that did not originate from an OS error.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            os_code: None,
            message: message.into(),
        }
    }

    /// Short code suitable for reports: the kind, plus the OS number if present.
    pub fn code(&self) -> String {
        match self.os_code {
            Some(code) => format!("{} ({code})", self.kind),
            None => self.kind.clone(),
        }
    }
}

impl From<&io::Error> for IoFailure {
    fn from(err: &io::Error) -> Self {
        Self {
            kind: format!("{:?}", err.kind()),
            os_code: err.raw_os_error(),
            message: err.to_string(),
        }
    }
}

impl From<io::Error> for IoFailure {
    fn from(err: io::Error) -> Self {
        Self::from(&err)
    }
}

impl std::fmt::Display for IoFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.message, self.code())
    }
}

/// Result of a non-following lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Something exists at the path.
    Found(EntryDescriptor),
    /// Nothing exists at the path.
    NotFound,
    /// The lookup failed for another reason (permission, I/O).
    Failed(IoFailure),
}

impl Lookup {
    /// Check if an entry was found.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Check if the path was reported absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// The descriptor, if an entry was found.
    pub fn descriptor(&self) -> Option<&EntryDescriptor> {
        match self {
            Self::Found(descriptor) => Some(descriptor),
            _ => None,
        }
    }
}

/// Look up `path` without following a symlink in its final component.
///
/// "Not found" is kept distinct from every other failure; the scanner's
/// clean/conflict classification depends on it.
pub fn lookup(path: &Path) -> Lookup {
    match fs::symlink_metadata(path) {
        Ok(metadata) => Lookup::Found(EntryDescriptor::from_metadata(&metadata)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Lookup::NotFound,
        Err(err) => Lookup::Failed(IoFailure::from(&err)),
    }
}
