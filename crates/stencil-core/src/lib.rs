//! Core types for stencil.
//!
//! This crate provides the data model shared by the scanner and the copy
//! engine: manifest paths, filesystem entry descriptors, captured I/O
//! failures, and the run configuration.

mod config;
mod entry;
mod error;
mod manifest;

pub use config::{CaseFoldPolicy, CloneConfig, CloneConfigBuilder, CloneConfigBuilderError, Mode};
pub use entry::{EntryDescriptor, EntryKind, IoFailure, Lookup, lookup};
pub use error::{CloneError, ManifestError};
pub use manifest::{Manifest, ManifestPath};
