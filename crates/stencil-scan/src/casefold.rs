//! Case-fold collision detection for case-insensitive targets.
//!
//! Two distinct manifest paths such as `Docs/README.md` and `docs/readme.md`
//! each look clean under a case-sensitive lookup, yet on a case-insensitive
//! filesystem the second copy would land on top of the first.

use std::collections::HashMap;
use std::fs::{self, Metadata};
use std::path::Path;

use stencil_core::{CaseFoldPolicy, ManifestPath};

/// Decide whether the case-fold check runs for `target_root`.
pub fn resolve_policy(policy: CaseFoldPolicy, target_root: &Path) -> bool {
    match policy {
        CaseFoldPolicy::Always => true,
        CaseFoldPolicy::Never => false,
        CaseFoldPolicy::Auto => detect_case_insensitive(target_root),
    }
}

/// Probe whether the filesystem holding `root` is case-insensitive.
///
/// Read-only: looks up the nearest existing ancestor (starting at `root`) whose
/// name contains a cased letter, under a case-swapped name. If the swapped
/// name resolves to the same entry, the filesystem folds case. Returns `false`
/// when no ancestor has a usable name.
pub fn detect_case_insensitive(root: &Path) -> bool {
    let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
    let mut candidate = Some(root.as_path());

    while let Some(path) = candidate {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            let swapped = swap_case(name);
            if swapped != name {
                if let Ok(original) = fs::symlink_metadata(path) {
                    return match fs::symlink_metadata(path.with_file_name(&swapped)) {
                        Ok(folded) => same_entry(&original, &folded),
                        Err(_) => false,
                    };
                }
            }
        }
        candidate = path.parent();
    }

    false
}

fn swap_case(name: &str) -> String {
    name.chars()
        .flat_map(|c| {
            if c.is_lowercase() {
                c.to_uppercase().collect::<Vec<_>>()
            } else if c.is_uppercase() {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                vec![c]
            }
        })
        .collect()
}

#[cfg(unix)]
fn same_entry(a: &Metadata, b: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_entry(a: &Metadata, b: &Metadata) -> bool {
    a.file_type() == b.file_type() && a.len() == b.len()
}

/// Case-folded keys already claimed by earlier manifest paths.
#[derive(Debug, Default)]
pub struct CaseFoldIndex {
    claimed: HashMap<String, ManifestPath>,
}

impl CaseFoldIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the folded key of `path`.
    ///
    /// Returns the earlier path holding the key if it differs from `path`.
    /// Identical duplicates never collide with each other.
    pub fn claim(&mut self, path: &ManifestPath) -> Option<ManifestPath> {
        let key = path.case_fold_key();
        match self.claimed.get(&key) {
            Some(existing) if existing != path => Some(existing.clone()),
            Some(_) => None,
            None => {
                self.claimed.insert(key, path.clone());
                None
            }
        }
    }

    /// Number of distinct keys claimed.
    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    /// Check if nothing has been claimed.
    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}
