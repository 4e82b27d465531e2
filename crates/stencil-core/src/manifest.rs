//! Scaffold manifest: the ordered list of relative paths a target should contain.

use std::fs;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::entry::{Lookup, lookup};
use crate::error::ManifestError;

/// A normalised, slash-delimited path relative to both roots.
///
/// Empty and `.` components are dropped; absolute paths and `..` components
/// are rejected so a manifest entry can never resolve outside its root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ManifestPath(CompactString);

impl ManifestPath {
    /// Parse and normalise a raw manifest entry.
    pub fn parse(raw: &str) -> Result<Self, ManifestError> {
        if raw.is_empty() {
            return Err(ManifestError::invalid(raw, "entry is empty"));
        }
        if raw.starts_with('/') || Path::new(raw).is_absolute() {
            return Err(ManifestError::invalid(raw, "absolute paths are not allowed"));
        }

        let mut normalised = CompactString::default();
        for component in raw.split('/') {
            match component {
                "" | "." => continue,
                ".." => {
                    return Err(ManifestError::invalid(
                        raw,
                        "parent components are not allowed",
                    ));
                }
                name => {
                    if !normalised.is_empty() {
                        normalised.push('/');
                    }
                    normalised.push_str(name);
                }
            }
        }

        if normalised.is_empty() {
            return Err(ManifestError::invalid(raw, "entry names no path"));
        }
        Ok(Self(normalised))
    }

    /// The normalised path text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join this path onto a root directory.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        let mut resolved = root.to_path_buf();
        for component in self.0.split('/') {
            resolved.push(component);
        }
        resolved
    }

    /// Proper prefixes of this path, shortest first: `a/b/c` yields `a` then `a/b`.
    pub fn ancestors(&self) -> impl Iterator<Item = ManifestPath> + '_ {
        self.as_str()
            .match_indices('/')
            .map(|(end, _)| Self(CompactString::from(&self.as_str()[..end])))
    }

    /// First ancestor that is a symlink under `root`, if any.
    ///
    /// Stops at the first ancestor that is missing or not a directory; a
    /// file or failed lookup there surfaces in the lookup of the full path.
    pub fn symlinked_ancestor(&self, root: &Path) -> Option<ManifestPath> {
        for ancestor in self.ancestors() {
            match lookup(&ancestor.resolve(root)) {
                Lookup::Found(entry) if entry.kind.is_dir() => {}
                Lookup::Found(entry) if entry.kind.is_symlink() => return Some(ancestor),
                _ => return None,
            }
        }
        None
    }

    /// Key used to detect collisions on case-insensitive filesystems.
    pub fn case_fold_key(&self) -> String {
        self.as_str().to_lowercase()
    }
}

impl std::fmt::Display for ManifestPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ManifestPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// On-disk manifest layout.
#[derive(Debug, Deserialize)]
struct ManifestFile {
    paths: Vec<String>,
}

/// Ordered scaffold manifest. Duplicates are kept as given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    paths: Vec<ManifestPath>,
}

impl Manifest {
    /// Default manifest file for a source root: `manifest/scaffold.json`.
    pub fn default_location(source_root: &Path) -> PathBuf {
        source_root.join("manifest").join("scaffold.json")
    }

    /// Build a manifest from raw entries, validating each one.
    pub fn from_paths<I, S>(paths: I) -> Result<Self, ManifestError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths = paths
            .into_iter()
            .map(|raw| ManifestPath::parse(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { paths })
    }

    /// Load a manifest file: a JSON object with a `paths` string array.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ManifestFile =
            serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_paths(file.paths)
    }

    /// Entries in manifest order.
    pub fn paths(&self) -> &[ManifestPath] {
        &self.paths
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Iterate over entries in manifest order.
    pub fn iter(&self) -> std::slice::Iter<'_, ManifestPath> {
        self.paths.iter()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a ManifestPath;
    type IntoIter = std::slice::Iter<'a, ManifestPath>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalises() {
        assert_eq!(ManifestPath::parse("a.txt").unwrap().as_str(), "a.txt");
        assert_eq!(ManifestPath::parse("./dir//b.txt").unwrap().as_str(), "dir/b.txt");
        assert_eq!(ManifestPath::parse("dir/sub/").unwrap().as_str(), "dir/sub");
    }

    #[test]
    fn test_parse_rejects_escapes() {
        assert!(ManifestPath::parse("").is_err());
        assert!(ManifestPath::parse("/etc/passwd").is_err());
        assert!(ManifestPath::parse("../x").is_err());
        assert!(ManifestPath::parse("a/../../x").is_err());
        assert!(ManifestPath::parse("./").is_err());
    }

    #[test]
    fn test_resolve() {
        let path = ManifestPath::parse("dir/b.txt").unwrap();
        assert_eq!(
            path.resolve(Path::new("/root")),
            Path::new("/root").join("dir").join("b.txt")
        );
    }

    #[test]
    fn test_case_fold_key() {
        let upper = ManifestPath::parse("Docs/README.md").unwrap();
        let lower = ManifestPath::parse("docs/readme.md").unwrap();
        assert_ne!(upper, lower);
        assert_eq!(upper.case_fold_key(), lower.case_fold_key());
    }

    #[test]
    fn test_ancestors() {
        let path = ManifestPath::parse("a/b/c.txt").unwrap();
        let names: Vec<_> = path.ancestors().map(|p| p.as_str().to_string()).collect();
        assert_eq!(names, ["a", "a/b"]);
        assert_eq!(ManifestPath::parse("top.txt").unwrap().ancestors().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_ancestor() {
        let root = tempfile::TempDir::new().unwrap();
        let elsewhere = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("real/sub")).unwrap();
        std::os::unix::fs::symlink(elsewhere.path(), root.path().join("real/link")).unwrap();

        let through_link = ManifestPath::parse("real/link/x.md").unwrap();
        assert_eq!(
            through_link.symlinked_ancestor(root.path()).unwrap().as_str(),
            "real/link"
        );

        let plain = ManifestPath::parse("real/sub/x.md").unwrap();
        assert!(plain.symlinked_ancestor(root.path()).is_none());

        let missing = ManifestPath::parse("absent/link/x.md").unwrap();
        assert!(missing.symlinked_ancestor(root.path()).is_none());

        // The final component is never an ancestor.
        let leaf = ManifestPath::parse("real/link").unwrap();
        assert!(leaf.symlinked_ancestor(root.path()).is_none());
    }

    #[test]
    fn test_from_paths_keeps_order_and_duplicates() {
        let manifest = Manifest::from_paths(["b", "a", "b"]).unwrap();
        let names: Vec<_> = manifest.iter().map(ManifestPath::as_str).collect();
        assert_eq!(names, ["b", "a", "b"]);
    }
}
