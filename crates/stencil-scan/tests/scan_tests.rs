use std::fs;
use std::path::Path;

use stencil_scan::{
    CaseFoldPolicy, CloneConfig, ConflictDetail, ConflictScanner, EntryKind, Manifest,
    SkipReason,
};
use tempfile::TempDir;

fn config(source: &Path, target: &Path) -> CloneConfig {
    CloneConfig::builder()
        .source_root(source)
        .target_root(target)
        .case_fold(CaseFoldPolicy::Never)
        .build()
        .unwrap()
}

fn create_template() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    fs::create_dir(root.join("dir")).unwrap();
    fs::write(root.join("a.txt"), "0123456789").unwrap();
    fs::write(root.join("dir/b.txt"), "nested").unwrap();

    temp
}

#[test]
fn test_empty_target_is_clean() {
    let source = create_template();
    let target = TempDir::new().unwrap();
    let manifest = Manifest::from_paths(["a.txt", "dir/b.txt"]).unwrap();

    let result = ConflictScanner::new()
        .scan(&config(source.path(), target.path()), &manifest)
        .unwrap();

    let clean: Vec<_> = result.clean.iter().map(|p| p.as_str()).collect();
    assert_eq!(clean, ["a.txt", "dir/b.txt"]);
    assert!(result.conflicts.is_empty());
    assert!(result.is_clean());
    assert_eq!(result.summary.total, 2);
}

#[test]
fn test_size_mismatch_is_conflict() {
    let source = create_template();
    let target = TempDir::new().unwrap();
    fs::write(target.path().join("a.txt"), "12345").unwrap();
    let manifest = Manifest::from_paths(["a.txt"]).unwrap();

    let result = ConflictScanner::new()
        .scan(&config(source.path(), target.path()), &manifest)
        .unwrap();

    assert_eq!(result.conflicts.len(), 1);
    let conflict = &result.conflicts[0];
    assert_eq!(conflict.path.as_str(), "a.txt");
    assert_eq!(conflict.target_path, target.path().join("a.txt"));
    match &conflict.detail {
        ConflictDetail::Existing {
            discovered,
            expected,
        } => {
            assert_eq!(discovered.size, 5);
            assert_eq!(expected.size, 10);
            assert_eq!(discovered.kind, EntryKind::File);
        }
        other => panic!("unexpected detail: {other:?}"),
    }
}

#[test]
fn test_identical_file_is_still_conflict() {
    let source = create_template();
    let target = TempDir::new().unwrap();
    fs::write(target.path().join("a.txt"), "0123456789").unwrap();
    let manifest = Manifest::from_paths(["a.txt"]).unwrap();

    let result = ConflictScanner::new()
        .scan(&config(source.path(), target.path()), &manifest)
        .unwrap();

    assert_eq!(result.summary.conflicts, 1);
    assert!(result.clean.is_empty());
}

#[test]
fn test_type_mismatch_is_conflict() {
    let source = create_template();
    let target = TempDir::new().unwrap();
    fs::create_dir(target.path().join("a.txt")).unwrap();
    let manifest = Manifest::from_paths(["a.txt"]).unwrap();

    let result = ConflictScanner::new()
        .scan(&config(source.path(), target.path()), &manifest)
        .unwrap();

    match &result.conflicts[0].detail {
        ConflictDetail::Existing {
            discovered,
            expected,
        } => {
            assert_eq!(discovered.kind, EntryKind::Directory);
            assert_eq!(expected.kind, EntryKind::File);
        }
        other => panic!("unexpected detail: {other:?}"),
    }
}

#[test]
fn test_nested_conflict_and_explicit_directory() {
    let source = create_template();
    let target = TempDir::new().unwrap();
    fs::create_dir(target.path().join("dir")).unwrap();
    fs::write(target.path().join("dir/b.txt"), "local").unwrap();
    let manifest = Manifest::from_paths(["dir", "dir/b.txt", "a.txt"]).unwrap();

    let result = ConflictScanner::new()
        .scan(&config(source.path(), target.path()), &manifest)
        .unwrap();

    let conflicted: Vec<_> = result.conflicts.iter().map(|c| c.path.as_str()).collect();
    assert_eq!(conflicted, ["dir", "dir/b.txt"]);
    assert_eq!(result.clean.len(), 1);
}

#[cfg(unix)]
#[test]
fn test_symlink_at_target_is_conflict() {
    let source = create_template();
    let target = TempDir::new().unwrap();
    // Dangling link: a following lookup would report "not found".
    std::os::unix::fs::symlink("missing-target", target.path().join("a.txt")).unwrap();
    let manifest = Manifest::from_paths(["a.txt"]).unwrap();

    let result = ConflictScanner::new()
        .scan(&config(source.path(), target.path()), &manifest)
        .unwrap();

    match &result.conflicts[0].detail {
        ConflictDetail::Existing { discovered, .. } => {
            assert_eq!(discovered.kind, EntryKind::Symlink);
        }
        other => panic!("unexpected detail: {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn test_file_in_place_of_parent_is_lookup_error() {
    let source = create_template();
    let target = TempDir::new().unwrap();
    fs::write(target.path().join("dir"), "not a directory").unwrap();
    let manifest = Manifest::from_paths(["dir/b.txt"]).unwrap();

    let result = ConflictScanner::new()
        .scan(&config(source.path(), target.path()), &manifest)
        .unwrap();

    assert_eq!(result.summary.conflicts, 1);
    assert!(result.conflicts[0].is_lookup_error());
    assert_eq!(result.lookup_error_count(), 1);
}

#[cfg(unix)]
#[test]
fn test_symlinked_parent_is_conflict() {
    let source = create_template();
    let target = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();
    std::os::unix::fs::symlink(elsewhere.path(), target.path().join("dir")).unwrap();
    let manifest = Manifest::from_paths(["a.txt", "dir/b.txt"]).unwrap();

    let result = ConflictScanner::new()
        .scan(&config(source.path(), target.path()), &manifest)
        .unwrap();

    assert_eq!(result.clean.len(), 1);
    assert_eq!(result.summary.conflicts, 1);
    let conflict = &result.conflicts[0];
    assert_eq!(conflict.path.as_str(), "dir/b.txt");
    match &conflict.detail {
        ConflictDetail::SymlinkAncestor { ancestor } => assert_eq!(ancestor.as_str(), "dir"),
        other => panic!("expected symlinked ancestor, got {other:?}"),
    }
    assert!(!conflict.is_lookup_error());
}

#[cfg(unix)]
#[test]
fn test_permission_denied_is_conflict() {
    use std::os::unix::fs::PermissionsExt;

    let source = create_template();
    let target = TempDir::new().unwrap();
    let locked = target.path().join("dir");
    fs::create_dir(&locked).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users bypass permission bits; nothing to test then.
    if fs::symlink_metadata(locked.join("b.txt")).is_ok()
        || fs::read_dir(&locked).is_ok()
    {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let manifest = Manifest::from_paths(["dir/b.txt", "a.txt"]).unwrap();
    let result = ConflictScanner::new()
        .scan(&config(source.path(), target.path()), &manifest)
        .unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(result.summary.conflicts, 1);
    match &result.conflicts[0].detail {
        ConflictDetail::LookupFailed { failure } => {
            assert_eq!(failure.kind, "PermissionDenied");
        }
        other => panic!("unexpected detail: {other:?}"),
    }
    // The failure does not stop the rest of the scan.
    assert_eq!(result.clean.len(), 1);
}

#[test]
fn test_exhaustive_partition_with_skipped() {
    let source = create_template();
    let target = TempDir::new().unwrap();
    fs::write(target.path().join("a.txt"), "x").unwrap();
    fs::write(target.path().join("local-only.txt"), "x").unwrap();
    let manifest =
        Manifest::from_paths(["a.txt", "dir/b.txt", "retired.txt", "local-only.txt"]).unwrap();

    let result = ConflictScanner::new()
        .scan(&config(source.path(), target.path()), &manifest)
        .unwrap();

    assert_eq!(
        result.clean.len() + result.conflicts.len() + result.skipped.len(),
        result.manifest.len()
    );
    assert_eq!(result.summary.total, 4);
    assert_eq!(result.summary.skipped, 2);
    assert!(
        result
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::SourceMissing)
    );
}

#[test]
fn test_scan_is_idempotent() {
    let source = create_template();
    let target = TempDir::new().unwrap();
    fs::write(target.path().join("a.txt"), "x").unwrap();
    let manifest = Manifest::from_paths(["a.txt", "dir/b.txt", "nope"]).unwrap();
    let config = config(source.path(), target.path());

    let scanner = ConflictScanner::new();
    let first = scanner.scan(&config, &manifest).unwrap();
    let second = scanner.scan(&config, &manifest).unwrap();

    assert_eq!(first, second);
    // Scanning wrote nothing.
    assert!(!target.path().join("dir").exists());
}

#[test]
fn test_parallel_scan_matches_sequential() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for i in 0..40 {
        let name = format!("file-{i}.txt");
        fs::write(source.path().join(&name), "data").unwrap();
        if i % 3 == 0 {
            fs::write(target.path().join(&name), "local").unwrap();
        }
        paths.push(name);
    }
    let manifest = Manifest::from_paths(&paths).unwrap();

    let sequential = ConflictScanner::new()
        .scan(&config(source.path(), target.path()), &manifest)
        .unwrap();

    let mut parallel_config = config(source.path(), target.path());
    parallel_config.workers = 4;
    let parallel = ConflictScanner::new()
        .scan(&parallel_config, &manifest)
        .unwrap();

    assert_eq!(sequential, parallel);
    assert_eq!(parallel.summary.conflicts, 14);
}

#[test]
fn test_case_fold_collision_when_enabled() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    fs::create_dir(source.path().join("docs")).unwrap();
    fs::write(source.path().join("docs/readme.md"), "lower").unwrap();
    // On a case-sensitive template both names exist; on a folding one they share an entry.
    let _ = fs::create_dir(source.path().join("Docs"));
    let _ = fs::write(source.path().join("Docs/README.md"), "upper");
    let manifest = Manifest::from_paths(["Docs/README.md", "docs/readme.md"]).unwrap();

    let mut folding = config(source.path(), target.path());
    folding.case_fold = CaseFoldPolicy::Always;
    let result = ConflictScanner::new().scan(&folding, &manifest).unwrap();

    assert!(result.case_fold_checked);
    assert_eq!(result.clean.len(), 1);
    assert_eq!(result.conflicts.len(), 1);
    match &result.conflicts[0].detail {
        ConflictDetail::CaseCollision { claimed_by } => {
            assert_eq!(claimed_by.as_str(), "Docs/README.md");
        }
        other => panic!("unexpected detail: {other:?}"),
    }

    let result = ConflictScanner::new()
        .scan(&config(source.path(), target.path()), &manifest)
        .unwrap();
    assert!(!result.case_fold_checked);
    assert_eq!(result.clean.len(), 2);
}

#[test]
fn test_progress_updates() {
    let source = create_template();
    let target = TempDir::new().unwrap();
    fs::write(target.path().join("a.txt"), "x").unwrap();
    let manifest = Manifest::from_paths(["a.txt", "dir/b.txt"]).unwrap();

    let scanner = ConflictScanner::new();
    let mut progress_rx = scanner.subscribe();
    scanner
        .scan(&config(source.path(), target.path()), &manifest)
        .unwrap();

    let mut last = None;
    while let Ok(progress) = progress_rx.try_recv() {
        last = Some(progress);
    }
    let last = last.expect("no progress received");
    assert_eq!(last.paths_scanned, 2);
    assert_eq!(last.paths_total, 2);
    assert_eq!(last.conflicts_found, 1);
    assert!(last.is_complete());
}

#[test]
fn test_json_shape() {
    let source = create_template();
    let target = TempDir::new().unwrap();
    fs::write(target.path().join("a.txt"), "12345").unwrap();
    let manifest = Manifest::from_paths(["a.txt", "dir/b.txt"]).unwrap();

    let result = ConflictScanner::new()
        .scan(&config(source.path(), target.path()), &manifest)
        .unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["summary"]["total"], 2);
    assert_eq!(json["summary"]["clean"], 1);
    assert_eq!(json["conflicts"][0]["path"], "a.txt");
    assert_eq!(json["conflicts"][0]["detail"]["reason"], "existing");
    assert_eq!(json["conflicts"][0]["detail"]["discovered"]["size"], 5);
    assert_eq!(json["conflicts"][0]["detail"]["expected"]["kind"], "file");
    assert_eq!(json["clean"][0], "dir/b.txt");
}
