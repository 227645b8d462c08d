// src/watch/path_utils.rs

//! Path helpers for turning watcher events into glob-matchable strings.

use std::path::Path;

use super::patterns::slash_path;

/// `path` relative to `root`, with forward slashes.
///
/// Falls back to comparing canonicalized paths, since some platforms report
/// events under a different absolute prefix than the one watched (macOS
/// `/private/var` vs `/var`). A path that no longer exists can only use the
/// fast path. Returns `None` for paths outside `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(slash_path(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = path.canonicalize().ok()?;
    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(slash_path)
}

/// `dir` with `.` and empty segments removed and forward slashes:
/// `./dist/` becomes `dist`, `.` becomes the empty string.
pub fn normalize_rel_dir(dir: &str) -> String {
    dir.replace('\\', "/")
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// A configured directory (relative to `root`, or absolute) as a
/// slash-separated path relative to `root`.
///
/// Returns `None` for the root itself and for directories outside it.
pub fn relative_dir(root: &Path, dir: &str) -> Option<String> {
    let path = Path::new(dir);
    let rel = if path.is_absolute() {
        relative_str(root, path)?
    } else {
        dir.to_string()
    };
    let rel = normalize_rel_dir(&rel);
    (!rel.is_empty()).then_some(rel)
}

/// Whether the slash-separated `rel` lies inside the directory `dir`.
pub fn is_within(rel: &str, dir: &str) -> bool {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        return false;
    }
    rel == dir
        || rel
            .strip_prefix(dir)
            .is_some_and(|rest| rest.starts_with('/'))
}
