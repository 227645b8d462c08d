// src/task/inputs.rs

//! Input discovery: expand a task's globs against the project tree.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use globset::GlobMatcher;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::Result;
use crate::watch::patterns::{compile_glob, glob_base, normalize_glob, slash_path};

/// One compiled `src` glob together with its base directory.
#[derive(Debug, Clone)]
pub struct SourcePattern {
    pattern: String,
    base: PathBuf,
    /// Walk depth below `base`; `None` when the glob contains `**`.
    max_depth: Option<usize>,
    matcher: GlobMatcher,
}

impl SourcePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = normalize_glob(pattern);
        let base = glob_base(pattern);
        Ok(Self {
            pattern: pattern.to_string(),
            max_depth: walk_depth(pattern, &base),
            base,
            matcher: compile_glob(pattern)?.compile_matcher(),
        })
    }
}

fn walk_depth(pattern: &str, base: &Path) -> Option<usize> {
    if pattern.contains("**") {
        return None;
    }
    let base_len = match base.to_str() {
        Some(".") | None => 0,
        Some(b) => b.split('/').count(),
    };
    Some(pattern.split('/').count().saturating_sub(base_len).max(1))
}

/// A file matched by a task, with the path it will take under `dest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    pub path: PathBuf,
    pub output: PathBuf,
}

/// Collect every regular file under `root` matched by any of `patterns`.
///
/// Each pattern only walks its own base directory; a missing base means no
/// matches. Symlinks are followed, and a link pointing back at one of its own
/// ancestors is skipped with a warning. A file matched by several patterns is
/// reported once, with the output path of the first pattern that matched.
/// Results are sorted by path.
pub async fn collect_matching_files(
    root: &Path,
    patterns: &[SourcePattern],
) -> Result<Vec<MatchedFile>> {
    let root = root.to_path_buf();
    let patterns = patterns.to_vec();
    tokio::task::spawn_blocking(move || walk_patterns(&root, &patterns))
        .await
        .map_err(anyhow::Error::from)?
}

fn walk_patterns(root: &Path, patterns: &[SourcePattern]) -> Result<Vec<MatchedFile>> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut files = Vec::new();

    for pattern in patterns {
        let base_dir = root.join(&pattern.base);
        if !base_dir.is_dir() {
            debug!(pattern = %pattern.pattern, base = ?base_dir, "glob base missing; no matches");
            continue;
        }

        let mut walker = WalkDir::new(&base_dir).follow_links(true);
        if let Some(depth) = pattern.max_depth {
            walker = walker.max_depth(depth);
        }

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.loop_ancestor().is_some() => {
                    warn!(pattern = %pattern.pattern, path = ?err.path(), "skipping symlink loop");
                    continue;
                }
                // Removed between listing and reading; an editor swap file, say.
                Err(err) if err.io_error().is_some_and(|e| e.kind() == io::ErrorKind::NotFound) => {
                    continue;
                }
                Err(err) => return Err(io::Error::from(err).into()),
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            if !pattern.matcher.is_match(slash_path(rel)) {
                continue;
            }
            let output = rel
                .strip_prefix(&pattern.base)
                .unwrap_or(rel)
                .to_path_buf();
            if seen.insert(path.clone()) {
                files.push(MatchedFile { path, output });
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}
