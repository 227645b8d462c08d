// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobBuilder, GlobMatcher};

use crate::config::model::ConfigFile;
use crate::errors::Result;
use crate::types::TaskName;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Drop leading `./` segments. Globs match root-relative paths such as
/// `src/index.html`, so `./src/*.html` has to be read as `src/*.html`.
pub fn normalize_glob(pattern: &str) -> &str {
    let mut pattern = pattern;
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest.trim_start_matches('/');
    }
    pattern
}

/// Compile a single glob with gulp-style semantics: `*` and `?` never cross a
/// `/`, only `**` does.
pub fn compile_glob(pattern: &str) -> std::result::Result<Glob, globset::Error> {
    GlobBuilder::new(normalize_glob(pattern))
        .literal_separator(true)
        .build()
}

/// Leading path components of `pattern` that contain no glob metacharacters.
///
/// Output paths are computed relative to this base, so `src/images/**/*`
/// writes `src/images/a/b.png` as `a/b.png`. A pattern without any
/// metacharacters is treated as a single file and its parent is the base.
pub fn glob_base(pattern: &str) -> PathBuf {
    let pattern = normalize_glob(pattern);
    let components: Vec<&str> = pattern.split('/').collect();
    let literal: Vec<&str> = components
        .iter()
        .take_while(|c| !c.contains(GLOB_META))
        .copied()
        .collect();

    let base = if literal.len() == components.len() {
        &literal[..literal.len().saturating_sub(1)]
    } else {
        &literal[..]
    };

    let joined = base.join("/");
    if joined.is_empty() {
        PathBuf::from(".")
    } else {
        PathBuf::from(joined)
    }
}

/// Render a relative path with forward slashes, the form all globs match against.
pub fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// A compiled `[[watch]]` entry: one glob bound to one task or composition.
///
/// The glob is relative to the project root; the watcher passes relative
/// paths (e.g. `"src/css/site.css"`) into [`WatchBinding::matches`].
#[derive(Clone)]
pub struct WatchBinding {
    glob: String,
    target: TaskName,
    matcher: GlobMatcher,
    use_hash: bool,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("glob", &self.glob)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    pub fn new(glob: impl Into<String>, target: impl Into<TaskName>, use_hash: bool) -> Result<Self> {
        let glob = normalize_glob(&glob.into()).to_string();
        let matcher = compile_glob(&glob)
            .with_context(|| format!("invalid watch glob: {glob}"))?
            .compile_matcher();
        Ok(Self {
            glob,
            target: target.into(),
            matcher,
            use_hash,
        })
    }

    pub fn glob(&self) -> &str {
        &self.glob
    }

    /// Task or composition invoked when this binding fires.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether unchanged file contents should suppress the trigger.
    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }
}

/// Compile every `[[watch]]` entry of a validated config.
pub fn build_bindings_from_config(cfg: &ConfigFile) -> Result<Vec<WatchBinding>> {
    let default_use_hash = cfg.config_section().use_hash;
    cfg.watch_bindings()
        .iter()
        .map(|w| WatchBinding::new(&w.glob, &w.run, w.effective_use_hash(default_use_hash)))
        .collect()
}
