// src/transform/purge.rs

//! Unused-selector elimination.
//!
//! Content files (usually the HTML pages) are scanned for word-like tokens.
//! A top-level CSS rule is dropped when every one of its selectors names a
//! class or id that never occurs among those tokens. Selectors without any
//! class or id (element selectors, `*`, `:root`) always survive, and at-rule
//! blocks are copied verbatim. Names inside `:not(...)` are negations and do not
//! count towards a selector's requirements.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::LazyLock;

use futures::future::BoxFuture;
use regex::Regex;
use tracing::debug;

use super::{Asset, Transform};
use crate::errors::Result;
use crate::task::inputs::{collect_matching_files, SourcePattern};

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_-]+").expect("valid token regex"));

static SELECTOR_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[.#](-?[A-Za-z_][A-Za-z0-9_-]*)").expect("valid selector regex")
});

static ATTRIBUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid attribute regex"));

static NOT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i):not\((?:[^()]|\([^()]*\))*\)").expect("valid :not regex")
});

#[derive(Debug, Clone)]
pub struct PurgeTransform {
    root: PathBuf,
    content: Vec<SourcePattern>,
}

impl PurgeTransform {
    pub fn new(root: PathBuf, content: &[String]) -> Result<Self> {
        let content = content
            .iter()
            .map(|p| SourcePattern::new(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { root, content })
    }

    /// Tokens of every content file, read fresh on each run so edits to the
    /// pages are picked up by the next rebuild.
    async fn used_tokens(&self) -> Result<HashSet<String>> {
        let mut used = HashSet::new();
        for file in collect_matching_files(&self.root, &self.content).await? {
            let bytes = tokio::fs::read(&file.path).await?;
            let text = String::from_utf8_lossy(&bytes);
            used.extend(TOKEN_RE.find_iter(&text).map(|m| m.as_str().to_string()));
        }
        Ok(used)
    }

    async fn run(&self, mut asset: Asset) -> Result<Asset> {
        let used = self.used_tokens().await?;
        let css = asset.text(self.name())?;
        let purged = purge_css(css, &used);
        debug!(
            source = ?asset.source,
            before = asset.contents.len(),
            after = purged.len(),
            "purged unused selectors"
        );
        asset.contents = purged.into_bytes();
        Ok(asset)
    }
}

impl Transform for PurgeTransform {
    fn name(&self) -> &str {
        "purge"
    }

    fn apply<'a>(&'a self, asset: Asset) -> BoxFuture<'a, Result<Asset>> {
        Box::pin(self.run(asset))
    }
}

/// Whether a single selector can match something in the scanned content.
fn selector_is_used(selector: &str, used: &HashSet<String>) -> bool {
    let without_attrs = ATTRIBUTE_RE.replace_all(selector, "");
    let positive = NOT_RE.replace_all(&without_attrs, "");
    SELECTOR_NAME_RE
        .captures_iter(&positive)
        .all(|c| used.contains(&c[1]))
}

fn rule_is_used(prelude: &str, used: &HashSet<String>) -> bool {
    let prelude = prelude.trim();
    if prelude.starts_with('@') {
        return true;
    }
    split_selectors(prelude)
        .into_iter()
        .any(|selector| selector_is_used(selector, used))
}

/// Split a selector list on commas outside parentheses.
fn split_selectors(prelude: &str) -> Vec<&str> {
    let mut selectors = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in prelude.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                selectors.push(&prelude[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    selectors.push(&prelude[start..]);
    selectors
}

/// Remove unused top-level rules from `css`, keeping everything else
/// (comments, whitespace, at-rules) byte for byte.
pub fn purge_css(css: &str, used: &HashSet<String>) -> String {
    let bytes = css.as_bytes();
    let mut out = String::with_capacity(css.len());
    let mut pos = 0;

    while pos < bytes.len() {
        // Prelude: everything up to the next top-level `{` or `;`.
        let Some(delim) = scan_until(bytes, pos, |b| b == b'{' || b == b';') else {
            out.push_str(&css[pos..]);
            break;
        };

        if bytes[delim] == b';' {
            out.push_str(&css[pos..=delim]);
            pos = delim + 1;
            continue;
        }

        let end = match block_end(bytes, delim) {
            Some(end) => end,
            None => {
                out.push_str(&css[pos..]);
                break;
            }
        };

        let (leading, prelude) = split_leading_trivia(&css[pos..delim]);
        out.push_str(leading);
        if rule_is_used(prelude, used) {
            out.push_str(prelude);
            out.push_str(&css[delim..=end]);
        }
        pos = end + 1;
    }

    out
}

/// Separate whitespace and comments in front of a rule from its selector text,
/// so dropping a rule does not swallow a preceding comment.
fn split_leading_trivia(segment: &str) -> (&str, &str) {
    let bytes = segment.as_bytes();
    let mut i = 0;
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes[i..].starts_with(b"/*") {
            match segment[i + 2..].find("*/") {
                Some(close) => i += 2 + close + 2,
                None => return (segment, ""),
            }
        } else {
            break;
        }
    }
    segment.split_at(i)
}

/// Index of the first byte at or after `from` satisfying `pred`, skipping
/// comments and quoted strings.
fn scan_until(bytes: &[u8], from: usize, pred: impl Fn(u8) -> bool) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_comment(bytes, i)?,
            q @ (b'"' | b'\'') => i = skip_string(bytes, i, q)?,
            b if pred(b) => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Index of the `}` closing the block opened at `open`.
fn block_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_comment(bytes, i)?,
            q @ (b'"' | b'\'') => i = skip_string(bytes, i, q)?,
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

fn skip_comment(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return Some(i + 2);
        }
        i += 1;
    }
    None
}

fn skip_string(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}
