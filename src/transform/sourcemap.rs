// src/transform/sourcemap.rs

//! Externalise inline source maps.
//!
//! Style and script processors (postcss, babel, esbuild) can append their map
//! as a base64 `data:` URL in a trailing `sourceMappingURL` comment. This unit
//! moves that map into a `<output>.map` artifact written next to the output
//! (or under `dir`) and points the comment at it.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::future::BoxFuture;
use regex::Regex;
use tracing::debug;

use super::{Artifact, Asset, Transform};
use crate::errors::{Result, SitepipeError};

static INLINE_MAP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)(/\*|//)[#@][ \t]*sourceMappingURL=data:application/json[^,\s]*;base64,([A-Za-z0-9+/=]+)[ \t]*(?:\*/)?[ \t]*$",
    )
    .expect("valid source map regex")
});

#[derive(Debug, Clone, Default)]
pub struct SourcemapTransform {
    /// Map directory relative to the output file's directory.
    dir: Option<PathBuf>,
}

impl SourcemapTransform {
    pub fn new(dir: Option<&str>) -> Self {
        Self {
            dir: dir
                .map(|d| d.trim_matches('/'))
                .filter(|d| !d.is_empty() && *d != ".")
                .map(PathBuf::from),
        }
    }

    fn run(&self, mut asset: Asset) -> Result<Asset> {
        let text = asset.text(self.name())?;
        let Some(caps) = INLINE_MAP_RE.captures_iter(text).last() else {
            debug!(source = ?asset.source, "no inline source map");
            return Ok(asset);
        };

        let map = STANDARD.decode(&caps[2]).map_err(|e| SitepipeError::Transform {
            unit: self.name().to_string(),
            path: asset.source.clone(),
            message: format!("inline source map is not valid base64: {e}"),
        })?;

        let (reference, map_output) = self.map_location(&asset.output);
        let comment = if &caps[1] == "/*" {
            format!("/*# sourceMappingURL={reference} */")
        } else {
            format!("//# sourceMappingURL={reference}")
        };

        let span = caps.get(0).map(|m| m.range()).unwrap_or_default();
        let mut rewritten = String::with_capacity(text.len());
        rewritten.push_str(&text[..span.start]);
        rewritten.push_str(&comment);
        rewritten.push_str(&text[span.end..]);

        asset.contents = rewritten.into_bytes();
        asset.artifacts.push(Artifact {
            output: map_output,
            contents: map,
        });
        Ok(asset)
    }

    /// URL written into the comment and path of the map under `dest`.
    fn map_location(&self, output: &Path) -> (String, PathBuf) {
        let file_name = output
            .file_name()
            .map(|n| format!("{}.map", n.to_string_lossy()))
            .unwrap_or_else(|| "output.map".to_string());
        let relative = match &self.dir {
            Some(dir) => dir.join(&file_name),
            None => PathBuf::from(&file_name),
        };
        let map_output = match output.parent() {
            Some(parent) => parent.join(&relative),
            None => relative.clone(),
        };
        (relative.to_string_lossy().replace('\\', "/"), map_output)
    }
}

impl Transform for SourcemapTransform {
    fn name(&self) -> &str {
        "sourcemap"
    }

    fn apply<'a>(&'a self, asset: Asset) -> BoxFuture<'a, Result<Asset>> {
        Box::pin(async move { self.run(asset) })
    }
}
