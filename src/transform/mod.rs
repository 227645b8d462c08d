// src/transform/mod.rs

//! Transform units: the steps a task applies to each matched file.
//!
//! A task feeds every input [`Asset`] through its transforms in declared
//! order, the output of one being the input of the next.
//!
//! - [`copy`] passes the asset through untouched.
//! - [`command`] pipes the asset through an external processor (template
//!   renderer, style processor, script compiler) over stdin/stdout.
//! - [`template`] renders the asset as a Tera template.
//! - [`purge`] drops CSS rules whose selectors never occur in content files.
//! - [`sourcemap`] moves an inline source map into a `.map` artifact.
//!
//! Anything implementing [`Transform`] can be plugged into a task directly,
//! which is how tests inject failing or recording units.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::config::model::TransformSpec;
use crate::errors::{Result, SitepipeError};

pub mod command;
pub mod copy;
pub mod purge;
pub mod sourcemap;
pub mod template;

pub use command::CommandTransform;
pub use copy::CopyTransform;
pub use purge::PurgeTransform;
pub use sourcemap::SourcemapTransform;
pub use template::TemplateTransform;

/// A file in flight through a task pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Absolute path of the source file.
    pub source: PathBuf,
    /// Destination path, relative to the task's `dest`.
    pub output: PathBuf,
    pub contents: Vec<u8>,
    /// Extra files produced alongside the output, such as source maps.
    pub artifacts: Vec<Artifact>,
}

/// An auxiliary build output attached to an [`Asset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Destination path, relative to the task's `dest`.
    pub output: PathBuf,
    pub contents: Vec<u8>,
}

impl Asset {
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            contents,
            artifacts: Vec::new(),
        }
    }

    /// Contents as UTF-8, or a transform error naming `unit`.
    pub fn text(&self, unit: &str) -> Result<&str> {
        std::str::from_utf8(&self.contents).map_err(|e| SitepipeError::Transform {
            unit: unit.to_string(),
            path: self.source.clone(),
            message: format!("input is not valid UTF-8: {e}"),
        })
    }

    /// Rewrite the output extension, if one is given.
    pub fn with_extension(mut self, extension: Option<&str>) -> Self {
        if let Some(ext) = extension {
            self.output.set_extension(ext.trim_start_matches('.'));
        }
        self
    }
}

/// A single input → output conversion step.
pub trait Transform: Send + Sync + fmt::Debug {
    /// Short name used in logs and errors (`"copy"`, `"command"`, ...).
    fn name(&self) -> &str;

    fn apply<'a>(&'a self, asset: Asset) -> BoxFuture<'a, Result<Asset>>;
}

/// Build the transform units declared by a task's `pipeline`.
///
/// `root` is the project root: commands run there and purge content globs are
/// resolved against it.
pub fn build_pipeline(root: &Path, specs: &[TransformSpec]) -> Result<Vec<Arc<dyn Transform>>> {
    specs
        .iter()
        .map(|spec| -> Result<Arc<dyn Transform>> {
            Ok(match spec {
                TransformSpec::Copy => Arc::new(CopyTransform),
                TransformSpec::Command { cmd, extension } => Arc::new(CommandTransform::new(
                    cmd.clone(),
                    extension.clone(),
                    root.to_path_buf(),
                )),
                TransformSpec::Template { vars, extension } => {
                    Arc::new(TemplateTransform::new(vars, extension.clone())?)
                }
                TransformSpec::Purge { content } => {
                    Arc::new(PurgeTransform::new(root.to_path_buf(), content)?)
                }
                TransformSpec::Sourcemap { dir } => Arc::new(SourcemapTransform::new(dir.as_deref())),
            })
        })
        .collect()
}
