// src/task/mod.rs

//! Tasks: a named unit of work turning matched source files into outputs.
//!
//! A task expands its `src` globs, feeds each file through its transforms in
//! declared order and writes the result under `dest`, preserving the path
//! relative to the glob base. A task matching nothing succeeds and writes
//! nothing.

pub mod inputs;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::model::TaskConfig;
use crate::errors::{Result, SitepipeError};
use crate::transform::{build_pipeline, Asset, Transform};
use crate::types::TaskName;

use inputs::{collect_matching_files, SourcePattern};

/// Summary of one task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskReport {
    /// Files matched by the `src` globs.
    pub matched: usize,
    /// Files written under `dest`.
    pub written: usize,
}

pub struct Task {
    name: TaskName,
    root: PathBuf,
    sources: Vec<SourcePattern>,
    dest: PathBuf,
    transforms: Vec<Arc<dyn Transform>>,
    /// Serialises runs of this task; a re-invocation waits for the active one.
    run_lock: Mutex<()>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("dest", &self.dest)
            .field("transforms", &self.transforms)
            .finish_non_exhaustive()
    }
}

impl Task {
    /// Build a task from raw parts. `src` and `dest` are relative to `root`.
    pub fn new(
        name: impl Into<TaskName>,
        root: impl Into<PathBuf>,
        src: &[String],
        dest: impl AsRef<Path>,
        transforms: Vec<Arc<dyn Transform>>,
    ) -> Result<Self> {
        let root = root.into();
        let sources = src
            .iter()
            .map(|p| SourcePattern::new(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: name.into(),
            dest: root.join(dest),
            root,
            sources,
            transforms,
            run_lock: Mutex::new(()),
        })
    }

    pub fn from_config(name: &str, cfg: &TaskConfig, root: &Path) -> Result<Self> {
        let transforms = build_pipeline(root, &cfg.pipeline)?;
        Self::new(name, root, &cfg.src, &cfg.dest, transforms)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the task once. Errors are wrapped with the task name.
    pub async fn run(&self) -> Result<TaskReport> {
        let _guard = match self.run_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(task = %self.name, "task already running; queued behind active run");
                self.run_lock.lock().await
            }
        };

        self.run_locked()
            .await
            .map_err(|e| SitepipeError::in_task(&self.name, e))
    }

    async fn run_locked(&self) -> Result<TaskReport> {
        let files = collect_matching_files(&self.root, &self.sources).await?;
        let mut report = TaskReport {
            matched: files.len(),
            written: 0,
        };

        if files.is_empty() {
            debug!(task = %self.name, "no source files matched");
            return Ok(report);
        }

        for file in files {
            let contents = tokio::fs::read(&file.path).await?;
            let mut asset = Asset::new(file.path, file.output, contents);
            for transform in &self.transforms {
                asset = transform.apply(asset).await?;
            }
            self.write_output(&asset).await?;
            report.written += 1;
        }

        info!(task = %self.name, written = report.written, "task finished");
        Ok(report)
    }

    async fn write_output(&self, asset: &Asset) -> Result<()> {
        let target = self.dest.join(&asset.output);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &asset.contents).await?;
        debug!(task = %self.name, output = ?target, "wrote output");

        for artifact in &asset.artifacts {
            let path = self.dest.join(&artifact.output);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &artifact.contents).await?;
            debug!(task = %self.name, artifact = ?path, "wrote artifact");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::TransformSpec;

    #[tokio::test]
    async fn copies_matched_files_preserving_relative_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("src/images/icons")).unwrap();
        std::fs::write(root.join("src/images/icons/a.svg"), b"<svg/>").unwrap();

        let cfg = TaskConfig {
            src: vec!["src/images/**/*".to_string()],
            dest: "dist/images".to_string(),
            pipeline: vec![TransformSpec::Copy],
        };
        let task = Task::from_config("images", &cfg, root).unwrap();
        let report = task.run().await.unwrap();

        assert_eq!(report, TaskReport { matched: 1, written: 1 });
        assert_eq!(
            std::fs::read(root.join("dist/images/icons/a.svg")).unwrap(),
            b"<svg/>"
        );
    }

    #[tokio::test]
    async fn artifacts_are_written_beside_the_output() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("src/js")).unwrap();
        std::fs::write(
            root.join("src/js/app.js"),
            "let a;\n//# sourceMappingURL=data:application/json;base64,e30=\n",
        )
        .unwrap();

        let cfg = TaskConfig {
            src: vec!["src/js/*.js".to_string()],
            dest: "dist/js".to_string(),
            pipeline: vec![TransformSpec::Sourcemap { dir: None }],
        };
        let task = Task::from_config("js", &cfg, root).unwrap();
        let report = task.run().await.unwrap();

        assert_eq!(report, TaskReport { matched: 1, written: 1 });
        assert_eq!(
            std::fs::read_to_string(root.join("dist/js/app.js")).unwrap(),
            "let a;\n//# sourceMappingURL=app.js.map\n"
        );
        assert_eq!(std::fs::read_to_string(root.join("dist/js/app.js.map")).unwrap(), "{}");
    }

    #[tokio::test]
    async fn no_matches_is_success_without_output() {
        let tmp = tempfile::tempdir().unwrap();
        let task = Task::new("fonts", tmp.path(), &["src/fonts/**/*".to_string()], "dist/fonts", vec![])
            .unwrap();

        let report = task.run().await.unwrap();

        assert_eq!(report, TaskReport::default());
        assert!(!tmp.path().join("dist").exists());
    }
}
