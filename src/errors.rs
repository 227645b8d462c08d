// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SitepipeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle detected in compositions: {0}")]
    CompositionCycle(String),

    #[error("Task or composition not found: {0}")]
    TaskNotFound(String),

    #[error("Transform '{unit}' failed on {path:?}: {message}")]
    Transform {
        unit: String,
        path: PathBuf,
        message: String,
    },

    #[error("Task '{task}' failed: {source}")]
    Task {
        task: String,
        #[source]
        source: Box<SitepipeError>,
    },

    /// Aggregate of every failed child of a parallel composition.
    #[error("{} task(s) failed: {}", .0.len(), join_failures(.0))]
    Failures(Vec<SitepipeError>),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Could not bind dev server to {addr}: {source}")]
    ServerBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid glob pattern: {0}")]
    GlobError(#[from] globset::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SitepipeError {
    /// Wrap an error with the name of the task whose run it aborted.
    pub fn in_task(task: impl Into<String>, source: SitepipeError) -> Self {
        SitepipeError::Task {
            task: task.into(),
            source: Box::new(source),
        }
    }

    /// Flatten nested parallel aggregates into their leaf failures.
    pub fn into_failures(self) -> Vec<SitepipeError> {
        match self {
            SitepipeError::Failures(inner) => inner
                .into_iter()
                .flat_map(SitepipeError::into_failures)
                .collect(),
            other => vec![other],
        }
    }

    /// Name of the task this error belongs to, if it was raised by a task run.
    pub fn task_name(&self) -> Option<&str> {
        match self {
            SitepipeError::Task { task, .. } => Some(task),
            _ => None,
        }
    }
}

fn join_failures(failures: &[SitepipeError]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SitepipeError>;
