// src/dag/graph.rs

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use tracing::{debug, info, warn};

use crate::config::model::ConfigFile;
use crate::errors::{Result, SitepipeError};
use crate::task::Task;
use crate::types::{CompositionKind, ReloadSender, ReloadSignal, TaskName};

/// Index of a node in the registry.
type NodeId = usize;

#[derive(Debug)]
enum Node {
    Task(Arc<Task>),
    Sequence(Vec<NodeId>),
    Parallel(Vec<NodeId>),
}

/// Closed registry of tasks and compositions.
///
/// Composition members are resolved to node indices when the composition is
/// declared, so an unknown or not-yet-declared member is rejected right
/// there and `invoke` never has to look a member up by name. Since members
/// must exist before their composition, the registry can never contain a
/// cycle.
pub struct TaskGraph {
    nodes: Vec<(TaskName, Node)>,
    index: HashMap<TaskName, NodeId>,
    reload: Option<ReloadSender>,
}

impl fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGraph")
            .field("names", &self.names().collect::<Vec<_>>())
            .field("live_reload", &self.reload.is_some())
            .finish()
    }
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            reload: None,
        }
    }

    /// Tasks that write output will fire a [`ReloadSignal`] into `reload`.
    pub fn with_reload(mut self, reload: ReloadSender) -> Self {
        self.reload = Some(reload);
        self
    }

    /// Build the registry from a validated config: every task, then every
    /// composition in dependency order.
    pub fn from_config(cfg: &ConfigFile, root: &Path) -> Result<Self> {
        let mut graph = Self::new();

        for (name, task_cfg) in cfg.tasks() {
            graph.register(Task::from_config(name, task_cfg, root)?)?;
        }

        for (name, comp) in cfg.compositions() {
            match comp.kind {
                CompositionKind::Sequence => graph.sequence(name, &comp.members)?,
                CompositionKind::Parallel => graph.parallel(name, &comp.members)?,
            };
        }

        debug!(nodes = graph.nodes.len(), "task graph built");
        Ok(graph)
    }

    /// Add a task under its own name.
    pub fn register(&mut self, task: Task) -> Result<TaskName> {
        let name = task.name().to_string();
        self.insert(name, Node::Task(Arc::new(task)))
    }

    /// Declare a composition running `members` one after another.
    pub fn sequence<S: AsRef<str>>(&mut self, name: &str, members: &[S]) -> Result<TaskName> {
        let ids = self.resolve_members(name, members)?;
        self.insert(name.to_string(), Node::Sequence(ids))
    }

    /// Declare a composition running `members` concurrently.
    pub fn parallel<S: AsRef<str>>(&mut self, name: &str, members: &[S]) -> Result<TaskName> {
        let ids = self.resolve_members(name, members)?;
        self.insert(name.to_string(), Node::Parallel(ids))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Every registered name, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|(name, _)| name.as_str())
    }

    /// Run a task or composition to completion.
    pub fn invoke<'a>(&'a self, name: &str) -> BoxFuture<'a, Result<()>> {
        match self.index.get(name) {
            Some(&id) => self.invoke_node(id),
            None => {
                let name = name.to_string();
                Box::pin(async move { Err(SitepipeError::TaskNotFound(name)) })
            }
        }
    }

    fn invoke_node(&self, id: NodeId) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let (name, node) = &self.nodes[id];
            match node {
                Node::Task(task) => {
                    let report = task.run().await?;
                    if report.written > 0 {
                        self.signal_reload(name);
                    }
                    Ok(())
                }
                Node::Sequence(children) => {
                    debug!(composition = %name, "running sequence");
                    for &child in children {
                        self.invoke_node(child).await?;
                    }
                    Ok(())
                }
                Node::Parallel(children) => {
                    debug!(composition = %name, members = children.len(), "running parallel");
                    let results = join_all(children.iter().map(|&c| self.invoke_node(c))).await;
                    let failures: Vec<SitepipeError> = results
                        .into_iter()
                        .filter_map(|r| r.err())
                        .flat_map(SitepipeError::into_failures)
                        .collect();
                    if failures.is_empty() {
                        info!(composition = %name, "all members succeeded");
                        Ok(())
                    } else {
                        warn!(composition = %name, failed = failures.len(), "parallel members failed");
                        Err(SitepipeError::Failures(failures))
                    }
                }
            }
        })
    }

    fn signal_reload(&self, task: &str) {
        if let Some(tx) = &self.reload {
            // No receivers simply means no browser is connected.
            let receivers = tx.send(ReloadSignal).unwrap_or(0);
            debug!(task = %task, receivers, "reload signal sent");
        }
    }

    fn resolve_members<S: AsRef<str>>(&self, name: &str, members: &[S]) -> Result<Vec<NodeId>> {
        members
            .iter()
            .map(|m| {
                let member = m.as_ref();
                self.index.get(member).copied().ok_or_else(|| {
                    SitepipeError::ConfigError(format!(
                        "composition '{name}' has unknown member '{member}'"
                    ))
                })
            })
            .collect()
    }

    fn insert(&mut self, name: TaskName, node: Node) -> Result<TaskName> {
        if self.index.contains_key(&name) {
            return Err(SitepipeError::ConfigError(format!(
                "'{name}' is already registered"
            )));
        }
        self.index.insert(name.clone(), self.nodes.len());
        self.nodes.push((name.clone(), node));
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::reload_channel;

    fn copy_task(root: &Path, name: &str) -> Task {
        Task::new(
            name,
            root,
            &[format!("src/{name}/*")],
            format!("dist/{name}"),
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn unknown_member_is_rejected_at_declaration() {
        let tmp = tempfile::tempdir().unwrap();
        let mut graph = TaskGraph::new();
        graph.register(copy_task(tmp.path(), "a")).unwrap();

        let err = graph.sequence("all", &["a", "missing"]).unwrap_err();
        assert!(matches!(err, SitepipeError::ConfigError(msg) if msg.contains("missing")));
        assert!(!graph.contains("all"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut graph = TaskGraph::new();
        graph.register(copy_task(tmp.path(), "a")).unwrap();
        assert!(graph.register(copy_task(tmp.path(), "a")).is_err());
        assert!(graph.parallel("a", &["a"]).is_err());
    }

    #[tokio::test]
    async fn invoking_unknown_name_fails() {
        let graph = TaskGraph::new();
        let err = graph.invoke("nope").await.unwrap_err();
        assert!(matches!(err, SitepipeError::TaskNotFound(n) if n == "nope"));
    }

    #[tokio::test]
    async fn reload_is_signalled_only_when_output_was_written() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("src/a")).unwrap();
        std::fs::write(root.join("src/a/x.txt"), b"x").unwrap();

        let (tx, mut rx) = reload_channel();
        let mut graph = TaskGraph::new().with_reload(tx);
        graph.register(copy_task(root, "a")).unwrap();
        graph.register(copy_task(root, "empty")).unwrap();

        graph.invoke("empty").await.unwrap();
        assert!(rx.try_recv().is_err());

        graph.invoke("a").await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), ReloadSignal);
        assert!(rx.try_recv().is_err());
    }
}
