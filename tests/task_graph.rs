// tests/task_graph.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, TaskConfigBuilder};
use crate::common::{init_tracing, read_file, with_timeout, write_file};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use sitepipe::config::defaults::builtin_raw_config;
use sitepipe::config::ConfigFile;
use sitepipe::dag::TaskGraph;
use sitepipe::errors::{Result, SitepipeError};
use sitepipe::lifecycle::Lifecycle;
use sitepipe::task::Task;
use sitepipe::transform::{Asset, Transform};
use sitepipe::types::reload_channel;

/// Records the name of the task it runs in, optionally lingering so runs
/// overlap if nothing prevents it.
#[derive(Debug)]
struct Recorder {
    task: String,
    log: Arc<Mutex<Vec<String>>>,
    linger: Duration,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl Recorder {
    fn new(task: &str, log: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            task: task.to_string(),
            log: Arc::clone(log),
            linger: Duration::ZERO,
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Transform for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn apply<'a>(&'a self, asset: Asset) -> BoxFuture<'a, Result<Asset>> {
        Box::pin(async move {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.log.lock().unwrap().push(self.task.clone());
            if !self.linger.is_zero() {
                tokio::time::sleep(self.linger).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(asset)
        })
    }
}

#[derive(Debug)]
struct Failing;

impl Transform for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn apply<'a>(&'a self, asset: Asset) -> BoxFuture<'a, Result<Asset>> {
        Box::pin(async move {
            Err(SitepipeError::Transform {
                unit: "failing".to_string(),
                path: asset.source,
                message: "boom".to_string(),
            })
        })
    }
}

/// Appends the contents of an earlier task's output; fails if it is missing.
#[derive(Debug)]
struct AppendsOutputOf {
    path: PathBuf,
}

impl Transform for AppendsOutputOf {
    fn name(&self) -> &str {
        "appends-output"
    }

    fn apply<'a>(&'a self, mut asset: Asset) -> BoxFuture<'a, Result<Asset>> {
        Box::pin(async move {
            match tokio::fs::read(&self.path).await {
                Ok(prior) => {
                    asset.contents.push(b'+');
                    asset.contents.extend(prior);
                    Ok(asset)
                }
                Err(e) => Err(SitepipeError::Transform {
                    unit: "appends-output".to_string(),
                    path: asset.source,
                    message: format!("{} not built yet: {e}", self.path.display()),
                }),
            }
        })
    }
}

/// A task copying `src/<name>/*` to `dist/<name>` through `transforms`.
fn task(root: &Path, name: &str, transforms: Vec<Arc<dyn Transform>>) -> Task {
    write_file(root, &format!("src/{name}/{name}.txt"), name);
    Task::new(
        name,
        root,
        &[format!("src/{name}/*")],
        format!("dist/{name}"),
        transforms,
    )
    .unwrap()
}

fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut out = BTreeMap::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(d) = stack.pop() {
        for entry in std::fs::read_dir(&d).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.insert(
                    path.strip_prefix(dir).unwrap().to_path_buf(),
                    std::fs::read(&path).unwrap(),
                );
            }
        }
    }
    out
}

#[tokio::test]
async fn sequence_runs_in_order_and_stops_at_first_failure() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut graph = TaskGraph::new();
    graph.register(task(root, "a", vec![Arc::new(Recorder::new("a", &log))])).unwrap();
    let b_transforms: Vec<Arc<dyn Transform>> = vec![
        Arc::new(AppendsOutputOf {
            path: root.join("dist/a/a.txt"),
        }),
        Arc::new(Recorder::new("b", &log)),
    ];
    graph.register(task(root, "b", b_transforms)).unwrap();
    graph.register(task(root, "bad", vec![Arc::new(Failing)])).unwrap();
    graph.sequence("ok", &["a", "b"]).unwrap();
    graph.sequence("broken", &["bad", "b"]).unwrap();

    with_timeout(graph.invoke("ok")).await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    assert_eq!(read_file(root, "dist/a/a.txt"), "a");
    // b saw a's finished output.
    assert_eq!(read_file(root, "dist/b/b.txt"), "b+a");

    log.lock().unwrap().clear();
    let err = with_timeout(graph.invoke("broken")).await.unwrap_err();
    assert_eq!(err.task_name(), Some("bad"));
    assert!(log.lock().unwrap().is_empty(), "b must not run after bad fails");
}

#[tokio::test]
async fn parallel_reports_failures_and_keeps_sibling_output() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();

    let mut graph = TaskGraph::new();
    graph.register(task(root, "bad", vec![Arc::new(Failing)])).unwrap();
    graph.register(task(root, "b", vec![])).unwrap();
    graph.parallel("both", &["bad", "b"]).unwrap();

    let err = with_timeout(graph.invoke("both")).await.unwrap_err();
    match err {
        SitepipeError::Failures(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].task_name(), Some("bad"));
        }
        other => panic!("expected Failures, got {other:?}"),
    }
    assert_eq!(read_file(root, "dist/b/b.txt"), "b");
    assert!(!root.join("dist/bad").exists());
}

#[tokio::test]
async fn nested_parallel_failures_are_flattened() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();

    let mut graph = TaskGraph::new();
    graph.register(task(root, "x", vec![Arc::new(Failing)])).unwrap();
    graph.register(task(root, "y", vec![Arc::new(Failing)])).unwrap();
    graph.parallel("inner", &["x"]).unwrap();
    graph.parallel("outer", &["inner", "y"]).unwrap();

    match graph.invoke("outer").await.unwrap_err() {
        SitepipeError::Failures(failures) => assert_eq!(failures.len(), 2),
        other => panic!("expected Failures, got {other:?}"),
    }
}

#[tokio::test]
async fn zero_match_task_succeeds_without_reload_or_side_effects() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write_file(root, "dist/keep.txt", "untouched");

    let (tx, mut rx) = reload_channel();
    let mut graph = TaskGraph::new().with_reload(tx);
    graph
        .register(Task::new("fonts", root, &["src/fonts/**/*".to_string()], "dist/fonts", vec![]).unwrap())
        .unwrap();

    graph.invoke("fonts").await.unwrap();

    assert!(rx.try_recv().is_err());
    assert_eq!(read_file(root, "dist/keep.txt"), "untouched");
    assert!(!root.join("dist/fonts").exists());
}

#[tokio::test]
async fn reinvoking_a_running_task_waits_for_it() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut recorder = Recorder::new("slow", &log);
    recorder.linger = Duration::from_millis(100);
    let max_active = Arc::clone(&recorder.max_active);

    let mut graph = TaskGraph::new();
    graph.register(task(root, "slow", vec![Arc::new(recorder)])).unwrap();

    let (first, second) = with_timeout(async {
        tokio::join!(graph.invoke("slow"), graph.invoke("slow"))
    })
    .await;
    first.unwrap();
    second.unwrap();

    assert_eq!(log.lock().unwrap().len(), 2);
    assert_eq!(max_active.load(Ordering::SeqCst), 1);
}

fn copy_project(root: &Path) -> ConfigFile {
    write_file(root, "src/index.html", "<h1>Hi</h1>");
    write_file(root, "src/images/icons/logo.svg", "<svg/>");
    write_file(root, "src/data/site.json", "{}");

    ConfigFileBuilder::new()
        .with_task("html", TaskConfigBuilder::new("src/*.html", "dist").build())
        .with_task("images", TaskConfigBuilder::new("src/images/**/*", "dist/images").build())
        .with_task("data", TaskConfigBuilder::new("src/data/**/*", "dist/data").build())
        .build()
}

#[tokio::test]
async fn repeated_builds_produce_identical_trees() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let lifecycle = Lifecycle::new(copy_project(root), root).unwrap();

    lifecycle.invoke("build").await.unwrap();
    let first = snapshot(&root.join("dist"));
    lifecycle.invoke("build").await.unwrap();
    let second = snapshot(&root.join("dist"));

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[tokio::test]
async fn clean_then_build() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let lifecycle = Lifecycle::new(copy_project(root), root).unwrap();
    write_file(root, "dist/stale.txt", "old");

    lifecycle.clean().await.unwrap();
    assert!(!root.join("dist").exists());

    lifecycle.build().await.unwrap();
    assert_eq!(read_file(root, "dist/images/icons/logo.svg"), "<svg/>");
    assert_eq!(read_file(root, "dist/data/site.json"), "{}");
    assert!(!root.join("dist/stale.txt").exists());
}

#[tokio::test]
async fn builtin_table_copies_html_page() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write_file(root, "src/index.html", "<h1>Hi</h1>");

    let cfg = ConfigFile::try_from(builtin_raw_config().unwrap()).unwrap();
    let lifecycle = Lifecycle::new(cfg, root).unwrap();
    with_timeout(lifecycle.build()).await.unwrap();

    assert_eq!(read_file(root, "dist/index.html"), "<h1>Hi</h1>");
}
