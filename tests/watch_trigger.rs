// tests/watch_trigger.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, TaskConfigBuilder};
use crate::common::{init_tracing, with_timeout, write_file, FakeInvoker};

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use sitepipe::config::ConfigFile;
use sitepipe::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use sitepipe::errors::Result;
use sitepipe::watch::{WatchBinding, WatchCoordinator, WatcherHandle};

fn css_and_images(root: &Path) -> ConfigFile {
    write_file(root, "src/css/x.css", "a{}");
    write_file(root, "src/images/logo.png", "png");

    ConfigFileBuilder::new()
        .with_task("css", TaskConfigBuilder::new("src/css/*.css", "dist/css").build())
        .with_task("images", TaskConfigBuilder::new("src/images/**/*", "dist/images").build())
        .with_watch("src/css/*.css", "css")
        .with_watch("src/images/**/*", "images")
        .build()
}

struct Session {
    invoked: Arc<Mutex<Vec<String>>>,
    rt_tx: mpsc::Sender<RuntimeEvent>,
    runtime: JoinHandle<Result<()>>,
    watcher: WatcherHandle,
}

impl Session {
    async fn start(coordinator: WatchCoordinator) -> Self {
        let (rt_tx, rt_rx) = mpsc::channel(16);
        let watcher = coordinator.start(rt_tx.clone()).unwrap();

        let invoked = Arc::new(Mutex::new(Vec::new()));
        let invoker = FakeInvoker::new(rt_tx.clone(), Arc::clone(&invoked));
        let runtime = Runtime::new(CoreRuntime::new(RuntimeOptions::default()), rt_rx, invoker);
        let runtime = tokio::spawn(runtime.run());

        // Give the OS watcher a moment to register.
        tokio::time::sleep(Duration::from_millis(200)).await;

        Self {
            invoked,
            rt_tx,
            runtime,
            watcher,
        }
    }

    async fn wait_for_invocations(&self, n: usize) {
        with_timeout(async {
            while self.invoked.lock().unwrap().len() < n {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
    }

    fn invoked(&self) -> Vec<String> {
        self.invoked.lock().unwrap().clone()
    }

    async fn stop(self) {
        self.watcher.stop();
        self.rt_tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
        with_timeout(self.runtime).await.unwrap().unwrap();
    }
}

#[test]
fn css_change_matches_only_css_binding() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = css_and_images(tmp.path());
    let coordinator = WatchCoordinator::from_config(&cfg, tmp.path()).unwrap();

    assert_eq!(coordinator.matching_targets("src/css/x.css"), vec!["css"]);
    assert_eq!(coordinator.matching_targets("src/images/logo.png"), vec!["images"]);
    assert!(coordinator.matching_targets("dist/css/x.css").is_empty());
    assert!(coordinator.matching_targets("src/css/nested/y.css").is_empty());
}

#[tokio::test]
async fn editing_a_stylesheet_invokes_css_exactly_once() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let cfg = css_and_images(root);

    let session = Session::start(WatchCoordinator::from_config(&cfg, root).unwrap()).await;

    write_file(root, "src/css/x.css", "b{}");
    session.wait_for_invocations(1).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(session.invoked(), vec!["css".to_string()]);
    session.stop().await;
}

#[tokio::test]
async fn bursts_are_debounced_into_one_trigger() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let cfg = css_and_images(root);

    let session = Session::start(WatchCoordinator::from_config(&cfg, root).unwrap()).await;

    for i in 0..5 {
        write_file(root, "src/css/x.css", &format!("a{{ z-index: {i} }}"));
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    session.wait_for_invocations(1).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(session.invoked(), vec!["css".to_string()]);
    session.stop().await;
}

#[tokio::test]
async fn writes_to_output_directory_are_ignored() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();

    let mut coordinator = WatchCoordinator::new(root, Duration::from_millis(20));
    coordinator.ignore_dir("dist");
    coordinator.bind("**/*.css", "css").unwrap();
    let session = Session::start(coordinator).await;

    write_file(root, "dist/css/x.css", "a{}");
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(session.invoked().is_empty());

    write_file(root, "src/css/x.css", "a{}");
    session.wait_for_invocations(1).await;
    session.stop().await;
}

#[tokio::test]
async fn unchanged_contents_do_not_retrigger_hashed_binding() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write_file(root, "src/data/site.json", "{}");

    let mut coordinator = WatchCoordinator::new(root, Duration::from_millis(20));
    coordinator.add_binding(WatchBinding::new("src/data/**/*", "data", true).unwrap());
    let session = Session::start(coordinator).await;

    write_file(root, "src/data/site.json", "{\"a\":1}");
    session.wait_for_invocations(1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    write_file(root, "src/data/site.json", "{\"a\":1}");
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(session.invoked(), vec!["data".to_string()]);
    session.stop().await;
}
