// src/lifecycle.rs

//! Top-level entry points: clean, build, watch, serve and the default
//! lifecycle that strings them together.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use crate::config::model::ConfigFile;
use crate::config::validate::BUILD_COMPOSITION;
use crate::dag::TaskGraph;
use crate::engine::{CoreRuntime, GraphInvoker, Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::{Result, SitepipeError};
use crate::server::{DevServer, DevServerConfig};
use crate::types::{reload_channel, ReloadSender};
use crate::watch::{WatchCoordinator, WatcherHandle};

/// Capacity of the runtime event channel.
pub const RUNTIME_CHANNEL_CAPACITY: usize = 64;

/// Remove `out_dir` and everything in it. A missing directory is fine.
pub async fn clean(out_dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(out_dir).await {
        Ok(()) => {
            info!(dir = %out_dir.display(), "cleaned output directory");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// A loaded project: validated config, its root and the task graph built
/// from it, wired to one reload channel.
#[derive(Debug)]
pub struct Lifecycle {
    root: PathBuf,
    config: ConfigFile,
    graph: Arc<TaskGraph>,
    reload: ReloadSender,
}

impl Lifecycle {
    pub fn new(config: ConfigFile, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let (reload, _) = reload_channel();
        let graph = TaskGraph::from_config(&config, &root)?.with_reload(reload.clone());
        Ok(Self {
            root,
            config,
            graph: Arc::new(graph),
            reload,
        })
    }

    pub fn graph(&self) -> &Arc<TaskGraph> {
        &self.graph
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root.join(&self.config.config_section().out_dir)
    }

    pub async fn clean(&self) -> Result<()> {
        clean(&self.out_dir()).await
    }

    /// Run a task or composition once.
    pub async fn invoke(&self, target: &str) -> Result<()> {
        info!(task = %target, "invoking");
        self.graph.invoke(target).await
    }

    /// Clean, then run the `build` composition.
    pub async fn build(&self) -> Result<()> {
        self.clean().await?;
        self.invoke(BUILD_COMPOSITION).await
    }

    /// Clean, build every task, then watch and serve until `shutdown`.
    ///
    /// The server is bound first so a taken port fails before any work.
    /// Watching starts only once the initial build has finished; a failed
    /// build is reported and the session continues so the next edit can fix
    /// it.
    pub async fn run_default<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let server =
            DevServer::bind(DevServerConfig::from_config(&self.config, &self.root), self.reload.clone())
                .await?;

        self.clean().await?;
        let target = &self.config.config_section().default_target;
        if let Err(e) = self.invoke(target).await {
            report_failure(target, e);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let server_task = tokio::spawn(server.serve(stopped(stop_rx)));

        let result = self.watch_until(shutdown, Some(stop_tx)).await;

        match server_task.await {
            Ok(served) => served?,
            Err(e) => return Err(anyhow::Error::from(e).into()),
        }
        result
    }

    /// Watch and rebuild until `shutdown`, without serving.
    pub async fn watch<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.watch_until(shutdown, None).await
    }

    /// Serve the output directory until `shutdown`, without building.
    pub async fn serve<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let server =
            DevServer::bind(DevServerConfig::from_config(&self.config, &self.root), self.reload.clone())
                .await?;
        server.serve(shutdown).await
    }

    /// Start the watcher and runtime and block until `shutdown`.
    /// `stop` is flipped on shutdown so a companion server stops as well.
    async fn watch_until<F>(&self, shutdown: F, stop: Option<watch::Sender<bool>>) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(RUNTIME_CHANNEL_CAPACITY);
        let watcher = self.start_watcher(rt_tx.clone())?;

        {
            let tx = rt_tx.clone();
            tokio::spawn(async move {
                shutdown.await;
                info!("shutdown requested");
                if let Some(stop) = stop {
                    let _ = stop.send(true);
                }
                let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
            });
        }

        let invoker = GraphInvoker::new(Arc::clone(&self.graph), rt_tx);
        let runtime = Runtime::new(CoreRuntime::new(RuntimeOptions::default()), rt_rx, invoker);
        let result = runtime.run().await;

        watcher.stop();
        result
    }

    fn start_watcher(&self, rt_tx: mpsc::Sender<RuntimeEvent>) -> Result<WatcherHandle> {
        WatchCoordinator::from_config(&self.config, &self.root)?.start(rt_tx)
    }
}

fn report_failure(target: &str, err: SitepipeError) {
    for failure in err.into_failures() {
        error!(task = %target, error = %failure, "build failed");
    }
}

async fn stopped(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
