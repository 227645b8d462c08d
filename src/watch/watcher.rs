// src/watch/watcher.rs

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::EventKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::model::ConfigFile;
use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::watch::debounce::Debouncer;
use crate::watch::hash::ContentHashes;
use crate::watch::path_utils::{is_within, relative_dir, relative_str};
use crate::watch::patterns::{build_bindings_from_config, WatchBinding};

/// Binds globs to targets and turns filesystem events into triggers.
///
/// Each binding is independent: one event may fire several bindings when
/// their globs overlap, and each fires its own target. Events under ignored
/// directories (the output directory) never fire anything, so writing build
/// output cannot retrigger a build.
#[derive(Debug)]
pub struct WatchCoordinator {
    root: PathBuf,
    bindings: Vec<WatchBinding>,
    ignored: Vec<String>,
    debounce: Duration,
}

impl WatchCoordinator {
    pub fn new(root: impl Into<PathBuf>, debounce: Duration) -> Self {
        Self {
            root: root.into(),
            bindings: Vec::new(),
            ignored: Vec::new(),
            debounce,
        }
    }

    /// Coordinator for every `[[watch]]` entry, ignoring `[config].out_dir`.
    pub fn from_config(cfg: &ConfigFile, root: &Path) -> Result<Self> {
        let section = cfg.config_section();
        let mut coordinator = Self::new(root, Duration::from_millis(section.debounce_ms));
        coordinator.ignore_dir(&section.out_dir);
        for binding in build_bindings_from_config(cfg)? {
            coordinator.add_binding(binding);
        }
        Ok(coordinator)
    }

    /// Bind `glob` (relative to the root) to a task or composition.
    pub fn bind(&mut self, glob: &str, target: &str) -> Result<()> {
        self.add_binding(WatchBinding::new(glob, target, false)?);
        Ok(())
    }

    pub fn add_binding(&mut self, binding: WatchBinding) {
        debug!(glob = %binding.glob(), task = %binding.target(), "watch binding added");
        self.bindings.push(binding);
    }

    /// Never react to paths inside `dir`, given relative to the root or as an
    /// absolute path. A directory outside the root cannot produce events and
    /// is dropped.
    pub fn ignore_dir(&mut self, dir: &str) {
        match relative_dir(&self.root, dir) {
            Some(rel) => self.ignored.push(rel),
            None => debug!(dir, "ignored directory is outside the watched root"),
        }
    }

    pub fn bindings(&self) -> &[WatchBinding] {
        &self.bindings
    }

    /// Indices of the bindings matching a root-relative path.
    pub fn matching_bindings(&self, rel: &str) -> Vec<usize> {
        if self.ignored.iter().any(|dir| is_within(rel, dir)) {
            return Vec::new();
        }
        self.bindings
            .iter()
            .enumerate()
            .filter(|(_, b)| b.matches(rel))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Targets fired by a change to a root-relative path, one per matching
    /// binding (duplicates kept).
    pub fn matching_targets(&self, rel: &str) -> Vec<&str> {
        self.matching_bindings(rel)
            .into_iter()
            .map(|idx| self.bindings[idx].target())
            .collect()
    }

    /// Start watching the root recursively, sending
    /// [`RuntimeEvent::Triggered`] into `runtime_tx` for every binding that
    /// fires. Runs until the returned handle is stopped or dropped.
    pub fn start(self, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Result<WatcherHandle> {
        let root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());

        // Channel from the blocking notify callback into the async loop.
        let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event_tx.send(event).is_err() {
                        eprintln!("sitepipe: watcher loop gone; dropping notify event");
                    }
                }
                Err(err) => eprintln!("sitepipe: file watch error: {err}"),
            },
            Config::default(),
        )
        .map_err(anyhow::Error::from)?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(anyhow::Error::from)?;

        info!(?root, bindings = self.bindings.len(), "file watcher started");

        let task = tokio::spawn(self.event_loop(root, event_rx, runtime_tx));

        Ok(WatcherHandle {
            _watcher: watcher,
            task,
        })
    }

    async fn event_loop(
        self,
        root: PathBuf,
        mut event_rx: mpsc::UnboundedReceiver<Event>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) {
        let mut debouncer = Debouncer::new(self.debounce);
        let mut hashes: Vec<ContentHashes> =
            self.bindings.iter().map(|_| ContentHashes::new()).collect();
        // Paths seen during the current window of each `use_hash` binding;
        // hashed when the window closes so half-written files are not compared.
        let mut touched: HashMap<usize, HashSet<PathBuf>> = HashMap::new();

        loop {
            let deadline = debouncer.next_deadline();
            let sleep = tokio::time::sleep_until(
                deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600)),
            );

            tokio::select! {
                maybe_event = event_rx.recv() => {
                    let Some(event) = maybe_event else { break };
                    if matches!(event.kind, EventKind::Access(_)) {
                        continue;
                    }
                    debug!(?event, "received notify event");

                    for path in &event.paths {
                        let Some(rel) = relative_str(&root, path) else { continue };
                        for idx in self.matching_bindings(&rel) {
                            if self.bindings[idx].use_hash() {
                                touched.entry(idx).or_default().insert(path.clone());
                            }
                            debouncer.touch(idx, Instant::now());
                        }
                    }
                }
                _ = sleep, if deadline.is_some() => {
                    for idx in debouncer.due(Instant::now()) {
                        let binding = &self.bindings[idx];
                        if binding.use_hash() {
                            let mut any_changed = false;
                            for path in touched.remove(&idx).unwrap_or_default() {
                                any_changed |= hashes[idx].changed(&path).await;
                            }
                            if !any_changed {
                                continue;
                            }
                        }
                        info!(glob = %binding.glob(), task = %binding.target(), "change detected");
                        let event = RuntimeEvent::Triggered {
                            target: binding.target().to_string(),
                        };
                        if runtime_tx.send(event).await.is_err() {
                            warn!("runtime channel closed; stopping watcher loop");
                            return;
                        }
                    }
                }
            }
        }
        debug!("watcher event loop finished");
    }
}

/// Keeps the notify watcher and its event loop alive.
///
/// Stopping (or dropping) the handle stops watching immediately; invocations
/// already dispatched keep running on their own.
pub struct WatcherHandle {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish_non_exhaustive()
    }
}

impl WatcherHandle {
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
