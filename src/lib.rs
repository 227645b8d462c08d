// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod lifecycle;
pub mod logging;
pub mod server;
pub mod task;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::loader::load_or_builtin;
use crate::config::model::{ConfigFile, TransformSpec};
use crate::lifecycle::{ctrl_c, Lifecycle};

/// High-level entry point used by `main.rs`.
///
/// Loads the config (or the built-in task table), builds the task graph and
/// dispatches the requested target:
/// - `default`: clean, build, then watch and serve until Ctrl-C
/// - `clean`, `build`, `watch`, `serve`
/// - any task or composition name: one-shot invocation
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_or_builtin(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    if let Some(port) = args.port {
        cfg.server_section_mut().port = port;
    }

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let root = config_root_dir(&config_path);
    let lifecycle = Lifecycle::new(cfg, root)?;

    match args.target.as_str() {
        "default" => lifecycle.run_default(ctrl_c()).await?,
        "clean" => lifecycle.clean().await?,
        "build" => lifecycle.build().await?,
        "watch" => lifecycle.watch(ctrl_c()).await?,
        "serve" => lifecycle.serve(ctrl_c()).await?,
        other => lifecycle.invoke(other).await?,
    }
    Ok(())
}

/// Project root: the directory holding the config file.
///
/// A bare filename like `Sitepipe.toml` (empty parent) means the current
/// working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Print tasks, compositions, bindings and server settings.
fn print_dry_run(cfg: &ConfigFile) {
    let section = cfg.config_section();
    println!("sitepipe dry-run");
    println!("  config.out_dir = {}", section.out_dir);
    println!("  config.debounce_ms = {}", section.debounce_ms);
    println!("  config.default_target = {}", section.default_target);
    println!();

    println!("tasks ({}):", cfg.tasks().len());
    for (name, task) in cfg.tasks() {
        println!("  - {name}");
        println!("      src: {:?}", task.src);
        println!("      dest: {}", task.dest);
        for step in &task.pipeline {
            println!("      | {}", describe_step(step));
        }
    }

    println!("compositions ({}):", cfg.compositions().len());
    for (name, comp) in cfg.compositions() {
        println!("  - {name} ({:?}): {:?}", comp.kind, comp.members);
    }

    println!("watch ({}):", cfg.watch_bindings().len());
    for w in cfg.watch_bindings() {
        let hash = w.effective_use_hash(section.use_hash);
        println!("  - {} -> {}{}", w.glob, w.run, if hash { " (use_hash)" } else { "" });
    }

    let server = cfg.server_section();
    println!(
        "server: http://{}:{} (live_reload = {})",
        server.host, server.port, server.live_reload
    );

    debug!("dry-run complete (no execution)");
}

fn describe_step(step: &TransformSpec) -> String {
    match step {
        TransformSpec::Copy => "copy".to_string(),
        TransformSpec::Command { cmd, extension } => match extension {
            Some(ext) => format!("command `{cmd}` -> .{ext}"),
            None => format!("command `{cmd}`"),
        },
        TransformSpec::Template { extension, .. } => match extension {
            Some(ext) => format!("template -> .{ext}"),
            None => "template".to_string(),
        },
        TransformSpec::Purge { content } => format!("purge (content: {content:?})"),
        TransformSpec::Sourcemap { dir } => match dir {
            Some(dir) => format!("sourcemap -> {dir}/"),
            None => "sourcemap".to_string(),
        },
    }
}
