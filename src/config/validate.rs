// src/config/validate.rs

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{
    CompositionConfig, ConfigFile, RawConfigFile, TransformSpec, WatchConfig,
};
use crate::errors::{Result, SitepipeError};
use crate::types::CompositionKind;
use crate::watch::path_utils::normalize_rel_dir;

/// Entry points handled by the lifecycle itself; tasks cannot shadow them.
pub const RESERVED_NAMES: &[&str] = &["clean", "watch", "serve", "default"];

/// Name of the composition synthesised when the config does not declare one.
pub const BUILD_COMPOSITION: &str = "build";

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SitepipeError;

    fn try_from(mut raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_tasks(&raw)?;
        validate_global_config(&raw)?;
        validate_names(&raw)?;
        validate_tasks(&raw)?;

        synthesise_build_composition(&mut raw);
        validate_composition_members(&raw)?;
        let ordered = order_compositions(&raw.composition)?;

        if raw.watch.is_empty() {
            raw.watch = synthesise_watch_bindings(&raw);
        }
        validate_watch_bindings(&raw)?;
        validate_default_target(&raw)?;

        let mut remaining = raw.composition;
        let compositions = ordered
            .into_iter()
            .filter_map(|name| remaining.remove(&name).map(|c| (name, c)))
            .collect();

        Ok(ConfigFile::new_unchecked(
            raw.config,
            raw.server,
            raw.task,
            compositions,
            raw.watch,
        ))
    }
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(SitepipeError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.out_dir.trim().is_empty() {
        return Err(SitepipeError::ConfigError(
            "[config].out_dir must not be empty".to_string(),
        ));
    }
    let out_dir = &cfg.config.out_dir;
    if !Path::new(out_dir).is_absolute() {
        let normalized = normalize_rel_dir(out_dir);
        // `clean` removes out_dir, so it must name a real subdirectory.
        if normalized.is_empty() || normalized.split('/').any(|seg| seg == "..") {
            return Err(SitepipeError::ConfigError(format!(
                "[config].out_dir '{out_dir}' must be a directory inside the project"
            )));
        }
    }
    Ok(())
}

fn validate_names(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.task.keys().chain(cfg.composition.keys()) {
        if RESERVED_NAMES.contains(&name.as_str()) {
            return Err(SitepipeError::ConfigError(format!(
                "'{name}' is a reserved entry point and cannot name a task or composition"
            )));
        }
    }
    for name in cfg.composition.keys() {
        if cfg.task.contains_key(name) {
            return Err(SitepipeError::ConfigError(format!(
                "'{name}' is declared both as a task and as a composition"
            )));
        }
    }
    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.src.is_empty() {
            return Err(SitepipeError::ConfigError(format!(
                "task '{name}' must list at least one `src` glob"
            )));
        }
        if task.dest.trim().is_empty() {
            return Err(SitepipeError::ConfigError(format!(
                "task '{name}' must have a non-empty `dest`"
            )));
        }
        for pattern in task.src.iter() {
            check_glob(pattern, || format!("task '{name}' src"))?;
        }
        for unit in task.pipeline.iter() {
            match unit {
                TransformSpec::Command { cmd, .. } if cmd.trim().is_empty() => {
                    return Err(SitepipeError::ConfigError(format!(
                        "task '{name}' has a command transform with an empty `cmd`"
                    )));
                }
                TransformSpec::Purge { content } => {
                    for pattern in content {
                        check_glob(pattern, || format!("task '{name}' purge content"))?;
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn check_glob(pattern: &str, owner: impl Fn() -> String) -> Result<()> {
    crate::watch::patterns::compile_glob(pattern).map_err(|err| {
        SitepipeError::ConfigError(format!("{}: invalid glob '{pattern}': {err}", owner()))
    })?;
    Ok(())
}

/// Add a parallel `build` composition over every task, unless one exists.
fn synthesise_build_composition(cfg: &mut RawConfigFile) {
    if cfg.composition.contains_key(BUILD_COMPOSITION) || cfg.task.contains_key(BUILD_COMPOSITION) {
        return;
    }
    cfg.composition.insert(
        BUILD_COMPOSITION.to_string(),
        CompositionConfig {
            kind: CompositionKind::Parallel,
            members: cfg.task.keys().cloned().collect(),
        },
    );
}

fn validate_composition_members(cfg: &RawConfigFile) -> Result<()> {
    for (name, comp) in cfg.composition.iter() {
        for member in comp.members.iter() {
            if member == name {
                return Err(SitepipeError::ConfigError(format!(
                    "composition '{name}' cannot contain itself"
                )));
            }
            if !cfg.task.contains_key(member) && !cfg.composition.contains_key(member) {
                return Err(SitepipeError::ConfigError(format!(
                    "composition '{name}' has unknown member '{member}'"
                )));
            }
        }
    }
    Ok(())
}

/// Sort compositions so that every composition comes after the compositions
/// it contains.
///
/// Edge direction: member -> composition. For
///   [composition.site]
///   members = ["build"]
/// we add edge build -> site.
fn order_compositions(compositions: &BTreeMap<String, CompositionConfig>) -> Result<Vec<String>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in compositions.keys() {
        graph.add_node(name.as_str());
    }

    for (name, comp) in compositions.iter() {
        for member in comp.members.iter() {
            if compositions.contains_key(member) {
                graph.add_edge(member.as_str(), name.as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(SitepipeError::CompositionCycle(format!(
            "cycle detected in compositions involving '{}'",
            cycle.node_id()
        ))),
    }
}

/// One binding per task per `src` glob.
fn synthesise_watch_bindings(cfg: &RawConfigFile) -> Vec<WatchConfig> {
    cfg.task
        .iter()
        .flat_map(|(name, task)| {
            task.src.iter().map(move |glob| WatchConfig {
                glob: glob.clone(),
                run: name.clone(),
                use_hash: None,
            })
        })
        .collect()
}

fn validate_watch_bindings(cfg: &RawConfigFile) -> Result<()> {
    let known: HashSet<&str> = cfg
        .task
        .keys()
        .chain(cfg.composition.keys())
        .map(String::as_str)
        .collect();

    for binding in cfg.watch.iter() {
        if !known.contains(binding.run.as_str()) {
            return Err(SitepipeError::ConfigError(format!(
                "watch binding '{}' runs unknown target '{}'",
                binding.glob, binding.run
            )));
        }
        check_glob(&binding.glob, || format!("watch binding for '{}'", binding.run))?;
    }
    Ok(())
}

fn validate_default_target(cfg: &RawConfigFile) -> Result<()> {
    let target = cfg.config.default_target.as_str();
    if !cfg.task.contains_key(target) && !cfg.composition.contains_key(target) {
        return Err(SitepipeError::ConfigError(format!(
            "[config].default_target '{target}' is not a task or composition"
        )));
    }
    Ok(())
}
