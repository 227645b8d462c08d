// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::CompositionKind;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// out_dir = "dist"
///
/// [server]
/// port = 8888
///
/// [task.css]
/// src = ["src/css/*.css"]
/// dest = "dist/css"
/// pipeline = [{ kind = "purge", content = ["src/*.html"] }]
///
/// [composition.build]
/// kind = "parallel"
/// members = ["css"]
///
/// [[watch]]
/// glob = "src/css/*.css"
/// run = "css"
/// ```
///
/// All sections are optional and have reasonable defaults, but validation
/// requires at least one task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Global behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Dev server settings from `[server]`.
    #[serde(default)]
    pub server: ServerSection,

    /// All tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// Named compositions from `[composition.<name>]`.
    #[serde(default)]
    pub composition: BTreeMap<String, CompositionConfig>,

    /// Watch bindings from `[[watch]]`.
    #[serde(default)]
    pub watch: Vec<WatchConfig>,
}

/// Validated configuration.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)`, so every
/// name referenced by a composition, binding or `default_target` is known,
/// and compositions are stored in dependency order (members first).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    server: ServerSection,
    tasks: BTreeMap<String, TaskConfig>,
    compositions: Vec<(String, CompositionConfig)>,
    watch: Vec<WatchConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        server: ServerSection,
        tasks: BTreeMap<String, TaskConfig>,
        compositions: Vec<(String, CompositionConfig)>,
        watch: Vec<WatchConfig>,
    ) -> Self {
        Self {
            config,
            server,
            tasks,
            compositions,
            watch,
        }
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn server_section(&self) -> &ServerSection {
        &self.server
    }

    pub fn server_section_mut(&mut self) -> &mut ServerSection {
        &mut self.server
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.tasks
    }

    /// Compositions in dependency order: every member appears before the
    /// composition that uses it.
    pub fn compositions(&self) -> &[(String, CompositionConfig)] {
        &self.compositions
    }

    pub fn watch_bindings(&self) -> &[WatchConfig] {
        &self.watch
    }

    /// True if `name` is a task or a composition.
    pub fn is_target(&self, name: &str) -> bool {
        self.tasks.contains_key(name) || self.compositions.iter().any(|(n, _)| n == name)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Output directory, relative to the project root. Wiped by `clean`.
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    /// Coalescing window for filesystem events, per binding.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Default for `[[watch]].use_hash`.
    #[serde(default)]
    pub use_hash: bool,

    /// Composition run by the `build` step of the default lifecycle.
    #[serde(default = "default_target")]
    pub default_target: String,
}

fn default_out_dir() -> String {
    "dist".to_string()
}

fn default_debounce_ms() -> u64 {
    50
}

fn default_target() -> String {
    "build".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            debounce_ms: default_debounce_ms(),
            use_hash: false,
            default_target: default_target(),
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory to serve; defaults to `[config].out_dir`.
    #[serde(default)]
    pub root: Option<String>,

    /// Push reload signals to connected browsers.
    #[serde(default = "default_live_reload")]
    pub live_reload: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8888
}

fn default_live_reload() -> bool {
    true
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            root: None,
            live_reload: default_live_reload(),
        }
    }
}

impl ServerSection {
    /// Effective directory to serve, resolved against the project root.
    pub fn root_dir(&self, project_root: &Path, out_dir: &str) -> PathBuf {
        project_root.join(self.root.as_deref().unwrap_or(out_dir))
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaskConfig {
    /// Input globs, relative to the project root (e.g. `"src/images/**/*"`).
    pub src: Vec<String>,

    /// Destination directory, relative to the project root.
    pub dest: String,

    /// Transform units applied in order. Empty means a plain copy.
    #[serde(default)]
    pub pipeline: Vec<TransformSpec>,
}

/// One transform unit in a task pipeline, tagged by `kind`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransformSpec {
    Copy,
    Command {
        cmd: String,
        #[serde(default)]
        extension: Option<String>,
    },
    Template {
        #[serde(default)]
        vars: toml::Table,
        #[serde(default)]
        extension: Option<String>,
    },
    Purge {
        content: Vec<String>,
    },
    /// Write an inline source map out as `<output>.map`.
    Sourcemap {
        #[serde(default)]
        dir: Option<String>,
    },
}

/// `[composition.<name>]` section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CompositionConfig {
    pub kind: CompositionKind,
    pub members: Vec<String>,
}

/// `[[watch]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WatchConfig {
    pub glob: String,
    /// Task or composition to invoke.
    pub run: String,
    #[serde(default)]
    pub use_hash: Option<bool>,
}

impl WatchConfig {
    /// Effective `use_hash` given the `[config].use_hash` default.
    pub fn effective_use_hash(&self, default_use_hash: bool) -> bool {
        self.use_hash.unwrap_or(default_use_hash)
    }
}
