#![allow(dead_code)]

use sitepipe::config::{
    CompositionConfig, ConfigFile, RawConfigFile, TaskConfig, TransformSpec, WatchConfig,
};
use sitepipe::errors::Result;
use sitepipe::types::CompositionKind;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_sequence(self, name: &str, members: &[&str]) -> Self {
        self.with_composition(name, CompositionKind::Sequence, members)
    }

    pub fn with_parallel(self, name: &str, members: &[&str]) -> Self {
        self.with_composition(name, CompositionKind::Parallel, members)
    }

    fn with_composition(mut self, name: &str, kind: CompositionKind, members: &[&str]) -> Self {
        self.config.composition.insert(
            name.to_string(),
            CompositionConfig {
                kind,
                members: members.iter().map(|m| m.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_watch(mut self, glob: &str, run: &str) -> Self {
        self.config.watch.push(WatchConfig {
            glob: glob.to_string(),
            run: run.to_string(),
            use_hash: None,
        });
        self
    }

    pub fn out_dir(mut self, dir: &str) -> Self {
        self.config.config.out_dir = dir.to_string();
        self
    }

    pub fn default_target(mut self, name: &str) -> Self {
        self.config.config.default_target = name.to_string();
        self
    }

    /// Port 0 lets the OS pick a free port.
    pub fn server_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn live_reload(mut self, on: bool) -> Self {
        self.config.server.live_reload = on;
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(src: &str, dest: &str) -> Self {
        Self {
            task: TaskConfig {
                src: vec![src.to_string()],
                dest: dest.to_string(),
                pipeline: vec![],
            },
        }
    }

    pub fn src(mut self, pattern: &str) -> Self {
        self.task.src.push(pattern.to_string());
        self
    }

    pub fn step(mut self, step: TransformSpec) -> Self {
        self.task.pipeline.push(step);
        self
    }

    pub fn command(self, cmd: &str) -> Self {
        self.step(TransformSpec::Command {
            cmd: cmd.to_string(),
            extension: None,
        })
    }

    pub fn purge(self, content: &str) -> Self {
        self.step(TransformSpec::Purge {
            content: vec![content.to_string()],
        })
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
