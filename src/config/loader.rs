// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::info;

use crate::config::defaults::builtin_raw_config;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SitepipeError};

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        SitepipeError::ConfigError(format!("cannot read {}: {e}", path.display()))
    })?;
    load_from_str(&contents)
}

pub fn load_from_str(contents: &str) -> Result<RawConfigFile> {
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Synthesises the `build` composition and watch bindings if absent.
/// - Checks for unknown references, reserved names and composition cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    ConfigFile::try_from(raw_config)
}

/// Like [`load_and_validate`], but falls back to the built-in task table when
/// `path` does not exist.
pub fn load_or_builtin(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if path.exists() {
        return load_and_validate(path);
    }
    info!(
        path = %path.display(),
        "config file not found; using built-in task table"
    );
    ConfigFile::try_from(builtin_raw_config()?)
}
