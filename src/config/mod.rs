// src/config/mod.rs

//! Configuration loading and validation for sitepipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Provide the built-in task table (`defaults.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate references, reserved names and composition cycles (`validate.rs`).

pub mod defaults;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_builtin};
pub use model::{
    CompositionConfig, ConfigFile, ConfigSection, RawConfigFile, ServerSection, TaskConfig,
    TransformSpec, WatchConfig,
};
