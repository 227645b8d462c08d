// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling `[[watch]]` globs into bindings.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Coalescing bursts of events per binding.
//! - Optionally suppressing triggers when file contents did not change.
//!
//! It does not run tasks; it only turns filesystem changes into
//! [`RuntimeEvent::Triggered`](crate::engine::RuntimeEvent) events.

pub mod debounce;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use patterns::{build_bindings_from_config, WatchBinding};
pub use watcher::{WatchCoordinator, WatcherHandle};
