// src/engine/mod.rs

//! Trigger engine between the watcher and the task graph.
//!
//! Watch bindings send [`RuntimeEvent`]s into one channel; the initial build
//! runs before the runtime starts and does not go through it. The pure state machine in [`core`]
//! decides what to dispatch; the async shell in [`runtime`] hands each
//! dispatch to an [`Invoker`], which runs it in the background and reports
//! completion back as another event.
//!
//! A target triggered while its invocation is still in flight is not run
//! concurrently: one follow-up run is queued and started as soon as the
//! current one completes, however many triggers arrived meanwhile.

use crate::types::TaskName;

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Exit once nothing is in flight and nothing is queued.
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from watchers, invokers and signals.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A watch binding matched; the task or composition should be invoked.
    Triggered { target: TaskName },
    /// An invocation finished.
    Completed { target: TaskName, success: bool },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod invoker;
pub mod queue;
pub mod runtime;

pub use self::core::{CoreCommand, CoreRuntime, CoreStep};
pub use invoker::{GraphInvoker, Invoker};
pub use queue::TriggerQueue;
pub use runtime::Runtime;
