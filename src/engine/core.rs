// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! Consumes [`RuntimeEvent`]s and returns the commands the IO shell should
//! carry out. No channels, no Tokio, no IO, so every scheduling rule can be
//! unit tested synchronously.

use std::collections::HashSet;

use tracing::debug;

use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::types::TaskName;

/// Command produced by the core, executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Start an invocation of this target.
    Dispatch(TaskName),
    /// Stop the runtime loop.
    RequestExit,
}

/// Result of handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct CoreRuntime {
    in_flight: HashSet<TaskName>,
    queue: TriggerQueue,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(options: RuntimeOptions) -> Self {
        Self {
            in_flight: HashSet::new(),
            queue: TriggerQueue::new(),
            options,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::Triggered { target } => {
                if self.in_flight.contains(&target) {
                    debug!(task = %target, "target in flight; coalescing trigger");
                    self.queue.record_trigger(&target);
                    CoreStep::running(Vec::new())
                } else {
                    self.in_flight.insert(target.clone());
                    CoreStep::running(vec![CoreCommand::Dispatch(target)])
                }
            }
            RuntimeEvent::Completed { target, success } => {
                debug!(task = %target, success, "invocation completed");
                self.in_flight.remove(&target);

                let mut commands = Vec::new();
                if self.queue.take(&target) {
                    self.in_flight.insert(target.clone());
                    commands.push(CoreCommand::Dispatch(target));
                }

                if self.options.exit_when_idle && self.is_idle() && self.queue.is_empty() {
                    commands.push(CoreCommand::RequestExit);
                    return CoreStep {
                        commands,
                        keep_running: false,
                    };
                }
                CoreStep::running(commands)
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(target: &str) -> RuntimeEvent {
        RuntimeEvent::Triggered {
            target: target.to_string(),
        }
    }

    fn completed(target: &str) -> RuntimeEvent {
        RuntimeEvent::Completed {
            target: target.to_string(),
            success: true,
        }
    }

    #[test]
    fn triggers_while_in_flight_yield_one_follow_up() {
        let mut core = CoreRuntime::new(RuntimeOptions::default());

        let step = core.step(trigger("css"));
        assert_eq!(step.commands, vec![CoreCommand::Dispatch("css".into())]);

        assert!(core.step(trigger("css")).commands.is_empty());
        assert!(core.step(trigger("css")).commands.is_empty());

        let step = core.step(completed("css"));
        assert_eq!(step.commands, vec![CoreCommand::Dispatch("css".into())]);

        let step = core.step(completed("css"));
        assert!(step.commands.is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn different_targets_run_side_by_side() {
        let mut core = CoreRuntime::new(RuntimeOptions::default());
        assert_eq!(core.step(trigger("css")).commands.len(), 1);
        assert_eq!(core.step(trigger("js")).commands.len(), 1);

        assert!(core.step(completed("css")).commands.is_empty());
        assert!(!core.is_idle());
        assert!(core.step(completed("js")).commands.is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn exits_when_idle_if_requested() {
        let mut core = CoreRuntime::new(RuntimeOptions {
            exit_when_idle: true,
        });
        core.step(trigger("build"));
        let step = core.step(completed("build"));
        assert!(!step.keep_running);
        assert_eq!(step.commands, vec![CoreCommand::RequestExit]);
    }
}
