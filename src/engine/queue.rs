// src/engine/queue.rs

use std::collections::HashSet;

use tracing::debug;

use crate::types::TaskName;

/// Targets re-triggered while their invocation was in flight.
///
/// Each target is held at most once: any number of triggers during one run
/// collapse into a single follow-up run.
#[derive(Debug, Default)]
pub struct TriggerQueue {
    pending: HashSet<TaskName>,
}

impl TriggerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remember a trigger for later. Returns false if it was already queued.
    pub fn record_trigger(&mut self, target: &str) -> bool {
        let inserted = self.pending.insert(target.to_string());
        debug!(task = %target, inserted, "queued trigger behind in-flight run");
        inserted
    }

    /// Remove `target` from the queue, returning whether it was there.
    pub fn take(&mut self, target: &str) -> bool {
        self.pending.remove(target)
    }
}
