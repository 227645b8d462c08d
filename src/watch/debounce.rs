// src/watch/debounce.rs

//! Per-binding trailing debounce.
//!
//! Every matching event pushes the binding's deadline to `now + window`; the
//! binding fires once the deadline passes with no further events. A binding
//! under constant churn still fires `max_wait` after its first event. Bindings
//! never share a window, so a burst on one does not delay another.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// Default cap on how long a burst can postpone a binding, in windows.
const MAX_WAIT_WINDOWS: u32 = 10;

#[derive(Debug, Clone, Copy)]
struct Pending {
    first: Instant,
    deadline: Instant,
}

#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    max_wait: Duration,
    deadlines: HashMap<usize, Pending>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            max_wait: window * MAX_WAIT_WINDOWS,
            deadlines: HashMap::new(),
        }
    }

    /// Cap the delay from a binding's first event to its firing.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait.max(self.window);
        self
    }

    /// Record an event for `binding` at `now`.
    pub fn touch(&mut self, binding: usize, now: Instant) {
        let first = self
            .deadlines
            .get(&binding)
            .map_or(now, |pending| pending.first);
        let deadline = (now + self.window).min(first + self.max_wait);
        self.deadlines.insert(binding, Pending { first, deadline });
    }

    /// Earliest pending deadline, if any binding is waiting.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().map(|p| p.deadline).min()
    }

    /// Remove and return every binding whose deadline is at or before `now`,
    /// in index order.
    pub fn due(&mut self, now: Instant) -> Vec<usize> {
        let mut due: Vec<usize> = self
            .deadlines
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(idx, _)| *idx)
            .collect();
        due.sort_unstable();
        for idx in &due {
            self.deadlines.remove(idx);
        }
        due
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}
