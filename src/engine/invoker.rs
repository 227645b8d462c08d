// src/engine/invoker.rs

//! Pluggable invocation backend.
//!
//! The runtime talks to an `Invoker` instead of the task graph directly, so
//! tests can swap in a fake that records dispatches and completes them
//! immediately.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::dag::TaskGraph;
use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::types::TaskName;

pub trait Invoker: Send {
    /// Start an invocation of `target`.
    ///
    /// Must not wait for the invocation itself: implementations report the
    /// outcome later with [`RuntimeEvent::Completed`].
    fn dispatch(
        &mut self,
        target: TaskName,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production invoker: runs targets on the task graph in background tasks.
#[derive(Debug, Clone)]
pub struct GraphInvoker {
    graph: Arc<TaskGraph>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl GraphInvoker {
    pub fn new(graph: Arc<TaskGraph>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self { graph, runtime_tx }
    }
}

impl Invoker for GraphInvoker {
    fn dispatch(
        &mut self,
        target: TaskName,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let graph = Arc::clone(&self.graph);
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            tokio::spawn(async move {
                info!(task = %target, "running");
                let success = match graph.invoke(&target).await {
                    Ok(()) => true,
                    Err(e) => {
                        for failure in e.into_failures() {
                            error!(task = %target, error = %failure, "invocation failed");
                        }
                        false
                    }
                };
                // The runtime may already be gone after shutdown.
                let _ = tx.send(RuntimeEvent::Completed { target, success }).await;
            });
            Ok(())
        })
    }
}
