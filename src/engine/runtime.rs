// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;

use super::core::{CoreCommand, CoreRuntime};
use super::invoker::Invoker;
use super::RuntimeEvent;

/// Async IO shell around [`CoreRuntime`]: reads events from the channel,
/// steps the core and hands dispatches to the [`Invoker`].
pub struct Runtime<I: Invoker> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    invoker: I,
}

impl<I: Invoker> fmt::Debug for Runtime<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<I: Invoker> Runtime<I> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, invoker: I) -> Self {
        Self {
            core,
            event_rx,
            invoker,
        }
    }

    /// Main event loop. Returns on shutdown, when the core asks to exit, or
    /// when every sender is gone. In-flight invocations are not awaited.
    pub async fn run(mut self) -> Result<()> {
        info!("runtime started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                match command {
                    CoreCommand::Dispatch(target) => self.invoker.dispatch(target).await?,
                    CoreCommand::RequestExit => debug!("core requested exit"),
                }
            }

            if !step.keep_running {
                info!("runtime stopping");
                return Ok(());
            }
        }

        info!("runtime event channel closed; exiting");
        Ok(())
    }
}
