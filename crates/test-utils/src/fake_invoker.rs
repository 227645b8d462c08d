use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use sitepipe::engine::{Invoker, RuntimeEvent};
use sitepipe::errors::Result;
use sitepipe::types::TaskName;

/// A fake invoker that:
/// - records which targets were dispatched
/// - reports `Completed { success: true }` for each, after an optional delay.
pub struct FakeInvoker {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    invoked: Arc<Mutex<Vec<TaskName>>>,
    delay: Duration,
}

impl FakeInvoker {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, invoked: Arc<Mutex<Vec<TaskName>>>) -> Self {
        Self {
            runtime_tx,
            invoked,
            delay: Duration::ZERO,
        }
    }

    /// Keep each invocation "in flight" for `delay` before completing it.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Invoker for FakeInvoker {
    fn dispatch(
        &mut self,
        target: TaskName,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let invoked = Arc::clone(&self.invoked);
        let delay = self.delay;

        Box::pin(async move {
            invoked.lock().unwrap().push(target.clone());

            tokio::spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let _ = tx
                    .send(RuntimeEvent::Completed {
                        target,
                        success: true,
                    })
                    .await;
            });
            Ok(())
        })
    }
}
