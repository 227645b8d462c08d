use serde::Deserialize;
use tokio::sync::broadcast;

/// Canonical name type for tasks and compositions.
pub type TaskName = String;

/// Payload-free notification that output changed and browsers should refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadSignal;

/// Sending half of the reload broadcast.
///
/// Tasks fire into it after a run that wrote output; every connected dev-server
/// client holds a receiver. Sending with no receivers is not an error.
pub type ReloadSender = broadcast::Sender<ReloadSignal>;

/// Capacity of the reload broadcast; lagging clients just miss old signals.
pub const RELOAD_CHANNEL_CAPACITY: usize = 16;

pub fn reload_channel() -> (ReloadSender, broadcast::Receiver<ReloadSignal>) {
    broadcast::channel(RELOAD_CHANNEL_CAPACITY)
}

/// How a composition runs its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositionKind {
    /// One after another; stop at the first failure.
    Sequence,
    /// All at once; wait for every member, then aggregate failures.
    Parallel,
}
