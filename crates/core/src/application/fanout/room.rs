// Provider room - one broadcast channel per watched provider

use super::FanOut;
use crate::domain::{ProviderId, QueueSnapshot};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

pub(super) struct Room {
    pub(super) sender: broadcast::Sender<Arc<QueueSnapshot>>,
    pub(super) subscribers: usize,
    /// Highest revision broadcast so far
    pub(super) last_revision: Option<u64>,
}

impl Room {
    pub(super) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            subscribers: 0,
            last_revision: None,
        }
    }

    /// Broadcast unless a newer revision already went out
    ///
    /// An equal revision is a re-read of the same state and still goes out.
    pub(super) fn offer(&mut self, snapshot: Arc<QueueSnapshot>) -> bool {
        if self
            .last_revision
            .is_some_and(|seen| snapshot.revision < seen)
        {
            return false;
        }
        self.last_revision = Some(snapshot.revision);
        // No live receivers is not an error; the room is about to be dropped
        let _ = self.sender.send(snapshot);
        true
    }
}

/// One watcher's membership in a provider room
///
/// Dropping the subscription leaves the room; the last one out removes it.
pub struct RoomSubscription {
    pub(super) fanout: FanOut,
    pub(super) provider_id: ProviderId,
    pub(super) receiver: broadcast::Receiver<Arc<QueueSnapshot>>,
    pub(super) last_seen: Option<u64>,
}

impl RoomSubscription {
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Next snapshot at least as new as anything this watcher has seen
    ///
    /// A watcher that falls behind skips straight to the retained snapshots;
    /// every snapshot is a full state, so nothing is lost by skipping.
    /// Returns `None` once the room is gone.
    pub async fn next(&mut self) -> Option<Arc<QueueSnapshot>> {
        loop {
            match self.receiver.recv().await {
                Ok(snapshot) => {
                    if self.last_seen.is_some_and(|seen| snapshot.revision < seen) {
                        continue;
                    }
                    self.last_seen = Some(snapshot.revision);
                    return Some(snapshot);
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(provider_id = %self.provider_id, skipped, "Watcher lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl std::fmt::Debug for RoomSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomSubscription")
            .field("provider_id", &self.provider_id)
            .field("last_seen", &self.last_seen)
            .finish()
    }
}

impl Drop for RoomSubscription {
    fn drop(&mut self) {
        self.fanout.leave(&self.provider_id);
    }
}
