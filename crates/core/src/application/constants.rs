// Application constants (no magic values)
use std::time::Duration;

/// Snapshots a room buffers for a slow watcher before it starts skipping
pub const DEFAULT_ROOM_CAPACITY: usize = 64;

/// Delay before retrying a failed nightly reset
pub const RESET_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Default local reset time (HH:MM)
pub const DEFAULT_RESET_AT: &str = "00:00";
