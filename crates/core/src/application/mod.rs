// Application Layer - Use Cases and Business Logic

pub mod constants;
pub mod directory;
pub mod fanout;
pub mod queue;
pub mod reset;
pub mod shutdown;

// Re-exports
pub use directory::DirectoryService;
pub use fanout::{FanOut, RoomSubscription};
pub use queue::{MutationOutcome, QueueService, WalkInAdmission};
pub use reset::{DailySchedule, ResetScheduler};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
