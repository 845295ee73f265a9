// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod maintenance;
pub mod notifier;
pub mod queue_store;
pub mod time_provider;
pub mod transaction;

// Re-exports
pub use id_provider::IdProvider;
pub use maintenance::{QueueMaintenance, ResetReport, StoreStats};
pub use notifier::{NoopNotifier, QueueNotifier};
pub use queue_store::QueueStore;
pub use time_provider::TimeProvider;
pub use transaction::{QueueTransaction, Transaction, TransactionalQueueStore};
