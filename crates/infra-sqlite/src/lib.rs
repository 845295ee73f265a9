// SalonQ Infrastructure - SQLite Adapter
// Implements: QueueStore, TransactionalQueueStore, QueueMaintenance

mod connection;
mod error;
mod maintenance_impl;
mod migration;
mod queue_store;
mod rows;
mod transaction;

pub use connection::{create_pool, database_url};
pub use maintenance_impl::SqliteQueueMaintenance;
pub use migration::run_migrations;
pub use queue_store::SqliteQueueStore;
pub use transaction::SqliteQueueTransaction;
