// Transaction port for atomic queue mutations

use crate::domain::{Customer, Membership, Provider, QueueSnapshot};
use crate::error::Result;
use async_trait::async_trait;

/// Transaction trait for atomic multi-step operations
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Entry point for queue mutations
///
/// Implementations must serialize transactions that touch occupant lists so a
/// membership check and the insert that follows it cannot interleave with
/// another admission.
#[async_trait]
pub trait TransactionalQueueStore: Send + Sync {
    /// Begin a new transaction
    async fn begin_transaction(&self) -> Result<Box<dyn QueueTransaction>>;
}

/// Queue operations within a transaction
#[async_trait]
pub trait QueueTransaction: Transaction {
    /// Load the provider record (None if missing)
    async fn load_provider(&mut self, provider_id: &str) -> Result<Option<Provider>>;

    async fn find_customer(&mut self, customer_id: &str) -> Result<Option<Customer>>;

    /// Provider currently holding this customer, if any
    async fn find_membership(&mut self, customer_id: &str) -> Result<Option<Membership>>;

    /// Delete entries of this provider that are malformed or dangling
    async fn prune_invalid_entries(&mut self, provider_id: &str) -> Result<u64>;

    /// Append to the tail of the provider's queue
    async fn append_occupant(
        &mut self,
        provider_id: &str,
        customer_id: &str,
        joined_at: i64,
    ) -> Result<()>;

    /// Remove from the provider's queue; false if it was not there
    async fn remove_occupant(&mut self, provider_id: &str, customer_id: &str) -> Result<bool>;

    async fn insert_customer(&mut self, customer: &Customer) -> Result<()>;

    async fn delete_customer(&mut self, customer_id: &str) -> Result<bool>;

    async fn set_open(&mut self, provider_id: &str, is_open: bool) -> Result<()>;

    /// Increment the provider revision and return the new value
    async fn bump_revision(&mut self, provider_id: &str) -> Result<u64>;

    /// Resolved queue as seen inside this transaction
    async fn snapshot(&mut self, provider_id: &str) -> Result<Option<QueueSnapshot>>;
}
