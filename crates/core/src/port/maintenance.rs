// Queue maintenance port (nightly reset, walk-in GC, stats)
use crate::domain::ProviderId;
use crate::error::Result;
use async_trait::async_trait;

/// Outcome of a bulk queue reset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetReport {
    /// Every provider whose revision was bumped by the reset
    pub providers: Vec<ProviderId>,
    pub entries_cleared: u64,
    pub walk_ins_deleted: u64,
}

/// Store-wide counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub provider_count: i64,
    pub open_provider_count: i64,
    pub customer_count: i64,
    pub queued_count: i64,
    pub walk_in_count: i64,
}

/// Maintenance operations that bypass the mutation service's invariants
#[async_trait]
pub trait QueueMaintenance: Send + Sync {
    /// Empty every provider's queue in one transaction
    ///
    /// Walk-in customers referenced by the cleared entries are deleted in the
    /// same transaction, and every provider's revision is bumped.
    async fn reset_all_queues(&self) -> Result<ResetReport>;

    /// Delete walk-in customers no queue references
    ///
    /// # Returns
    /// Number of walk-in records deleted
    async fn purge_orphaned_walk_ins(&self) -> Result<u64>;

    async fn get_stats(&self) -> Result<StoreStats>;
}
