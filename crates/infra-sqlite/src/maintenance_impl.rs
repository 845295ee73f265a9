// SQLite Maintenance Implementation (nightly reset, walk-in GC, stats)
use crate::error::map_sqlx_error;
use crate::queue_store::{SqliteQueueStore, WriteGate};
use async_trait::async_trait;
use salonq_core::domain::CustomerKind;
use salonq_core::error::Result;
use salonq_core::port::{QueueMaintenance, ResetReport, StoreStats};
use sqlx::SqlitePool;
use tracing::{debug, info};

/// SQLite maintenance implementation
///
/// Shares the store's write gate, so a reset never interleaves with a
/// queue mutation.
pub struct SqliteQueueMaintenance {
    pool: SqlitePool,
    gate: WriteGate,
}

impl SqliteQueueMaintenance {
    pub fn new(store: &SqliteQueueStore) -> Self {
        Self {
            pool: store.pool().clone(),
            gate: store.gate().clone(),
        }
    }

    async fn count(&self, sql: &str) -> Result<i64> {
        sqlx::query_scalar(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl QueueMaintenance for SqliteQueueMaintenance {
    async fn reset_all_queues(&self) -> Result<ResetReport> {
        let _write = self.gate.enter().await;
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let entries_cleared: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue_entries")
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let walk_ins = sqlx::query(
            r#"
            DELETE FROM customers
            WHERE kind = ?
            AND id IN (SELECT customer_id FROM queue_entries)
            "#,
        )
        .bind(CustomerKind::WalkIn.to_string())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM queue_entries")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let providers: Vec<String> = sqlx::query_scalar(
            "UPDATE providers SET revision = revision + 1 RETURNING id",
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        let report = ResetReport {
            providers,
            entries_cleared: entries_cleared.max(0) as u64,
            walk_ins_deleted: walk_ins.rows_affected(),
        };
        info!(
            providers = report.providers.len(),
            entries_cleared = report.entries_cleared,
            walk_ins_deleted = report.walk_ins_deleted,
            "All queues cleared"
        );
        Ok(report)
    }

    async fn purge_orphaned_walk_ins(&self) -> Result<u64> {
        let _write = self.gate.enter().await;

        let result = sqlx::query(
            r#"
            DELETE FROM customers
            WHERE kind = ?
            AND id NOT IN (SELECT customer_id FROM queue_entries)
            "#,
        )
        .bind(CustomerKind::WalkIn.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let deleted = result.rows_affected();
        debug!(deleted, "Orphaned walk-in sweep completed");
        Ok(deleted)
    }

    async fn get_stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            provider_count: self.count("SELECT COUNT(*) FROM providers").await?,
            open_provider_count: self
                .count("SELECT COUNT(*) FROM providers WHERE is_open = 1")
                .await?,
            customer_count: self.count("SELECT COUNT(*) FROM customers").await?,
            queued_count: self.count("SELECT COUNT(*) FROM queue_entries").await?,
            walk_in_count: self
                .count("SELECT COUNT(*) FROM customers WHERE kind = 'WALK_IN'")
                .await?,
        })
    }
}
