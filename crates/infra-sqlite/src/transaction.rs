// SQLite Transaction Implementation

use crate::error::map_sqlx_error;
use crate::rows;
use async_trait::async_trait;
use salonq_core::domain::{is_well_formed_id, Customer, Membership, Provider, QueueSnapshot};
use salonq_core::error::{AppError, Result};
use salonq_core::port::{QueueTransaction, Transaction};
use sqlx::{Sqlite, Transaction as SqlxTransaction};
use tokio::sync::OwnedMutexGuard;

/// One queue mutation
///
/// Holds the store's write gate until commit or rollback, so writers never
/// interleave.
pub struct SqliteQueueTransaction {
    tx: SqlxTransaction<'static, Sqlite>,
    _write_gate: OwnedMutexGuard<()>,
}

impl SqliteQueueTransaction {
    pub(crate) fn new(tx: SqlxTransaction<'static, Sqlite>, write_gate: OwnedMutexGuard<()>) -> Self {
        Self {
            tx,
            _write_gate: write_gate,
        }
    }
}

#[async_trait]
impl Transaction for SqliteQueueTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)
    }
}

#[async_trait]
impl QueueTransaction for SqliteQueueTransaction {
    async fn load_provider(&mut self, provider_id: &str) -> Result<Option<Provider>> {
        rows::fetch_provider(&mut self.tx, provider_id).await
    }

    async fn find_customer(&mut self, customer_id: &str) -> Result<Option<Customer>> {
        rows::fetch_customer(&mut self.tx, customer_id).await
    }

    async fn find_membership(&mut self, customer_id: &str) -> Result<Option<Membership>> {
        rows::fetch_membership(&mut self.tx, customer_id).await
    }

    async fn prune_invalid_entries(&mut self, provider_id: &str) -> Result<u64> {
        let invalid: Vec<i64> = rows::fetch_entries(&mut self.tx, provider_id)
            .await?
            .into_iter()
            .filter(|e| !is_well_formed_id(&e.customer_id) || !e.is_resolved())
            .map(|e| e.seq)
            .collect();

        for seq in &invalid {
            sqlx::query("DELETE FROM queue_entries WHERE provider_id = ? AND seq = ?")
                .bind(provider_id)
                .bind(seq)
                .execute(&mut *self.tx)
                .await
                .map_err(map_sqlx_error)?;
        }
        Ok(invalid.len() as u64)
    }

    async fn append_occupant(
        &mut self,
        provider_id: &str,
        customer_id: &str,
        joined_at: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO queue_entries (provider_id, seq, customer_id, joined_at)
            VALUES (
                ?,
                (SELECT COALESCE(MAX(seq), 0) + 1 FROM queue_entries WHERE provider_id = ?),
                ?,
                ?
            )
            "#,
        )
        .bind(provider_id)
        .bind(provider_id)
        .bind(customer_id)
        .bind(joined_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn remove_occupant(&mut self, provider_id: &str, customer_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM queue_entries WHERE provider_id = ? AND customer_id = ?")
            .bind(provider_id)
            .bind(customer_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_customer(&mut self, customer: &Customer) -> Result<()> {
        sqlx::query(
            "INSERT INTO customers (id, display_name, contact_email, kind, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&customer.id)
        .bind(&customer.display_name)
        .bind(&customer.contact_email)
        .bind(customer.kind.to_string())
        .bind(customer.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete_customer(&mut self, customer_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?")
            .bind(customer_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_open(&mut self, provider_id: &str, is_open: bool) -> Result<()> {
        let result = sqlx::query("UPDATE providers SET is_open = ? WHERE id = ?")
            .bind(if is_open { 1 } else { 0 })
            .bind(provider_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::provider_not_found(provider_id));
        }
        Ok(())
    }

    async fn bump_revision(&mut self, provider_id: &str) -> Result<u64> {
        let revision: Option<i64> =
            sqlx::query_scalar("UPDATE providers SET revision = revision + 1 WHERE id = ? RETURNING revision")
                .bind(provider_id)
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(map_sqlx_error)?;

        revision
            .map(|r| r.max(0) as u64)
            .ok_or_else(|| AppError::provider_not_found(provider_id))
    }

    async fn snapshot(&mut self, provider_id: &str) -> Result<Option<QueueSnapshot>> {
        rows::fetch_snapshot(&mut self.tx, provider_id).await
    }
}
