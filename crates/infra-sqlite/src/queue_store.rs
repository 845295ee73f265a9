// SQLite QueueStore Implementation

use crate::error::map_sqlx_error;
use crate::rows::{self, ProviderRow, PROVIDER_COLUMNS};
use crate::SqliteQueueTransaction;
use async_trait::async_trait;
use salonq_core::domain::{Customer, Membership, Provider, ProviderProfile, QueueSnapshot};
use salonq_core::error::Result;
use salonq_core::port::{QueueStore, QueueTransaction, TransactionalQueueStore};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serializes writers
///
/// SQLite allows one writer at a time. Taking this gate before `BEGIN` keeps
/// a deferred transaction from being refused when it upgrades to a write lock.
#[derive(Clone, Default)]
pub(crate) struct WriteGate(Arc<Mutex<()>>);

impl WriteGate {
    pub(crate) async fn enter(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.0).lock_owned().await
    }
}

#[derive(Clone)]
pub struct SqliteQueueStore {
    pool: SqlitePool,
    gate: WriteGate,
}

impl SqliteQueueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            gate: WriteGate::default(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub(crate) fn gate(&self) -> &WriteGate {
        &self.gate
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn list_providers(&self) -> Result<Vec<Provider>> {
        let rows: Vec<ProviderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM providers ORDER BY created_at, id",
            PROVIDER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ProviderRow::into_provider).collect())
    }

    async fn find_provider(&self, provider_id: &str) -> Result<Option<Provider>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        rows::fetch_provider(&mut conn, provider_id).await
    }

    async fn insert_provider(&self, provider: &Provider) -> Result<()> {
        let _write = self.gate.enter().await;

        sqlx::query(
            r#"
            INSERT INTO providers (
                id, name, address, phone, opening_hour, is_open, revision, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&provider.id)
        .bind(&provider.profile.name)
        .bind(&provider.profile.address)
        .bind(&provider.profile.phone)
        .bind(&provider.profile.opening_hour)
        .bind(if provider.is_open { 1 } else { 0 })
        .bind(provider.revision as i64)
        .bind(provider.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update_profile(&self, provider_id: &str, profile: &ProviderProfile) -> Result<bool> {
        let _write = self.gate.enter().await;

        let result = sqlx::query(
            "UPDATE providers SET name = ?, address = ?, phone = ?, opening_hour = ? WHERE id = ?",
        )
        .bind(&profile.name)
        .bind(&profile.address)
        .bind(&profile.phone)
        .bind(&profile.opening_hour)
        .bind(provider_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_customer(&self, customer_id: &str) -> Result<Option<Customer>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        rows::fetch_customer(&mut conn, customer_id).await
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<()> {
        let _write = self.gate.enter().await;

        sqlx::query(
            "INSERT INTO customers (id, display_name, contact_email, kind, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&customer.id)
        .bind(&customer.display_name)
        .bind(&customer.contact_email)
        .bind(customer.kind.to_string())
        .bind(customer.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_membership(&self, customer_id: &str) -> Result<Option<Membership>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let membership = rows::fetch_membership(&mut tx, customer_id).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(membership)
    }

    async fn snapshot(&self, provider_id: &str) -> Result<Option<QueueSnapshot>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let snapshot = rows::fetch_snapshot(&mut tx, provider_id).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(snapshot)
    }
}

#[async_trait]
impl TransactionalQueueStore for SqliteQueueStore {
    async fn begin_transaction(&self) -> Result<Box<dyn QueueTransaction>> {
        let write = self.gate.enter().await;
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(SqliteQueueTransaction::new(tx, write)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use salonq_core::domain::CustomerKind;
    use salonq_core::error::AppError;
    use salonq_core::port::Transaction;

    async fn setup_store() -> SqliteQueueStore {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteQueueStore::new(pool)
    }

    fn provider(id: &str, created_at: i64) -> Provider {
        Provider::new(
            id,
            created_at,
            ProviderProfile {
                name: format!("Salon {}", id),
                address: "1 Main St".to_string(),
                phone: Some("555-0101".to_string()),
                opening_hour: None,
            },
        )
    }

    async fn raw_entry(store: &SqliteQueueStore, provider_id: &str, seq: i64, customer_id: &str) {
        sqlx::query("INSERT INTO queue_entries (provider_id, seq, customer_id, joined_at) VALUES (?, ?, ?, 0)")
            .bind(provider_id)
            .bind(seq)
            .bind(customer_id)
            .execute(store.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_provider_roundtrip_and_order() {
        let store = setup_store().await;
        store.insert_provider(&provider("b", 20)).await.unwrap();
        store.insert_provider(&provider("a", 10)).await.unwrap();

        let found = store.find_provider("b").await.unwrap().unwrap();
        assert_eq!(found, provider("b", 20));

        let ids: Vec<String> = store
            .list_providers()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let store = setup_store().await;
        store.insert_provider(&provider("p", 0)).await.unwrap();

        let mut profile = provider("p", 0).profile;
        profile.name = "Renamed".to_string();
        assert!(store.update_profile("p", &profile).await.unwrap());
        assert!(!store.update_profile("missing", &profile).await.unwrap());

        let found = store.find_provider("p").await.unwrap().unwrap();
        assert_eq!(found.profile.name, "Renamed");
    }

    #[tokio::test]
    async fn test_customer_email_is_unique() {
        let store = setup_store().await;
        let a = Customer::registered("a", 0, "A", "same@example.com");
        let b = Customer::registered("b", 0, "B", "same@example.com");
        store.insert_customer(&a).await.unwrap();
        let err = store.insert_customer(&b).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let found = store.find_customer("a").await.unwrap().unwrap();
        assert_eq!(found.kind, CustomerKind::Registered);
    }

    #[tokio::test]
    async fn test_snapshot_filters_dangling_and_malformed() {
        let store = setup_store().await;
        store.insert_provider(&provider("p", 0)).await.unwrap();
        store
            .insert_customer(&Customer::registered("c1", 0, "One", "one@example.com"))
            .await
            .unwrap();
        store
            .insert_customer(&Customer::registered("c2", 0, "Two", "two@example.com"))
            .await
            .unwrap();

        raw_entry(&store, "p", 1, "ghost").await;
        raw_entry(&store, "p", 2, "c2").await;
        raw_entry(&store, "p", 3, "bad id").await;
        raw_entry(&store, "p", 4, "c1").await;

        let snapshot = store.snapshot("p").await.unwrap().unwrap();
        assert_eq!(snapshot.customer_ids(), vec!["c2", "c1"]);
        assert_eq!(snapshot.position_of("c1"), Some(2));
        assert_eq!(snapshot.queue[0].display_name, "Two");

        assert!(store.find_membership("ghost").await.unwrap().is_none());
        let membership = store.find_membership("c1").await.unwrap().unwrap();
        assert_eq!(membership.provider_id, "p");
        assert_eq!(membership.provider_name, "Salon p");
        assert_eq!(membership.position, 2);
    }

    #[tokio::test]
    async fn test_snapshot_of_missing_provider() {
        let store = setup_store().await;
        assert!(store.snapshot("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transaction_rollback_discards_writes() {
        let store = setup_store().await;
        store.insert_provider(&provider("p", 0)).await.unwrap();

        let mut tx = store.begin_transaction().await.unwrap();
        let walk_in = Customer::walk_in("w1", 5);
        tx.insert_customer(&walk_in).await.unwrap();
        tx.append_occupant("p", "w1", 5).await.unwrap();
        assert_eq!(tx.bump_revision("p").await.unwrap(), 1);
        tx.rollback().await.unwrap();

        assert!(store.find_customer("w1").await.unwrap().is_none());
        let snapshot = store.snapshot("p").await.unwrap().unwrap();
        assert!(snapshot.queue.is_empty());
        assert_eq!(snapshot.revision, 0);
    }

    #[tokio::test]
    async fn test_unique_membership_index_maps_to_conflict() {
        let store = setup_store().await;
        store.insert_provider(&provider("p1", 0)).await.unwrap();
        store.insert_provider(&provider("p2", 1)).await.unwrap();
        store
            .insert_customer(&Customer::registered("c", 0, "C", "c@example.com"))
            .await
            .unwrap();

        let mut tx = store.begin_transaction().await.unwrap();
        tx.append_occupant("p1", "c", 0).await.unwrap();
        let err = tx.append_occupant("p2", "c", 0).await.unwrap_err();
        assert_eq!(err.kind(), salonq_core::ErrorKind::InvariantViolation);
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_prune_and_append_keep_fifo_order() {
        let store = setup_store().await;
        store.insert_provider(&provider("p", 0)).await.unwrap();
        store
            .insert_customer(&Customer::registered("c1", 0, "One", "one@example.com"))
            .await
            .unwrap();
        store
            .insert_customer(&Customer::registered("c2", 0, "Two", "two@example.com"))
            .await
            .unwrap();
        raw_entry(&store, "p", 1, "c1").await;
        raw_entry(&store, "p", 2, "ghost").await;

        let mut tx = store.begin_transaction().await.unwrap();
        assert_eq!(tx.prune_invalid_entries("p").await.unwrap(), 1);
        tx.append_occupant("p", "c2", 10).await.unwrap();
        let snapshot = tx.snapshot("p").await.unwrap().unwrap();
        tx.commit().await.unwrap();

        assert_eq!(snapshot.customer_ids(), vec!["c1", "c2"]);
    }
}
