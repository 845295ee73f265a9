// Queue Store Port (read side + provider/customer records)

use crate::domain::{
    Customer, CustomerId, Membership, Provider, ProviderId, ProviderProfile, QueueSnapshot,
};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for provider and customer records
///
/// Occupant lists are never written through this trait; see
/// `TransactionalQueueStore`.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// All providers, oldest first
    async fn list_providers(&self) -> Result<Vec<Provider>>;

    async fn find_provider(&self, provider_id: &str) -> Result<Option<Provider>>;

    async fn insert_provider(&self, provider: &Provider) -> Result<()>;

    /// Replace profile fields; false if the provider does not exist
    async fn update_profile(&self, provider_id: &str, profile: &ProviderProfile) -> Result<bool>;

    async fn find_customer(&self, customer_id: &str) -> Result<Option<Customer>>;

    async fn insert_customer(&self, customer: &Customer) -> Result<()>;

    /// Provider currently holding this customer, if any
    async fn find_membership(&self, customer_id: &str) -> Result<Option<Membership>>;

    /// Consistent, sanitized view of one provider's queue
    ///
    /// The provider row and its entries must come from the same read so a
    /// caller never sees a torn list.
    async fn snapshot(&self, provider_id: &str) -> Result<Option<QueueSnapshot>>;
}

// ============================================================================
// In-memory implementation for testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::{sanitize_occupants, CustomerKind, OccupantRecord};
    use crate::error::AppError;
    use crate::port::maintenance::{QueueMaintenance, ResetReport, StoreStats};
    use crate::port::transaction::{QueueTransaction, Transaction, TransactionalQueueStore};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::{Mutex, OwnedMutexGuard};

    #[derive(Debug, Clone, Default)]
    struct MemoryState {
        providers: Vec<Provider>,
        customers: HashMap<CustomerId, Customer>,
        entries: HashMap<ProviderId, Vec<(String, i64)>>,
    }

    impl MemoryState {
        fn provider(&self, id: &str) -> Option<&Provider> {
            self.providers.iter().find(|p| p.id == id)
        }

        fn provider_mut(&mut self, id: &str) -> Option<&mut Provider> {
            self.providers.iter_mut().find(|p| p.id == id)
        }

        fn snapshot(&self, provider_id: &str) -> Option<QueueSnapshot> {
            let provider = self.provider(provider_id)?;
            let records = self
                .entries
                .get(provider_id)
                .map(|entries| {
                    entries
                        .iter()
                        .map(|(customer_id, joined_at)| OccupantRecord {
                            customer_id: customer_id.clone(),
                            joined_at: *joined_at,
                            customer: self.customers.get(customer_id).cloned(),
                        })
                        .collect()
                })
                .unwrap_or_default();

            Some(QueueSnapshot {
                provider_id: provider.id.clone(),
                revision: provider.revision,
                is_open: provider.is_open,
                queue: sanitize_occupants(records),
            })
        }

        fn membership(&self, customer_id: &str) -> Option<Membership> {
            self.providers.iter().find_map(|p| {
                let position = self.snapshot(&p.id)?.position_of(customer_id)?;
                Some(Membership {
                    provider_id: p.id.clone(),
                    provider_name: p.profile.name.clone(),
                    position,
                })
            })
        }
    }

    #[derive(Default)]
    struct Faults {
        fail_next_append: AtomicBool,
        fail_next_commit: AtomicBool,
    }

    /// In-memory store with fault injection.
    ///
    /// A transaction holds the whole state lock and works on a copy, so commit
    /// is all-or-nothing and transactions are fully serialized.
    #[derive(Clone, Default)]
    pub struct InMemoryQueueStore {
        state: Arc<Mutex<MemoryState>>,
        faults: Arc<Faults>,
    }

    impl InMemoryQueueStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make the next `append_occupant` fail with a database error
        pub fn fail_next_append(&self) {
            self.faults.fail_next_append.store(true, Ordering::SeqCst);
        }

        /// Make the next commit fail with a database error
        pub fn fail_next_commit(&self) {
            self.faults.fail_next_commit.store(true, Ordering::SeqCst);
        }

        /// Write a raw entry, bypassing every check (for sanitation tests)
        pub async fn insert_raw_entry(&self, provider_id: &str, customer_id: &str) {
            let mut state = self.state.lock().await;
            state
                .entries
                .entry(provider_id.to_string())
                .or_default()
                .push((customer_id.to_string(), 0));
        }

        /// Raw entry count, including entries a snapshot would prune
        pub async fn raw_entry_count(&self, provider_id: &str) -> usize {
            let state = self.state.lock().await;
            state.entries.get(provider_id).map_or(0, |e| e.len())
        }

        pub async fn customer_count(&self) -> usize {
            self.state.lock().await.customers.len()
        }
    }

    #[async_trait]
    impl QueueStore for InMemoryQueueStore {
        async fn list_providers(&self) -> Result<Vec<Provider>> {
            Ok(self.state.lock().await.providers.clone())
        }

        async fn find_provider(&self, provider_id: &str) -> Result<Option<Provider>> {
            Ok(self.state.lock().await.provider(provider_id).cloned())
        }

        async fn insert_provider(&self, provider: &Provider) -> Result<()> {
            let mut state = self.state.lock().await;
            if state.provider(&provider.id).is_some() {
                return Err(AppError::Database(format!(
                    "Unique constraint violation: provider {}",
                    provider.id
                )));
            }
            state.providers.push(provider.clone());
            Ok(())
        }

        async fn update_profile(
            &self,
            provider_id: &str,
            profile: &ProviderProfile,
        ) -> Result<bool> {
            let mut state = self.state.lock().await;
            Ok(match state.provider_mut(provider_id) {
                Some(p) => {
                    p.profile = profile.clone();
                    true
                }
                None => false,
            })
        }

        async fn find_customer(&self, customer_id: &str) -> Result<Option<Customer>> {
            Ok(self.state.lock().await.customers.get(customer_id).cloned())
        }

        async fn insert_customer(&self, customer: &Customer) -> Result<()> {
            let mut state = self.state.lock().await;
            insert_customer_into(&mut state, customer)
        }

        async fn find_membership(&self, customer_id: &str) -> Result<Option<Membership>> {
            Ok(self.state.lock().await.membership(customer_id))
        }

        async fn snapshot(&self, provider_id: &str) -> Result<Option<QueueSnapshot>> {
            Ok(self.state.lock().await.snapshot(provider_id))
        }
    }

    fn insert_customer_into(state: &mut MemoryState, customer: &Customer) -> Result<()> {
        let email_taken = state
            .customers
            .values()
            .any(|c| c.contact_email == customer.contact_email);
        if email_taken {
            return Err(AppError::Conflict(
                "contact email already registered".to_string(),
            ));
        }
        if state.customers.contains_key(&customer.id) {
            return Err(AppError::Database(format!(
                "Unique constraint violation: customer {}",
                customer.id
            )));
        }
        state.customers.insert(customer.id.clone(), customer.clone());
        Ok(())
    }

    pub struct MemoryTransaction {
        guard: OwnedMutexGuard<MemoryState>,
        working: MemoryState,
        faults: Arc<Faults>,
    }

    #[async_trait]
    impl Transaction for MemoryTransaction {
        async fn commit(mut self: Box<Self>) -> Result<()> {
            if self.faults.fail_next_commit.swap(false, Ordering::SeqCst) {
                return Err(AppError::Database("injected commit failure".to_string()));
            }
            let working = std::mem::take(&mut self.working);
            *self.guard = working;
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl QueueTransaction for MemoryTransaction {
        async fn load_provider(&mut self, provider_id: &str) -> Result<Option<Provider>> {
            Ok(self.working.provider(provider_id).cloned())
        }

        async fn find_customer(&mut self, customer_id: &str) -> Result<Option<Customer>> {
            Ok(self.working.customers.get(customer_id).cloned())
        }

        async fn find_membership(&mut self, customer_id: &str) -> Result<Option<Membership>> {
            Ok(self.working.membership(customer_id))
        }

        async fn prune_invalid_entries(&mut self, provider_id: &str) -> Result<u64> {
            let customers = &self.working.customers;
            let Some(entries) = self.working.entries.get_mut(provider_id) else {
                return Ok(0);
            };
            let before = entries.len();
            entries.retain(|(id, _)| {
                crate::domain::is_well_formed_id(id) && customers.contains_key(id)
            });
            Ok((before - entries.len()) as u64)
        }

        async fn append_occupant(
            &mut self,
            provider_id: &str,
            customer_id: &str,
            joined_at: i64,
        ) -> Result<()> {
            if self.faults.fail_next_append.swap(false, Ordering::SeqCst) {
                return Err(AppError::Database("injected append failure".to_string()));
            }
            let held = self
                .working
                .entries
                .values()
                .any(|entries| entries.iter().any(|(id, _)| id == customer_id));
            if held {
                return Err(AppError::Conflict(format!(
                    "customer {} already holds a queue slot",
                    customer_id
                )));
            }
            self.working
                .entries
                .entry(provider_id.to_string())
                .or_default()
                .push((customer_id.to_string(), joined_at));
            Ok(())
        }

        async fn remove_occupant(&mut self, provider_id: &str, customer_id: &str) -> Result<bool> {
            let Some(entries) = self.working.entries.get_mut(provider_id) else {
                return Ok(false);
            };
            let before = entries.len();
            entries.retain(|(id, _)| id != customer_id);
            Ok(entries.len() != before)
        }

        async fn insert_customer(&mut self, customer: &Customer) -> Result<()> {
            insert_customer_into(&mut self.working, customer)
        }

        async fn delete_customer(&mut self, customer_id: &str) -> Result<bool> {
            Ok(self.working.customers.remove(customer_id).is_some())
        }

        async fn set_open(&mut self, provider_id: &str, is_open: bool) -> Result<()> {
            match self.working.provider_mut(provider_id) {
                Some(p) => {
                    p.is_open = is_open;
                    Ok(())
                }
                None => Err(AppError::provider_not_found(provider_id)),
            }
        }

        async fn bump_revision(&mut self, provider_id: &str) -> Result<u64> {
            match self.working.provider_mut(provider_id) {
                Some(p) => {
                    p.revision += 1;
                    Ok(p.revision)
                }
                None => Err(AppError::provider_not_found(provider_id)),
            }
        }

        async fn snapshot(&mut self, provider_id: &str) -> Result<Option<QueueSnapshot>> {
            Ok(self.working.snapshot(provider_id))
        }
    }

    #[async_trait]
    impl TransactionalQueueStore for InMemoryQueueStore {
        async fn begin_transaction(&self) -> Result<Box<dyn QueueTransaction>> {
            let guard = Arc::clone(&self.state).lock_owned().await;
            let working = guard.clone();
            Ok(Box::new(MemoryTransaction {
                guard,
                working,
                faults: Arc::clone(&self.faults),
            }))
        }
    }

    #[async_trait]
    impl QueueMaintenance for InMemoryQueueStore {
        async fn reset_all_queues(&self) -> Result<ResetReport> {
            let mut state = self.state.lock().await;
            let mut report = ResetReport::default();

            let cleared: Vec<String> = state
                .entries
                .drain()
                .flat_map(|(_, entries)| entries.into_iter().map(|(id, _)| id))
                .collect();
            report.entries_cleared = cleared.len() as u64;

            for id in cleared {
                let is_walk_in = state
                    .customers
                    .get(&id)
                    .is_some_and(|c| c.kind == CustomerKind::WalkIn);
                if is_walk_in {
                    state.customers.remove(&id);
                    report.walk_ins_deleted += 1;
                }
            }

            for p in state.providers.iter_mut() {
                p.revision += 1;
                report.providers.push(p.id.clone());
            }
            Ok(report)
        }

        async fn purge_orphaned_walk_ins(&self) -> Result<u64> {
            let mut state = self.state.lock().await;
            let referenced: std::collections::HashSet<String> = state
                .entries
                .values()
                .flat_map(|e| e.iter().map(|(id, _)| id.clone()))
                .collect();
            let before = state.customers.len();
            state
                .customers
                .retain(|id, c| c.kind != CustomerKind::WalkIn || referenced.contains(id));
            Ok((before - state.customers.len()) as u64)
        }

        async fn get_stats(&self) -> Result<StoreStats> {
            let state = self.state.lock().await;
            Ok(StoreStats {
                provider_count: state.providers.len() as i64,
                open_provider_count: state.providers.iter().filter(|p| p.is_open).count() as i64,
                customer_count: state.customers.len() as i64,
                queued_count: state.entries.values().map(|e| e.len() as i64).sum(),
                walk_in_count: state
                    .customers
                    .values()
                    .filter(|c| c.kind == CustomerKind::WalkIn)
                    .count() as i64,
            })
        }
    }
}
