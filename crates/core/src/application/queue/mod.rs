// Queue Mutation Service - the only path that changes occupant lists

pub mod join;
pub mod leave;
mod locks;
pub mod open_status;
pub mod walk_in;

pub use locks::{ProviderGuard, ProviderLocks};

use crate::domain::id::ensure_well_formed;
use crate::domain::{Customer, QueueSnapshot};
use crate::error::{AppError, Result};
use crate::port::{
    IdProvider, QueueNotifier, QueueTransaction, TimeProvider, TransactionalQueueStore,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of one mutation, read back inside its transaction
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub snapshot: QueueSnapshot,
    /// False for no-ops (e.g. leaving a queue you are not in)
    pub changed: bool,
}

impl MutationOutcome {
    async fn read_back(
        tx: &mut dyn QueueTransaction,
        provider_id: &str,
        changed: bool,
    ) -> Result<Self> {
        let snapshot = tx
            .snapshot(provider_id)
            .await?
            .ok_or_else(|| AppError::provider_not_found(provider_id))?;
        Ok(Self { snapshot, changed })
    }
}

/// A freshly admitted walk-in and the queue it landed in
#[derive(Debug, Clone)]
pub struct WalkInAdmission {
    pub customer: Customer,
    pub snapshot: QueueSnapshot,
}

/// Queue Mutation Service
///
/// Each operation locks its provider, runs in one store transaction, and
/// signals the notifier only after a successful commit that changed state.
pub struct QueueService {
    store: Arc<dyn TransactionalQueueStore>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    notifier: Arc<dyn QueueNotifier>,
    locks: ProviderLocks,
}

impl QueueService {
    pub fn new(
        store: Arc<dyn TransactionalQueueStore>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        notifier: Arc<dyn QueueNotifier>,
    ) -> Self {
        Self {
            store,
            id_provider,
            time_provider,
            notifier,
            locks: ProviderLocks::new(),
        }
    }

    /// Join(providerId, customerId)
    pub async fn join(&self, provider_id: &str, customer_id: &str) -> Result<QueueSnapshot> {
        ensure_well_formed(provider_id)?;
        ensure_well_formed(customer_id)?;

        let _guard = self.locks.acquire(provider_id).await;
        let mut tx = self.store.begin_transaction().await?;
        let result = join::execute(
            tx.as_mut(),
            self.time_provider.as_ref(),
            provider_id,
            customer_id,
        )
        .await;
        let outcome = finish(tx, result).await?;

        info!(
            provider_id = %provider_id,
            customer_id = %customer_id,
            revision = outcome.snapshot.revision,
            queue_len = outcome.snapshot.queue.len(),
            "Customer joined queue"
        );
        Ok(self.publish(outcome))
    }

    /// Leave(providerId, customerId); absent customers are a no-op
    pub async fn leave(&self, provider_id: &str, customer_id: &str) -> Result<QueueSnapshot> {
        let outcome = self.remove(provider_id, customer_id).await?;
        if outcome.changed {
            info!(
                provider_id = %provider_id,
                customer_id = %customer_id,
                revision = outcome.snapshot.revision,
                "Customer left queue"
            );
        }
        Ok(self.publish(outcome))
    }

    /// Advance/Complete(providerId, customerId): same mutation as leave
    pub async fn advance(&self, provider_id: &str, customer_id: &str) -> Result<QueueSnapshot> {
        let outcome = self.remove(provider_id, customer_id).await?;
        if outcome.changed {
            info!(
                provider_id = %provider_id,
                customer_id = %customer_id,
                revision = outcome.snapshot.revision,
                "Customer served"
            );
        }
        Ok(self.publish(outcome))
    }

    /// AdmitWalkIn(providerId)
    pub async fn admit_walk_in(&self, provider_id: &str) -> Result<WalkInAdmission> {
        ensure_well_formed(provider_id)?;

        let _guard = self.locks.acquire(provider_id).await;
        let mut tx = self.store.begin_transaction().await?;
        let result = walk_in::execute(
            tx.as_mut(),
            self.id_provider.as_ref(),
            self.time_provider.as_ref(),
            provider_id,
        )
        .await;

        let (customer, outcome) = finish(tx, result).await?;

        info!(
            provider_id = %provider_id,
            customer_id = %customer.id,
            revision = outcome.snapshot.revision,
            "Walk-in admitted"
        );
        let snapshot = self.publish(outcome);
        Ok(WalkInAdmission { customer, snapshot })
    }

    /// SetOpen(providerId, isOpen); does not touch occupants
    pub async fn set_open(&self, provider_id: &str, is_open: bool) -> Result<QueueSnapshot> {
        ensure_well_formed(provider_id)?;

        let _guard = self.locks.acquire(provider_id).await;
        let mut tx = self.store.begin_transaction().await?;
        let result = open_status::execute(tx.as_mut(), provider_id, is_open).await;
        let outcome = finish(tx, result).await?;

        if outcome.changed {
            info!(provider_id = %provider_id, is_open, "Provider open status changed");
        }
        Ok(self.publish(outcome))
    }

    /// A malformed customer id can never be queued, so it takes the absent path
    async fn remove(&self, provider_id: &str, customer_id: &str) -> Result<MutationOutcome> {
        ensure_well_formed(provider_id)?;

        let _guard = self.locks.acquire(provider_id).await;
        let mut tx = self.store.begin_transaction().await?;
        let result = leave::execute(tx.as_mut(), provider_id, customer_id).await;
        finish(tx, result).await
    }

    fn publish(&self, outcome: MutationOutcome) -> QueueSnapshot {
        if outcome.changed {
            self.notifier.queue_changed(&outcome.snapshot.provider_id);
        }
        outcome.snapshot
    }
}

/// Commit on success, roll back on failure
async fn finish<T>(tx: Box<dyn QueueTransaction>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}
