// Per-provider mutual exclusion
//
// Every mutation on a provider holds that provider's lock for its whole
// read-check-write-commit sequence. Mutations on different providers proceed
// independently.

use crate::domain::ProviderId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct ProviderLocks {
    slots: Mutex<HashMap<ProviderId, Arc<AsyncMutex<()>>>>,
}

impl ProviderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one provider
    pub async fn acquire(&self, provider_id: &str) -> ProviderGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(provider_id.to_string()).or_default())
        };

        let guard = slot.lock_owned().await;

        ProviderGuard {
            locks: self,
            provider_id: provider_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of providers with a live lock slot
    pub fn active(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Held for the duration of one mutation; releases the slot on drop
pub struct ProviderGuard<'a> {
    locks: &'a ProviderLocks,
    provider_id: ProviderId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ProviderGuard<'_> {
    fn drop(&mut self) {
        // Release first so the slot's refcount reflects only waiters
        self.guard.take();

        let mut slots = self
            .locks
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get(&self.provider_id) {
            if Arc::strong_count(slot) == 1 {
                slots.remove(&self.provider_id);
            }
        }
    }
}
