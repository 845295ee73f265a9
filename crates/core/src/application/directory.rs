// Directory Service - provider and customer records, queue reads

use crate::domain::customer::WALK_IN_EMAIL_DOMAIN;
use crate::domain::id::ensure_well_formed;
use crate::domain::{
    Customer, DomainError, Membership, Provider, ProviderPatch, ProviderProfile, ProviderView,
    QueueSnapshot,
};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, QueueStore, TimeProvider};
use std::sync::Arc;
use tracing::info;

/// Records and reads that never touch occupant lists
pub struct DirectoryService {
    store: Arc<dyn QueueStore>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl DirectoryService {
    pub fn new(
        store: Arc<dyn QueueStore>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            store,
            id_provider,
            time_provider,
        }
    }

    /// Create a provider; new providers start open with an empty queue
    pub async fn create_provider(&self, profile: ProviderProfile) -> Result<Provider> {
        profile.validate()?;

        let provider = Provider::new(
            self.id_provider.generate_id(),
            self.time_provider.now_millis(),
            profile,
        );
        self.store.insert_provider(&provider).await?;

        info!(provider_id = %provider.id, name = %provider.profile.name, "Provider created");
        Ok(provider)
    }

    /// Patch profile fields; blank fields keep their current value
    pub async fn update_provider(&self, provider_id: &str, patch: ProviderPatch) -> Result<Provider> {
        ensure_well_formed(provider_id)?;

        let mut provider = self
            .store
            .find_provider(provider_id)
            .await?
            .ok_or_else(|| AppError::provider_not_found(provider_id))?;

        patch.apply(&mut provider.profile);
        provider.profile.validate()?;

        if !self.store.update_profile(provider_id, &provider.profile).await? {
            return Err(AppError::provider_not_found(provider_id));
        }

        info!(provider_id = %provider_id, "Provider profile updated");
        Ok(provider)
    }

    /// Every provider with its current sanitized queue
    pub async fn list_providers(&self) -> Result<Vec<ProviderView>> {
        let providers = self.store.list_providers().await?;
        let mut views = Vec::with_capacity(providers.len());

        for provider in providers {
            // A provider deleted between the two reads is simply skipped
            if let Some(snapshot) = self.store.snapshot(&provider.id).await? {
                views.push(view_of(provider, snapshot));
            }
        }
        Ok(views)
    }

    pub async fn get_provider(&self, provider_id: &str) -> Result<ProviderView> {
        ensure_well_formed(provider_id)?;

        let provider = self
            .store
            .find_provider(provider_id)
            .await?
            .ok_or_else(|| AppError::provider_not_found(provider_id))?;
        let snapshot = self.queue(provider_id).await?;
        Ok(view_of(provider, snapshot))
    }

    /// GetQueue(providerId)
    pub async fn queue(&self, provider_id: &str) -> Result<QueueSnapshot> {
        ensure_well_formed(provider_id)?;

        self.store
            .snapshot(provider_id)
            .await?
            .ok_or_else(|| AppError::provider_not_found(provider_id))
    }

    /// Register a named customer
    pub async fn register_customer(&self, display_name: &str, contact_email: &str) -> Result<Customer> {
        let display_name = display_name.trim();
        let contact_email = contact_email.trim().to_lowercase();

        if display_name.is_empty() {
            return Err(DomainError::ValidationError("display name is required".to_string()).into());
        }
        if !looks_like_email(&contact_email) {
            return Err(DomainError::ValidationError(format!(
                "invalid contact email: {}",
                contact_email
            ))
            .into());
        }
        if contact_email.ends_with(&format!("@{}", WALK_IN_EMAIL_DOMAIN)) {
            return Err(DomainError::ValidationError(format!(
                "the {} domain is reserved",
                WALK_IN_EMAIL_DOMAIN
            ))
            .into());
        }

        let customer = Customer::registered(
            self.id_provider.generate_id(),
            self.time_provider.now_millis(),
            display_name,
            contact_email,
        );
        self.store.insert_customer(&customer).await?;

        info!(customer_id = %customer.id, "Customer registered");
        Ok(customer)
    }

    /// GetCustomerCurrentQueue(customerId)
    ///
    /// Unknown customers get `None`, same as customers not queued anywhere.
    pub async fn current_queue(&self, customer_id: &str) -> Result<Option<Membership>> {
        ensure_well_formed(customer_id)?;
        self.store.find_membership(customer_id).await
    }
}

fn view_of(provider: Provider, snapshot: QueueSnapshot) -> ProviderView {
    let mut provider = provider;
    // The snapshot's flag and revision come from the same read as the queue
    provider.is_open = snapshot.is_open;
    provider.revision = snapshot.revision;
    ProviderView {
        provider,
        queue: snapshot.queue,
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::queue_store::mocks::InMemoryQueueStore;
    use crate::port::time_provider::mocks::ManualClock;
    use tokio_test::assert_err;

    fn service() -> (InMemoryQueueStore, DirectoryService) {
        let store = InMemoryQueueStore::new();
        let service = DirectoryService::new(
            Arc::new(store.clone()),
            Arc::new(SequentialIdProvider::new("id")),
            Arc::new(ManualClock::new(1_700_000_000_000)),
        );
        (store, service)
    }

    fn profile(name: &str) -> ProviderProfile {
        ProviderProfile {
            name: name.to_string(),
            address: "12 High St".to_string(),
            phone: Some("555-0100".to_string()),
            opening_hour: Some("09:00".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_provider_starts_open_and_empty() {
        let (_, service) = service();
        let provider = service.create_provider(profile("Fade Room")).await.unwrap();
        assert!(provider.is_open);
        assert_eq!(provider.id, "id-1");

        let view = service.get_provider(&provider.id).await.unwrap();
        assert!(view.queue.is_empty());
        assert_eq!(view.provider.profile.name, "Fade Room");
    }

    #[tokio::test]
    async fn test_create_provider_requires_name() {
        let (_, service) = service();
        let err = service.create_provider(profile("  ")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_update_provider_ignores_blank_fields() {
        let (_, service) = service();
        let provider = service.create_provider(profile("Old")).await.unwrap();

        let patch = ProviderPatch {
            name: Some("New".to_string()),
            address: Some("   ".to_string()),
            ..Default::default()
        };
        let updated = service.update_provider(&provider.id, patch).await.unwrap();
        assert_eq!(updated.profile.name, "New");
        assert_eq!(updated.profile.address, "12 High St");
        assert_eq!(updated.revision, provider.revision, "profile edits leave the queue alone");
    }

    #[tokio::test]
    async fn test_update_unknown_provider() {
        let (_, service) = service();
        let err = service
            .update_provider("nope", ProviderPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_providers_sanitizes_queues() {
        let (store, service) = service();
        let provider = service.create_provider(profile("A")).await.unwrap();
        let customer = service
            .register_customer("Ann", "ann@example.com")
            .await
            .unwrap();
        store.insert_raw_entry(&provider.id, "ghost").await;
        store.insert_raw_entry(&provider.id, &customer.id).await;

        let views = service.list_providers().await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].queue.len(), 1);
        assert_eq!(views[0].queue[0].customer_id, customer.id);
        assert_eq!(views[0].queue[0].position, 1);
    }

    #[tokio::test]
    async fn test_register_customer_validation() {
        let (_, service) = service();

        let err = service.register_customer("", "a@b.co").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = service.register_customer("Al", "not-an-email").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = service
            .register_customer("Al", "x@walk-in.invalid")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let customer = service
            .register_customer(" Al ", "AL@Example.com")
            .await
            .unwrap();
        assert_eq!(customer.display_name, "Al");
        assert_eq!(customer.contact_email, "al@example.com");
        assert!(!customer.is_walk_in());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (_, service) = service();
        service.register_customer("A", "dup@example.com").await.unwrap();
        assert_err!(service.register_customer("B", "dup@example.com").await);
    }

    #[tokio::test]
    async fn test_current_queue_for_unknown_customer_is_none() {
        let (_, service) = service();
        assert!(service.current_queue("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_queue_unknown_provider() {
        let (_, service) = service();
        let err = service.queue("missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
