// Domain Layer - Pure business logic and entities

pub mod customer;
pub mod error;
pub mod id;
pub mod provider;
pub mod queue;

// Re-exports
pub use customer::{Customer, CustomerId, CustomerKind};
pub use error::DomainError;
pub use id::is_well_formed_id;
pub use provider::{Provider, ProviderId, ProviderPatch, ProviderProfile, ProviderView};
pub use queue::{sanitize_occupants, Membership, Occupant, OccupantRecord, QueueSnapshot};
