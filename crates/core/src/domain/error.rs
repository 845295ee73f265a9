// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Queue is currently held: provider {provider_id} is closed")]
    ProviderClosed { provider_id: String },

    #[error("Customer {customer_id} is already in the queue of provider {provider_id}")]
    AlreadyQueuedHere {
        customer_id: String,
        provider_id: String,
    },

    #[error(
        "Customer {customer_id} is already queued at {provider_name} ({provider_id}); leave that queue first"
    )]
    AlreadyQueuedElsewhere {
        customer_id: String,
        provider_id: String,
        provider_name: String,
    },

    #[error("Malformed identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
